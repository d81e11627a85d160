//! Data models for registered patients

use crate::database::schema::users;
use diesel::backend::Backend;
use diesel::deserialize::{FromSql, Result as FromSqlResult};
use diesel::serialize::{Output, Result as ToSqlResult, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Behavior class of a patient, derived from their attendance record
#[derive(
    AsExpression, Clone, Copy, Debug, Deserialize, Eq, FromSqlRow, PartialEq, Serialize,
)]
#[sql_type = "Text"]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Attendance rate of 60 up to 80, and the default for new patients
    Good,
    /// Attendance rate of 80 or above
    VeryGood,
    /// Attendance rate below 60
    AtRisk,
}

impl Category {
    /// Returns the stored form of the category
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::VeryGood => "very_good",
            Self::AtRisk => "at_risk",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Good => "Good",
            Self::VeryGood => "Very Good",
            Self::AtRisk => "At-Risk",
        };

        write!(formatter, "{}", name)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "very good" | "very_good" | "very-good" => Ok(Self::VeryGood),
            "at-risk" | "at_risk" | "at risk" => Ok(Self::AtRisk),
            _ => Err(format!("Unknown category {}", value)),
        }
    }
}

impl<TDatabase: Backend> ToSql<Text, TDatabase> for Category
where
    String: ToSql<Text, TDatabase>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, TDatabase>) -> ToSqlResult {
        self.as_str().to_string().to_sql(out)
    }
}

impl<TDatabase: Backend> FromSql<Text, TDatabase> for Category
where
    String: FromSql<Text, TDatabase>,
{
    fn from_sql(bytes: Option<&TDatabase::RawValue>) -> FromSqlResult<Self> {
        let stored = String::from_sql(bytes)?;

        stored.parse().map_err(Into::into)
    }
}

/// Record for an individual registered patient
#[derive(Clone, Debug, PartialEq, Queryable, Serialize)]
pub struct User {
    /// Unique identifier for the user record
    pub uid: i32,
    /// Name the user registered with
    pub user_name: String,
    /// Lowercased form of the user name, for case-insensitive lookup
    pub normalized_name: String,
    /// Preferred display name, if any
    pub display_name: Option<String>,
    /// Contact phone number, if any
    pub phone: Option<String>,
    /// Opaque messenger channel id, if the account is linked
    pub notify_channel_id: Option<String>,
    /// Number of appointments the user attended
    pub attended_count: i32,
    /// Number of appointments the user missed
    pub missed_count: i32,
    /// Non-negative engagement score
    pub score: i32,
    /// Behavior class derived from attendance
    pub category: Category,
}

impl User {
    /// Total number of resolved attendance events for the user
    #[must_use]
    pub fn total_attendance(&self) -> i32 {
        self.attended_count + self.missed_count
    }

    /// Attendance rate as a percentage in [0, 100], or 0 with no events
    #[must_use]
    pub fn attendance_rate(&self) -> f64 {
        if self.total_attendance() == 0 {
            0.0
        } else {
            100.0 * f64::from(self.attended_count) / f64::from(self.total_attendance())
        }
    }

    /// Name to address the user by in rendered messages
    #[must_use]
    pub fn preferred_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_name)
    }

    /// Public summary of the user
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "userName": self.user_name,
            "displayName": self.display_name,
            "phone": self.phone,
        })
    }

    /// Administrative summary, adding counters, category, and link state
    #[must_use]
    pub fn admin_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "userName": self.user_name,
            "displayName": self.display_name,
            "phone": self.phone,
            "attendedCount": self.attended_count,
            "missedCount": self.missed_count,
            "attendanceRate": self.attendance_rate(),
            "score": self.score,
            "category": self.category.to_string(),
            "linked": self.notify_channel_id.is_some(),
        })
    }
}

/// Returns the normalized lookup form of a user name
#[must_use]
pub fn normalize(user_name: &str) -> String {
    user_name.to_lowercase()
}

/// Necessary data to register a new patient
#[derive(Debug, Eq, PartialEq)]
pub struct NewUser {
    /// Name to register the user with
    pub user_name: String,
    /// Preferred display name, if any
    pub display_name: Option<String>,
    /// Contact phone number, if any
    pub phone: Option<String>,
}

/// Insertable `NewUser` for use with `diesel`
#[derive(Debug, Insertable)]
#[table_name = "users"]
pub(crate) struct InsertableNewUser {
    /// Name the user registered with
    pub user_name: String,
    /// Lowercased form of the user name
    pub normalized_name: String,
    /// Preferred display name, if any
    pub display_name: Option<String>,
    /// Contact phone number, if any
    pub phone: Option<String>,
}

impl From<NewUser> for InsertableNewUser {
    fn from(new_user: NewUser) -> Self {
        Self {
            normalized_name: normalize(&new_user.user_name),
            user_name: new_user.user_name,
            display_name: new_user.display_name,
            phone: new_user.phone,
        }
    }
}
