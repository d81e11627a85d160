//! Data models for reminder message templates

use diesel::backend::Backend;
use diesel::deserialize::{FromSql, Result as FromSqlResult};
use diesel::serialize::{Output, Result as ToSqlResult, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::database::schema::messages;

/// Category a reminder text is drawn from
#[derive(
    AsExpression, Clone, Copy, Debug, Deserialize, Eq, FromSqlRow, Hash, PartialEq, Serialize,
)]
#[sql_type = "Text"]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// Plain reminder for patients in good standing
    DefaultNudge,
    /// Encouraging reminder for reliably attending patients
    PositiveNudge,
    /// Re-engagement reminder for patients at risk of missing
    ReEngagement,
}

impl MessageCategory {
    /// Returns the stored form of the category
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DefaultNudge => "default_nudge",
            Self::PositiveNudge => "positive_nudge",
            Self::ReEngagement => "re_engagement",
        }
    }
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl FromStr for MessageCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "default_nudge" | "default-nudge" | "default" => Ok(Self::DefaultNudge),
            "positive_nudge" | "positive-nudge" | "positive" => Ok(Self::PositiveNudge),
            "re_engagement" | "re-engagement" => Ok(Self::ReEngagement),
            _ => Err(format!("Unknown message category {}", value)),
        }
    }
}

impl<TDatabase: Backend> ToSql<Text, TDatabase> for MessageCategory
where
    String: ToSql<Text, TDatabase>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, TDatabase>) -> ToSqlResult {
        self.as_str().to_string().to_sql(out)
    }
}

impl<TDatabase: Backend> FromSql<Text, TDatabase> for MessageCategory
where
    String: FromSql<Text, TDatabase>,
{
    fn from_sql(bytes: Option<&TDatabase::RawValue>) -> FromSqlResult<Self> {
        let stored = String::from_sql(bytes)?;

        stored.parse().map_err(Into::into)
    }
}

/// Record for an individual message template
#[derive(Clone, Debug, Eq, PartialEq, Queryable, Serialize)]
pub struct Message {
    /// Unique identifier for the message record
    pub uid: i32,
    /// Nudge category the text belongs to
    pub category: MessageCategory,
    /// Template text; the literal token `name` is substituted on render
    pub text: String,
}

/// Necessary data to add a message template to the pool
#[derive(Debug, Eq, Insertable, PartialEq)]
#[table_name = "messages"]
pub struct NewMessage {
    /// Nudge category the text belongs to
    pub category: MessageCategory,
    /// Template text
    pub text: String,
}
