//! Data models for the reminders embedded in an appointment

use crate::message::model::MessageCategory;
use chrono::NaiveDateTime;
use diesel::deserialize::{FromSql, Result as FromSqlResult};
use diesel::serialize::{Output, Result as ToSqlResult, ToSql};
use diesel::{backend::Backend, sql_types::Text};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Delivery status of a single reminder row
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Armed for a future delivery
    Scheduled,
    /// Delivery was performed or recorded; transitions here exactly once
    Sent,
}

/// A planned or delivered reminder owned by one appointment
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Reminder {
    /// Nudge category the text is drawn from
    pub category: MessageCategory,
    /// Wall-clock instant the reminder fires, as UTC
    pub send_at: NaiveDateTime,
    /// Delivery status of the row
    pub status: ReminderStatus,
    /// Rendered text, when a delivery was attempted for this row
    pub text: Option<String>,
}

/// Model for the serialized reminder list in persistent storage
#[derive(AsExpression, Debug, Deserialize, Eq, FromSqlRow, PartialEq, Serialize)]
#[sql_type = "Text"]
pub struct StoredReminders(pub Vec<Reminder>);

impl<TDatabase: Backend> ToSql<Text, TDatabase> for StoredReminders
where
    String: ToSql<Text, TDatabase>,
{
    /// Converts this model to a SQL type
    /// Data is serialized as a JSON array of reminder objects
    fn to_sql<W: Write>(&self, out: &mut Output<W, TDatabase>) -> ToSqlResult {
        (serde_json::to_string(&self.0)?).to_sql(out)
    }
}

impl<TDatabase: Backend> FromSql<Text, TDatabase> for StoredReminders
where
    String: FromSql<Text, TDatabase>,
{
    /// Creates this model from a SQL type
    /// Data is serialized as a JSON array for easy deserialization
    fn from_sql(bytes: Option<&TDatabase::RawValue>) -> FromSqlResult<Self> {
        Ok(serde_json::from_str(&String::from_sql(bytes)?)?)
    }
}
