//! Data model for the appointment lifecycle status

use diesel::backend::Backend;
use diesel::deserialize::{FromSql, Result as FromSqlResult};
use diesel::serialize::{Output, Result as ToSqlResult, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Lifecycle status of an appointment slot.
///
/// Slots are created available, become booked, and end attended or missed.
/// The terminal states never revert.
#[derive(
    AsExpression, Clone, Copy, Debug, Deserialize, Eq, FromSqlRow, PartialEq, Serialize,
)]
#[sql_type = "Text"]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Open for booking
    Available,
    /// Claimed by a patient
    Booked,
    /// Resolved: the patient showed up
    Attended,
    /// Resolved: the patient did not show up
    Missed,
}

impl Status {
    /// Returns the stored form of the status
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Attended => "attended",
            Self::Missed => "missed",
        }
    }

    /// Whether the status is terminal
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Attended | Self::Missed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "booked" => Ok(Self::Booked),
            "attended" => Ok(Self::Attended),
            "missed" => Ok(Self::Missed),
            _ => Err(format!("Unknown appointment status {}", value)),
        }
    }
}

impl<TDatabase: Backend> ToSql<Text, TDatabase> for Status
where
    String: ToSql<Text, TDatabase>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, TDatabase>) -> ToSqlResult {
        self.as_str().to_string().to_sql(out)
    }
}

impl<TDatabase: Backend> FromSql<Text, TDatabase> for Status
where
    String: FromSql<Text, TDatabase>,
{
    fn from_sql(bytes: Option<&TDatabase::RawValue>) -> FromSqlResult<Self> {
        let stored = String::from_sql(bytes)?;

        stored.parse().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_marks_only_resolved_statuses_terminal() {
        assert!(!Status::Available.is_terminal());
        assert!(!Status::Booked.is_terminal());
        assert!(Status::Attended.is_terminal());
        assert!(Status::Missed.is_terminal());
    }

    #[test]
    fn it_round_trips_through_the_stored_form() -> Result<(), String> {
        for status in [
            Status::Available,
            Status::Booked,
            Status::Attended,
            Status::Missed,
        ] {
            assert_eq!(status, status.as_str().parse()?);
        }

        Ok(())
    }
}
