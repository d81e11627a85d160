//! Data models for durable scheduler jobs

use super::Error;
use crate::database::schema::scheduler_jobs;
use chrono::NaiveDateTime;
use diesel::backend::Backend;
use diesel::deserialize::{FromSql, Result as FromSqlResult};
use diesel::serialize::{Output, Result as ToSqlResult, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Execution status of a persisted job
#[derive(
    AsExpression, Clone, Copy, Debug, Deserialize, Eq, FromSqlRow, PartialEq, Serialize,
)]
#[sql_type = "Text"]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to fire
    Pending,
    /// Executed to completion
    Done,
    /// Executed and failed, or skipped as stale on boot
    Failed,
}

impl JobStatus {
    /// Returns the stored form of the status
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown job status {}", value)),
        }
    }
}

impl<TDatabase: Backend> ToSql<Text, TDatabase> for JobStatus
where
    String: ToSql<Text, TDatabase>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, TDatabase>) -> ToSqlResult {
        self.as_str().to_string().to_sql(out)
    }
}

impl<TDatabase: Backend> FromSql<Text, TDatabase> for JobStatus
where
    String: FromSql<Text, TDatabase>,
{
    fn from_sql(bytes: Option<&TDatabase::RawValue>) -> FromSqlResult<Self> {
        let stored = String::from_sql(bytes)?;

        stored.parse().map_err(Into::into)
    }
}

/// Payload for a reminder delivery job
#[derive(Debug, Deserialize, Serialize)]
struct ReminderFirePayload {
    /// Appointment owning the reminder row
    appointment_uid: i32,
    /// Send time identifying the row within the appointment
    send_at: NaiveDateTime,
}

/// Payload for a no-show detection job
#[derive(Debug, Deserialize, Serialize)]
struct AutoMissPayload {
    /// Appointment to check
    appointment_uid: i32,
}

/// The work a fired job performs.
///
/// `(kind, key)` identifies a job: re-arming the same identity replaces the
/// previous arm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JobKind {
    /// Deliver the reminder row of an appointment at its send time
    ReminderFire {
        /// Appointment owning the reminder row
        appointment_uid: i32,
        /// Send time identifying the row within the appointment
        send_at: NaiveDateTime,
    },
    /// Mark a still-booked appointment missed shortly after its start
    AutoMissCheck {
        /// Appointment to check
        appointment_uid: i32,
    },
    /// Reconcile the current month's demand cells from attendance
    MonthEndLearn,
    /// Recalculate thresholds and cap peaks for the previous month
    MonthlyRecalc,
    /// Delete expired slots and late-release imminent high-demand cells
    HourlyMaintenance,
}

impl JobKind {
    /// Returns the stored kind discriminant
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReminderFire { .. } => "reminder_fire",
            Self::AutoMissCheck { .. } => "auto_miss_check",
            Self::MonthEndLearn => "month_end_learn",
            Self::MonthlyRecalc => "monthly_recalc",
            Self::HourlyMaintenance => "hourly_maintenance",
        }
    }

    /// Returns the identity key, unique together with the kind
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::ReminderFire {
                appointment_uid,
                send_at,
            } => format!(
                "appointment-{}-{}",
                appointment_uid,
                send_at.and_utc().timestamp()
            ),
            Self::AutoMissCheck { appointment_uid } => format!("appointment-{}", appointment_uid),
            Self::MonthEndLearn | Self::MonthlyRecalc | Self::HourlyMaintenance => {
                String::from("singleton")
            }
        }
    }

    /// Key prefix shared by every reminder job of one appointment
    #[must_use]
    pub fn reminder_key_prefix(appointment_uid: i32) -> String {
        format!("appointment-{}-", appointment_uid)
    }

    /// Serializes the payload for persistence
    #[must_use]
    pub fn payload(&self) -> String {
        let value = match self {
            Self::ReminderFire {
                appointment_uid,
                send_at,
            } => serde_json::to_value(ReminderFirePayload {
                appointment_uid: *appointment_uid,
                send_at: *send_at,
            }),
            Self::AutoMissCheck { appointment_uid } => serde_json::to_value(AutoMissPayload {
                appointment_uid: *appointment_uid,
            }),
            Self::MonthEndLearn | Self::MonthlyRecalc | Self::HourlyMaintenance => {
                Ok(serde_json::json!({}))
            }
        };

        value.unwrap_or_default().to_string()
    }

    /// Reconstructs the kind from its persisted parts
    ///
    /// # Errors
    ///
    /// When the kind is unknown or its payload fails to deserialize
    pub fn from_parts(kind: &str, payload: &str) -> Result<Self, Error> {
        let malformed = |source| Error::Payload {
            kind: kind.to_string(),
            source,
        };

        match kind {
            "reminder_fire" => {
                let payload: ReminderFirePayload =
                    serde_json::from_str(payload).map_err(malformed)?;

                Ok(Self::ReminderFire {
                    appointment_uid: payload.appointment_uid,
                    send_at: payload.send_at,
                })
            }
            "auto_miss_check" => {
                let payload: AutoMissPayload = serde_json::from_str(payload).map_err(malformed)?;

                Ok(Self::AutoMissCheck {
                    appointment_uid: payload.appointment_uid,
                })
            }
            "month_end_learn" => Ok(Self::MonthEndLearn),
            "monthly_recalc" => Ok(Self::MonthlyRecalc),
            "hourly_maintenance" => Ok(Self::HourlyMaintenance),
            _ => Err(Error::UnknownKind {
                kind: kind.to_string(),
            }),
        }
    }
}

/// Record for an individual persisted job
#[derive(Clone, Debug, PartialEq, Queryable, Serialize)]
pub struct Job {
    /// Unique identifier for the job record
    pub uid: i32,
    /// Job kind discriminant
    pub kind: String,
    /// Identity key, unique together with the kind
    pub key: String,
    /// Wall-clock instant the job should fire, as UTC
    pub fire_at: NaiveDateTime,
    /// JSON payload for the job handler
    pub payload: String,
    /// Execution status of the job
    pub status: JobStatus,
    /// Number of execution attempts so far
    pub attempts: i32,
}

impl Job {
    /// Reconstructs the work this job performs
    ///
    /// # Errors
    ///
    /// When the persisted kind or payload is malformed
    pub fn to_kind(&self) -> Result<JobKind, Error> {
        JobKind::from_parts(&self.kind, &self.payload)
    }
}

/// Insertable job for use with `diesel`
#[derive(Debug, Insertable)]
#[table_name = "scheduler_jobs"]
pub struct NewJob {
    /// Job kind discriminant
    pub kind: String,
    /// Identity key, unique together with the kind
    pub key: String,
    /// Wall-clock instant the job should fire, as UTC
    pub fire_at: NaiveDateTime,
    /// JSON payload for the job handler
    pub payload: String,
    /// Execution status of the job
    pub status: JobStatus,
    /// Number of execution attempts so far
    pub attempts: i32,
}

impl NewJob {
    /// Builds a pending job for the given kind and fire time
    #[must_use]
    pub fn from_kind(kind: &JobKind, fire_at: NaiveDateTime) -> Self {
        Self {
            kind: kind.kind().to_string(),
            key: kind.key(),
            fire_at,
            payload: kind.payload(),
            status: JobStatus::Pending,
            attempts: 0,
        }
    }
}
