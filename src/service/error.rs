//! Error types for service wiring and job execution

use thiserror::Error;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// The configured timezone is not in the tz database
    #[error("Unknown timezone {timezone}")]
    UnknownTimezone {
        /// Configured timezone name
        timezone: String,
    },
    /// A user store operation failed
    #[error(transparent)]
    User(#[from] crate::user::Error),
    /// An appointment store operation failed
    #[error(transparent)]
    Appointment(#[from] crate::appointment::Error),
    /// The message pool failed
    #[error(transparent)]
    Message(#[from] crate::message::Error),
    /// A demand engine operation failed
    #[error(transparent)]
    Demand(#[from] crate::demand::Error),
    /// A scheduler operation failed
    #[error(transparent)]
    Scheduler(#[from] crate::scheduler::Error),
    /// An attendance resolution failed
    #[error(transparent)]
    Attendance(#[from] crate::attendance::Error),
}
