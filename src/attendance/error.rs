//! Error types for attendance resolution

use crate::appointment::model::Status;
use thiserror::Error;

/// Attendance resolution errors
#[derive(Debug, Error)]
pub enum Error {
    /// No appointment exists with the requested id
    #[error("No appointment exists with id {uid}")]
    NotFound {
        /// Requested appointment id
        uid: i32,
    },
    /// The appointment cannot move to the requested status
    #[error("Appointment {uid} cannot change from {from} to {to}")]
    InvalidTransition {
        /// Requested appointment id
        uid: i32,
        /// Status the appointment currently holds
        from: Status,
        /// Status that was requested
        to: Status,
    },
    /// A user store operation failed
    #[error(transparent)]
    User(#[from] crate::user::Error),
    /// An appointment store operation failed
    #[error(transparent)]
    Appointment(#[from] crate::appointment::Error),
    /// A demand engine operation failed
    #[error(transparent)]
    Demand(#[from] crate::demand::Error),
}
