//! Error types for the booking protocol

use thiserror::Error;

/// Booking protocol errors
#[derive(Debug, Error)]
pub enum Error {
    /// No appointment exists with the requested id
    #[error("No appointment exists with id {uid}")]
    NotFound {
        /// Requested appointment id
        uid: i32,
    },
    /// The appointment is not open for booking
    #[error("Appointment {uid} is not available")]
    NotAvailable {
        /// Requested appointment id
        uid: i32,
    },
    /// The booking user has not registered
    #[error("No user is registered as {user_name}")]
    UserNotRegistered {
        /// Requested user name
        user_name: String,
    },
    /// An at-risk user requested a high-demand slot
    #[error(
        "This time with {doctor_name} is in high demand; please choose a less busy hour"
    )]
    AdmissionDenied {
        /// Doctor whose slot was requested
        doctor_name: String,
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
    /// Arming a reminder or the no-show check failed
    #[error(transparent)]
    Scheduler(#[from] crate::scheduler::Error),
    /// The message pool failed
    #[error(transparent)]
    Message(#[from] crate::message::Error),
}
