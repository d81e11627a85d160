//! Error types for appointment operations

use diesel::result::Error as DieselError;
use thiserror::Error;

/// Appointment operation errors
#[derive(Debug, Error)]
pub enum Error {
    /// An appointment-related database operation failed
    #[error("Failed to perform appointment-related database operation: {source}")]
    Database {
        /// Underlying error type
        #[from]
        source: DieselError,
    },
    /// A slot request was malformed
    #[error("Invalid slot request: {reason}")]
    Validation {
        /// Human-readable description of the problem
        reason: String,
    },
}
