//! Error types for demand learning operations

use diesel::result::Error as DieselError;
use thiserror::Error;

/// Demand learning errors
#[derive(Debug, Error)]
pub enum Error {
    /// A demand-related database operation failed
    #[error("Failed to perform demand-related database operation: {source}")]
    Database {
        /// Underlying error type
        #[from]
        source: DieselError,
    },
    /// An appointment lookup needed by the engine failed
    #[error("Failed to read appointments for demand learning: {source}")]
    Appointment {
        /// Underlying error type
        #[from]
        source: crate::appointment::Error,
    },
    /// A calendar month could not be resolved in the clinic timezone
    #[error("Invalid calendar month {year}-{month}")]
    InvalidMonth {
        /// Requested year
        year: i32,
        /// Requested month
        month: i32,
    },
}
