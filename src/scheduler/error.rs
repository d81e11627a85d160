//! Error types for the durable scheduler

use diesel::result::Error as DieselError;
use thiserror::Error;

/// Durable scheduler errors
#[derive(Debug, Error)]
pub enum Error {
    /// A job-related database operation failed
    #[error("Failed to perform scheduler database operation: {source}")]
    Database {
        /// Underlying error type
        #[from]
        source: DieselError,
    },
    /// The timer queue failed to produce an expired entry
    #[error("A job was scheduled but the timer queue failed: {source}")]
    Queue {
        /// Underlying error type
        #[from]
        source: tokio::time::error::Error,
    },
    /// A persisted job carries a kind this build does not know
    #[error("Unknown job kind {kind}")]
    UnknownKind {
        /// Stored kind discriminant
        kind: String,
    },
    /// A persisted job payload failed to deserialize
    #[error("Malformed payload for job kind {kind}: {source}")]
    Payload {
        /// Stored kind discriminant
        kind: String,
        /// Underlying error type
        source: serde_json::Error,
    },
}
