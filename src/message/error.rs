//! Error types for message pool operations

use super::model::MessageCategory;
use diesel::result::Error as DieselError;
use thiserror::Error;

/// Message pool errors
#[derive(Debug, Error)]
pub enum Error {
    /// A message-related database operation failed
    #[error("Failed to perform message-related database operation: {source}")]
    Database {
        /// Underlying error type
        #[from]
        source: DieselError,
    },
    /// The pool holds no templates for a category
    #[error("No message templates exist for category {0}")]
    EmptyCategory(MessageCategory),
    /// Every template for a category has already been used
    #[error("All message templates for category {0} have been used")]
    ExhaustedPool(MessageCategory),
}
