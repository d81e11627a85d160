//! Database controller for persistent storage

pub mod error;
pub mod schema;
mod sqlite;

pub use error::Error;
pub use sqlite::Sqlite;

use diesel::sqlite::SqliteConnection;
use std::sync::MutexGuard;

/// Interface for databases to manage their own connections
pub trait Database: Send + Sync {
    /// Connects to the provided database url
    ///
    /// # Errors
    ///
    /// When a connection to the database can not be established
    fn connect(database_url: &str) -> Result<Self, Error>
    where
        Self: Sized;

    /// Provides exclusive access to the underlying connection.
    ///
    /// Providers hold the guard for the duration of one aggregate write,
    /// which is what makes read-modify-write sequences atomic per aggregate.
    fn connection(&self) -> MutexGuard<'_, SqliteConnection>;
}
