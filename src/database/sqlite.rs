//! Database controller for persistent storage via sqlite

use super::{Database, Error};
use diesel::connection::Connection;
use diesel::sqlite::SqliteConnection;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Manages sqlite database connections
pub struct Sqlite {
    connection: Mutex<SqliteConnection>,
}

impl Database for Sqlite {
    fn connect(database_url: &str) -> Result<Self, Error> {
        let connection =
            SqliteConnection::establish(database_url).map_err(|source| Error::Connection {
                database_url: database_url.to_string(),
                source,
            })?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> MutexGuard<'_, SqliteConnection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
