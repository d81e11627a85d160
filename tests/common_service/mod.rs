//! Shared service wiring between integration tests

use super::common::Result;
use super::common_database;
use appointed::config::{Clinic, Config, Database, Scheduler, SqliteDatabase};
use appointed::Service;
use std::sync::Arc;

/// Configuration for a service over an in-memory database
#[must_use]
pub fn config() -> Config {
    Config {
        clinic: Clinic {
            name: String::from("Lakeside Clinic"),
            timezone: String::from("Asia/Riyadh"),
            survey_url: Some(String::from("https://example.com/missed")),
        },
        database: Database {
            sqlite: SqliteDatabase {
                path: String::from(":memory:"),
            },
        },
        scheduler: Scheduler {
            workers: 4,
            grace_minutes: 60,
        },
        telegram: None,
    }
}

/// Wires a full service over a fresh in-memory database, returning the
/// database as well so tests can inspect storage directly
#[inline]
pub fn new() -> Result<(Service, Arc<dyn appointed::database::Database>)> {
    let database = common_database::new()?;
    let service = Service::new(&config(), Arc::clone(&database))?;

    Ok((service, database))
}
