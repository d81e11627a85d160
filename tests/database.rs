//! Integration tests for managing persistent storage via a database

mod common;

use appointed::database::{self, error::Error, Database};
use common::Result;

#[test]
fn it_creates_sqlite_database_object_when_connection_succeeds() -> Result<()> {
    database::Sqlite::connect(":memory:")?;
    Ok(())
}

#[test]
fn it_returns_connection_error_for_bad_sqlite_database_url() -> Result<()> {
    let invalid_database_url = "no_such_directory/bad_url";

    match database::Sqlite::connect(invalid_database_url) {
        Err(Error::Connection { database_url, .. }) => {
            assert_eq!(invalid_database_url, database_url);
        }
        _ => panic!("Invalid database url successfully connected"),
    }

    Ok(())
}
