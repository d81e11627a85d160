//! Configuration management for loading from disk into memory

pub mod error;

use config::{Config as GenericConfig, Environment, File as ConfigFile};
use error::Error;
use serde::Deserialize;

/// All configurable properties of the service
#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Configuration for the clinic itself
    pub clinic: Clinic,
    /// Configuration for the database
    pub database: Database,
    /// Configuration for the durable scheduler
    #[serde(default)]
    pub scheduler: Scheduler,
    /// Configuration for the Telegram notifier; omit to disable deliveries
    pub telegram: Option<Telegram>,
}

/// All configurable clinic properties
#[derive(Debug, Deserialize, PartialEq)]
pub struct Clinic {
    /// Display name used in rendered nudges
    pub name: String,
    /// Timezone all clinic-local scheduling happens in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Follow-up survey link delivered after an automatic miss
    pub survey_url: Option<String>,
}

/// All configurable database properties
#[derive(Debug, Deserialize, PartialEq)]
pub struct Database {
    /// Configuration for the sqlite database
    pub sqlite: SqliteDatabase,
}

/// All configurable sqlite database properties
#[derive(Debug, Deserialize, PartialEq)]
pub struct SqliteDatabase {
    /// Path to the sqlite database
    pub path: String,
}

/// All configurable scheduler properties
#[derive(Debug, Deserialize, PartialEq)]
pub struct Scheduler {
    /// Number of jobs allowed to execute concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Minutes an overdue pending job may still fire after a restart
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: i64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            grace_minutes: default_grace_minutes(),
        }
    }
}

/// All configurable Telegram properties
#[derive(Debug, Deserialize, PartialEq)]
pub struct Telegram {
    /// Bot API token; an empty token disables deliveries
    pub bot_token: String,
}

/// Default clinic timezone
fn default_timezone() -> String {
    String::from("Asia/Riyadh")
}

/// Default worker slot count
fn default_workers() -> usize {
    4
}

/// Default boot grace window in minutes
fn default_grace_minutes() -> i64 {
    60
}

impl Config {
    /// Reads the configuration into memory from appointed.yaml, with
    /// `APPOINTED__`-prefixed environment variables taking precedence
    ///
    /// # Errors
    ///
    /// When appointed.yaml does not exist or is improperly formatted
    pub fn load(filename: &str) -> Result<Self, Error> {
        let mut config = GenericConfig::default();

        config
            .merge(ConfigFile::with_name(filename))
            .map_err(|source| Error::FileRead {
                filename: filename.to_string(),
                source,
            })?;

        config
            .merge(Environment::with_prefix("appointed").separator("__"))
            .map_err(|source| Error::InvalidSyntax {
                filename: filename.to_string(),
                source,
            })?;

        config
            .try_into::<Config>()
            .map_err(|source| Error::InvalidSyntax {
                filename: filename.to_string(),
                source,
            })
    }
}
