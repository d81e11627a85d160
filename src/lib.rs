//! 🩺 Self-hosted clinic appointment service with adaptive reminders
//!
//! Appointed books clinic slots and keeps patients showing up: each booking
//! plans a class-dependent series of reminder deliveries plus a no-show
//! check, while a demand engine learns busy hours from attendance and gates
//! at-risk patients away from them. Armed reminders survive restarts.

#![deny(clippy::all, clippy::pedantic, missing_docs, warnings)]
#![allow(non_local_definitions)]

#[macro_use]
extern crate diesel;

pub mod appointment;
pub mod attendance;
pub mod booking;
pub mod classifier;
pub mod clock;
pub mod command;
pub mod config;
pub mod database;
pub mod demand;
pub mod message;
pub mod notifier;
pub mod scheduler;
pub mod service;
pub mod user;

pub use crate::config::Config;
pub use appointment::model::Appointment;
pub use demand::DemandEngine;
pub use message::Catalog;
pub use scheduler::Scheduler;
pub use service::Service;
pub use user::model::User;

use std::error::Error;
use std::sync::Arc;

/// All dependencies for the service
pub struct Dependencies {
    /// Database connection for modules needing persistent storage
    pub database: Arc<dyn database::Database>,
}

impl Dependencies {
    /// Initializes and configures all dependencies
    ///
    /// # Errors
    ///
    /// When there is an error with the config or any of the dependencies
    pub fn new(config: &Config) -> Result<Self, Box<dyn Error>> {
        use database::Database as _;
        let database = Arc::new(database::Sqlite::connect(&config.database.sqlite.path)?);

        Ok(Self { database })
    }
}
