//! Provider for message template data

use super::model::{Message, MessageCategory, NewMessage};
use super::Error;
use crate::database::{schema::messages, Database};
use diesel::prelude::*;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Providable interface for message pool management
#[cfg_attr(test, automock)]
pub trait Providable: Send + Sync {
    /// Adds a new template to the pool
    ///
    /// # Errors
    ///
    /// When the insertion fails
    fn add(&self, message: NewMessage) -> Result<Message, Error>;

    /// Retrieves all templates from the pool
    ///
    /// # Errors
    ///
    /// When template retrieval fails
    fn get_all(&self) -> Result<Vec<Message>, Error>;

    /// Retrieves the templates for a single category
    ///
    /// # Errors
    ///
    /// When template retrieval fails
    fn get_by_category(&self, category: MessageCategory) -> Result<Vec<Message>, Error>;
}

/// Provides access to message template data in persistent storage
pub struct Provider {
    database: Arc<dyn Database>,
}

impl Provider {
    /// Creates a new message data provider
    #[must_use]
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }
}

impl Providable for Provider {
    fn add(&self, message: NewMessage) -> Result<Message, Error> {
        let connection = self.database.connection();

        diesel::insert_into(messages::table)
            .values(message)
            .execute(&*connection)?;

        Ok(messages::table
            .order(messages::uid.desc())
            .first(&*connection)?)
    }

    fn get_all(&self) -> Result<Vec<Message>, Error> {
        Ok(messages::table.load(&*self.database.connection())?)
    }

    fn get_by_category(&self, category: MessageCategory) -> Result<Vec<Message>, Error> {
        Ok(messages::table
            .filter(messages::category.eq(category))
            .load(&*self.database.connection())?)
    }
}
