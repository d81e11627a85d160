//! Provider for user data

use super::model::{normalize, InsertableNewUser, NewUser, User};
use super::Error;
use crate::database::{schema::users, Database};
use diesel::prelude::*;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Providable interface for user management
#[cfg_attr(test, automock)]
pub trait Providable: Send + Sync {
    /// Registers a user, or refreshes their details if they already exist.
    ///
    /// Registration is idempotent: the same name registers once regardless
    /// of letter case.
    ///
    /// # Errors
    ///
    /// When the insertion or update fails
    fn register(&self, user: NewUser) -> Result<User, Error>;

    /// Retrieves all users from the database
    ///
    /// # Errors
    ///
    /// When user retrieval fails
    fn get_all(&self) -> Result<Vec<User>, Error>;

    /// Retrieves a user by name, ignoring letter case
    ///
    /// # Errors
    ///
    /// When user retrieval fails
    fn get_by_name(&self, name: &str) -> Result<Option<User>, Error>;

    /// Writes an updated user record back to the database
    ///
    /// # Errors
    ///
    /// When the update fails
    fn update(&self, user: &User) -> Result<User, Error>;
}

/// Provides access to user data in persistent storage
pub struct Provider {
    database: Arc<dyn Database>,
}

impl Provider {
    /// Creates a new user data provider
    #[must_use]
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }
}

impl Providable for Provider {
    fn register(&self, user: NewUser) -> Result<User, Error> {
        let connection = self.database.connection();

        let existing: Option<User> = users::table
            .filter(users::normalized_name.eq(normalize(&user.user_name)))
            .first(&*connection)
            .optional()?;

        if let Some(existing) = existing {
            diesel::update(users::table.find(existing.uid))
                .set((
                    users::display_name.eq(user.display_name.or(existing.display_name)),
                    users::phone.eq(user.phone.or(existing.phone)),
                ))
                .execute(&*connection)?;

            Ok(users::table.find(existing.uid).first(&*connection)?)
        } else {
            let insertable: InsertableNewUser = user.into();

            diesel::insert_into(users::table)
                .values(insertable)
                .execute(&*connection)?;

            Ok(users::table
                .order(users::uid.desc())
                .first(&*connection)?)
        }
    }

    fn get_all(&self) -> Result<Vec<User>, Error> {
        Ok(users::table.load(&*self.database.connection())?)
    }

    fn get_by_name(&self, name: &str) -> Result<Option<User>, Error> {
        Ok(users::table
            .filter(users::normalized_name.eq(normalize(name)))
            .first(&*self.database.connection())
            .optional()?)
    }

    fn update(&self, user: &User) -> Result<User, Error> {
        let connection = self.database.connection();

        diesel::update(users::table.find(user.uid))
            .set((
                users::display_name.eq(user.display_name.clone()),
                users::phone.eq(user.phone.clone()),
                users::notify_channel_id.eq(user.notify_channel_id.clone()),
                users::attended_count.eq(user.attended_count),
                users::missed_count.eq(user.missed_count),
                users::score.eq(user.score),
                users::category.eq(user.category),
            ))
            .execute(&*connection)?;

        Ok(users::table.find(user.uid).first(&*connection)?)
    }
}
