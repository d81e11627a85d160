//! Provider for persisted scheduler jobs

use super::job::{Job, JobStatus, NewJob};
use super::Error;
use crate::database::{schema::scheduler_jobs, Database};
use diesel::prelude::*;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Providable interface for durable job management
#[cfg_attr(test, automock)]
pub trait Providable: Send + Sync {
    /// Persists a pending job, replacing any prior job with the same
    /// kind and key
    ///
    /// # Errors
    ///
    /// When the write fails
    fn arm(&self, job: NewJob) -> Result<Job, Error>;

    /// Deletes the pending job with the given identity, reporting how many
    /// rows were removed
    ///
    /// # Errors
    ///
    /// When the deletion fails
    fn cancel(&self, kind: &str, key: &str) -> Result<usize, Error>;

    /// Deletes every pending job of a kind whose key starts with the prefix
    ///
    /// # Errors
    ///
    /// When the deletion fails
    fn cancel_prefix(&self, kind: &str, key_prefix: &str) -> Result<usize, Error>;

    /// Retrieves all pending jobs, soonest first
    ///
    /// # Errors
    ///
    /// When job retrieval fails
    fn pending(&self) -> Result<Vec<Job>, Error>;

    /// Records the outcome of an execution attempt
    ///
    /// # Errors
    ///
    /// When the write fails
    fn complete(&self, uid: i32, status: JobStatus) -> Result<(), Error>;
}

/// Provides access to persisted jobs in storage
pub struct Provider {
    database: Arc<dyn Database>,
}

impl Provider {
    /// Creates a new job data provider
    #[must_use]
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }
}

impl Providable for Provider {
    fn arm(&self, job: NewJob) -> Result<Job, Error> {
        let connection = self.database.connection();
        let kind = job.kind.clone();
        let key = job.key.clone();

        diesel::replace_into(scheduler_jobs::table)
            .values(job)
            .execute(&*connection)?;

        Ok(scheduler_jobs::table
            .filter(scheduler_jobs::kind.eq(kind))
            .filter(scheduler_jobs::key.eq(key))
            .first(&*connection)?)
    }

    fn cancel(&self, kind: &str, key: &str) -> Result<usize, Error> {
        Ok(diesel::delete(
            scheduler_jobs::table
                .filter(scheduler_jobs::kind.eq(kind))
                .filter(scheduler_jobs::key.eq(key))
                .filter(scheduler_jobs::status.eq(JobStatus::Pending)),
        )
        .execute(&*self.database.connection())?)
    }

    fn cancel_prefix(&self, kind: &str, key_prefix: &str) -> Result<usize, Error> {
        Ok(diesel::delete(
            scheduler_jobs::table
                .filter(scheduler_jobs::kind.eq(kind))
                .filter(scheduler_jobs::key.like(format!("{}%", key_prefix)))
                .filter(scheduler_jobs::status.eq(JobStatus::Pending)),
        )
        .execute(&*self.database.connection())?)
    }

    fn pending(&self) -> Result<Vec<Job>, Error> {
        Ok(scheduler_jobs::table
            .filter(scheduler_jobs::status.eq(JobStatus::Pending))
            .order(scheduler_jobs::fire_at.asc())
            .load(&*self.database.connection())?)
    }

    fn complete(&self, uid: i32, status: JobStatus) -> Result<(), Error> {
        diesel::update(scheduler_jobs::table.find(uid))
            .set((
                scheduler_jobs::status.eq(status),
                scheduler_jobs::attempts.eq(scheduler_jobs::attempts + 1),
            ))
            .execute(&*self.database.connection())?;

        Ok(())
    }
}
