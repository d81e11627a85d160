//! Durable one-shot timer service.
//!
//! Jobs are persisted before they are queued, so an armed job survives a
//! process restart: `on_boot` replays pending jobs within a grace window.
//! Execution is at-most-once per arm in steady state; a crash between
//! execution and completion replays the job, and every handler re-checks
//! its preconditions.

mod error;
pub mod job;
pub mod model;
pub mod provider;

pub use error::Error;
pub use job::JobKind;
pub use model::{Scheduler, SchedulerHandle};
pub use provider::Provider;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Executes fired jobs.
///
/// Handlers are idempotent by precondition: a replayed or stale job reloads
/// its subject and becomes a no-op when the state has moved on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs a single fired job to completion
    ///
    /// # Errors
    ///
    /// When the job's work fails; the scheduler records the failure and
    /// moves on
    async fn run(&self, job: JobKind) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
