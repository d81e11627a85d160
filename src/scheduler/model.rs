//! Dispatcher and handle for the durable timer service

use super::job::{Job, JobStatus, NewJob};
use super::{provider, Error, Handler, JobKind};
use crate::clock::Clock;
use chrono::Duration;
use log::{debug, error, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::StreamExt;
use tokio_util::time::{delay_queue, DelayQueue};

/// Queue maintenance requests sent from handles to the dispatcher
#[derive(Debug)]
pub enum Command {
    /// Queue a freshly persisted job
    Arm(Job),
    /// Drop a queued job by its identity, best-effort
    Cancel {
        /// Job kind discriminant
        kind: String,
        /// Identity key within the kind
        key: String,
    },
}

/// Receiving end of a handle's command channel, owned by the dispatcher
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

/// A persisted job with its position in the timer queue
struct ScheduledJob {
    /// Persisted job row
    job: Job,
    /// Timer queue key for this job
    key: delay_queue::Key,
}

/// Arms and cancels durable jobs from anywhere in the service.
///
/// Every arm persists the job before notifying the dispatcher, so a job
/// armed while the dispatcher is down still replays on the next boot.
#[derive(Clone)]
pub struct SchedulerHandle {
    jobs: Arc<dyn provider::Providable>,
    commands: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Creates a handle and the command receiver a dispatcher will own.
    ///
    /// The handle exists before the dispatcher so job handlers can carry it.
    #[must_use]
    pub fn new(jobs: Arc<dyn provider::Providable>) -> (Self, CommandReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (
            Self {
                jobs,
                commands: sender,
            },
            receiver,
        )
    }

    /// Schedules a job, replacing any prior job with the same identity
    ///
    /// # Errors
    ///
    /// When the job store fails
    pub fn arm_at(&self, kind: &JobKind, fire_at: chrono::NaiveDateTime) -> Result<(), Error> {
        let job = self.jobs.arm(NewJob::from_kind(kind, fire_at))?;

        if self.commands.send(Command::Arm(job)).is_err() {
            debug!(
                "Dispatcher is not running; job {} {} will replay on boot",
                kind.kind(),
                kind.key()
            );
        }

        Ok(())
    }

    /// Cancels a job by its identity, best-effort: a job already fired but
    /// not yet executed may still run
    ///
    /// # Errors
    ///
    /// When the job store fails
    pub fn cancel(&self, kind: &JobKind) -> Result<(), Error> {
        self.jobs.cancel(kind.kind(), &kind.key())?;

        self.commands
            .send(Command::Cancel {
                kind: kind.kind().to_string(),
                key: kind.key(),
            })
            .ok();

        Ok(())
    }

    /// Cancels every reminder and the auto-miss check of an appointment
    ///
    /// # Errors
    ///
    /// When the job store fails
    pub fn cancel_appointment(&self, appointment_uid: i32) -> Result<(), Error> {
        self.jobs.cancel_prefix(
            "reminder_fire",
            &JobKind::reminder_key_prefix(appointment_uid),
        )?;

        self.cancel(&JobKind::AutoMissCheck { appointment_uid })
    }
}

/// Single-owner dispatcher for the timer queue.
///
/// One task owns the queue; fired jobs execute on worker tasks bounded by a
/// semaphore, and each execution persists its outcome before releasing.
pub struct Scheduler {
    jobs: Arc<dyn provider::Providable>,
    handler: Arc<dyn Handler>,
    clock: Arc<dyn Clock>,
    commands: CommandReceiver,
    queue: DelayQueue<i32>,
    queued: BTreeMap<i32, ScheduledJob>,
    identities: HashMap<(String, String), i32>,
    workers: Arc<Semaphore>,
    grace: Duration,
}

impl Scheduler {
    /// Creates a dispatcher over a handle's command receiver
    #[must_use]
    pub fn new(
        jobs: Arc<dyn provider::Providable>,
        handler: Arc<dyn Handler>,
        clock: Arc<dyn Clock>,
        commands: CommandReceiver,
        workers: usize,
        grace: Duration,
    ) -> Self {
        Self {
            jobs,
            handler,
            clock,
            commands,
            queue: DelayQueue::new(),
            queued: BTreeMap::new(),
            identities: HashMap::new(),
            workers: Arc::new(Semaphore::new(workers)),
            grace,
        }
    }

    /// Replays persisted pending jobs after a restart.
    ///
    /// Overdue jobs within the grace window fire immediately; staler jobs
    /// are marked failed, and future jobs re-arm at their stored instant.
    ///
    /// # Errors
    ///
    /// When the job store fails
    pub fn on_boot(&mut self) -> Result<(), Error> {
        let now = self.clock.now().naive_utc();

        for job in self.jobs.pending()? {
            if job.fire_at < now - self.grace {
                warn!(
                    "Skipping stale job {} {} overdue since {}",
                    job.kind, job.key, job.fire_at
                );
                self.jobs.complete(job.uid, JobStatus::Failed)?;
                continue;
            }

            self.enqueue(job);
        }

        Ok(())
    }

    /// Runs the dispatcher until every handle is dropped
    ///
    /// # Errors
    ///
    /// When the timer queue fails
    pub async fn run(mut self) -> Result<(), Error> {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Arm(job)) => self.enqueue(job),
                    Some(Command::Cancel { kind, key }) => self.dequeue(&kind, &key),
                    None => break,
                },
                Some(expired) = self.queue.next(), if !self.queue.is_empty() => {
                    let uid = *expired?.get_ref();
                    self.dispatch(uid);
                }
            }
        }

        Ok(())
    }

    /// Inserts a job into the timer queue, replacing its prior arm
    fn enqueue(&mut self, job: Job) {
        let identity = (job.kind.clone(), job.key.clone());
        self.dequeue(&identity.0, &identity.1);

        let now = self.clock.now().naive_utc();
        let delay = (job.fire_at - now).to_std().unwrap_or_default();

        let uid = job.uid;
        let key = self.queue.insert(uid, delay);

        self.queued.insert(uid, ScheduledJob { job, key });
        self.identities.insert(identity, uid);
    }

    /// Drops a queued job by identity, if it is still queued
    fn dequeue(&mut self, kind: &str, key: &str) {
        let Some(uid) = self
            .identities
            .remove(&(kind.to_string(), key.to_string()))
        else {
            return;
        };

        if let Some(scheduled) = self.queued.remove(&uid) {
            self.queue.remove(&scheduled.key);
        }
    }

    /// Hands a fired job to a worker task
    fn dispatch(&mut self, uid: i32) {
        let Some(scheduled) = self.queued.remove(&uid) else {
            return;
        };

        self.identities
            .remove(&(scheduled.job.kind.clone(), scheduled.job.key.clone()));

        let handler = Arc::clone(&self.handler);
        let jobs = Arc::clone(&self.jobs);
        let workers = Arc::clone(&self.workers);
        let job = scheduled.job;

        tokio::spawn(async move {
            let Ok(permit) = workers.acquire_owned().await else {
                return;
            };

            execute(handler, jobs, job).await;
            drop(permit);
        });
    }
}

/// Executes one fired job and persists its outcome
async fn execute(handler: Arc<dyn Handler>, jobs: Arc<dyn provider::Providable>, job: Job) {
    let kind = match job.to_kind() {
        Ok(kind) => kind,
        Err(parse_error) => {
            error!("Dropping malformed job {} {}: {}", job.kind, job.key, parse_error);
            complete(&jobs, job.uid, JobStatus::Failed);
            return;
        }
    };

    match handler.run(kind).await {
        Ok(()) => complete(&jobs, job.uid, JobStatus::Done),
        Err(job_error) => {
            error!("Job {} {} failed: {}", job.kind, job.key, job_error);
            complete(&jobs, job.uid, JobStatus::Failed);
        }
    }
}

/// Persists a job outcome, logging instead of failing the worker
fn complete(jobs: &Arc<dyn provider::Providable>, uid: i32, status: JobStatus) {
    if let Err(store_error) = jobs.complete(uid, status) {
        error!("Failed to record outcome for job {}: {}", uid, store_error);
    }
}
