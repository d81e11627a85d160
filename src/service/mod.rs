//! Service wiring and the handler behind every scheduled job

mod error;
pub mod periodic;

pub use error::Error;

use crate::appointment::model::{ReminderStatus, Status};
use crate::attendance;
use crate::booking;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::database::Database;
use crate::demand::engine::DEFAULT_PEAK_FRACTION;
use crate::demand::DemandEngine;
use crate::message::{catalog, Catalog};
use crate::notifier::{self, Notifier};
use crate::scheduler::{Handler, JobKind, Scheduler, SchedulerHandle};
use crate::{appointment, demand, message, scheduler, user};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDateTime, TimeZone};
use log::{error, info, warn};
use std::sync::Arc;

/// Executes fired scheduler jobs against the service's seams
pub struct Jobs {
    appointments: Arc<dyn appointment::provider::Providable>,
    users: Arc<dyn user::provider::Providable>,
    attendance: Arc<attendance::Service>,
    demand: Arc<DemandEngine>,
    catalog: Arc<Catalog>,
    notifier: Arc<dyn Notifier>,
    scheduler: SchedulerHandle,
    clock: Arc<dyn Clock>,
    clinic_name: String,
}

impl Jobs {
    /// Arms the three recurring maintenance jobs at their next occurrences.
    ///
    /// Arming replaces any persisted arm from a previous run, so calling
    /// this on every boot is safe.
    ///
    /// # Errors
    ///
    /// When the job store fails
    pub fn arm_periodic(&self) -> Result<(), scheduler::Error> {
        let now = self.clock.now();

        self.scheduler
            .arm_at(&JobKind::HourlyMaintenance, periodic::next_hourly(&now))?;
        self.scheduler
            .arm_at(&JobKind::MonthEndLearn, periodic::next_month_end(&now))?;
        self.scheduler.arm_at(
            &JobKind::MonthlyRecalc,
            periodic::next_monthly_recalc(&now),
        )
    }

    /// Delivers one scheduled reminder row of a booked appointment.
    ///
    /// Reloads the appointment first: bookings that resolved or vanished
    /// are skipped, and a row already marked sent makes replays no-ops.
    async fn reminder_fire(
        &self,
        appointment_uid: i32,
        send_at: NaiveDateTime,
    ) -> Result<(), Error> {
        let Some(appointment) = self.appointments.get_by_uid(appointment_uid)? else {
            return Ok(());
        };

        if appointment.status != Status::Booked {
            return Ok(());
        }

        let Some(user_name) = &appointment.user_name else {
            return Ok(());
        };

        let Some(user) = self.users.get_by_name(user_name)? else {
            return Ok(());
        };

        let Some(row) = appointment
            .reminders
            .iter()
            .find(|row| row.send_at == send_at && row.status == ReminderStatus::Scheduled)
        else {
            return Ok(());
        };

        let mut used = appointment.used_texts();

        let template = match self.catalog.pick_unique(row.category, &mut used) {
            Ok(template) => Some(template),
            Err(message::Error::ExhaustedPool(category)) => {
                // Every template was used within this appointment; permit
                // reuse rather than going silent
                used.clear();
                self.catalog.pick_unique(category, &mut used).ok()
            }
            Err(message::Error::EmptyCategory(category)) => {
                warn!(
                    "No templates for {}; marking reminder sent without delivery",
                    category
                );
                None
            }
            Err(pool_error) => return Err(pool_error.into()),
        };

        let rendered = template.map(|template| {
            catalog::compose(
                &self.clinic_name,
                &appointment.doctor_name,
                &self
                    .clock
                    .timezone()
                    .from_utc_datetime(&appointment.scheduled_at),
                &template,
                &user,
            )
        });

        if let Some(text) = &rendered {
            self.notifier.send(&user, text).await;
        }

        self.appointments
            .mark_reminder_sent(appointment_uid, send_at, rendered)?;

        Ok(())
    }

    /// Reconciles the current month's demand cells from attendance
    fn month_end_learn(&self) -> Result<(), Error> {
        let local = self.clock.now();

        self.demand.month_end_learn(
            local.year(),
            i32::try_from(local.month()).unwrap_or(1),
        )?;

        Ok(())
    }

    /// Recalculates thresholds and caps peaks for the previous calendar
    /// month, one doctor at a time; a failing doctor never blocks the rest
    fn monthly_recalc(&self) -> Result<(), Error> {
        let (year, month) = periodic::previous_month(&self.clock.now());

        for doctor in self.demand.doctors()? {
            if let Err(recalc_error) = self.demand.recalc(&doctor, year, month) {
                error!("Recalc failed for {}: {}", doctor, recalc_error);
                continue;
            }

            if let Err(cap_error) =
                self.demand
                    .cap_peaks(&doctor, year, month, DEFAULT_PEAK_FRACTION)
            {
                error!("Peak cap failed for {}: {}", doctor, cap_error);
            }
        }

        Ok(())
    }

    /// Deletes expired available slots and late-releases imminent
    /// high-demand cells
    fn hourly_maintenance(&self) -> Result<(), Error> {
        let now = self.clock.now().naive_utc();

        let removed = self.appointments.delete_expired_available(now)?;

        if removed > 0 {
            info!("Deleted {} expired available slots", removed);
        }

        self.demand.late_release()?;

        Ok(())
    }
}

#[async_trait]
impl Handler for Jobs {
    async fn run(&self, job: JobKind) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match job {
            JobKind::ReminderFire {
                appointment_uid,
                send_at,
            } => self.reminder_fire(appointment_uid, send_at).await?,
            JobKind::AutoMissCheck { appointment_uid } => {
                self.attendance.auto_miss(appointment_uid).await?;
            }
            JobKind::MonthEndLearn => {
                let outcome = self.month_end_learn();
                self.scheduler.arm_at(
                    &JobKind::MonthEndLearn,
                    periodic::next_month_end(&self.clock.now()),
                )?;
                outcome?;
            }
            JobKind::MonthlyRecalc => {
                let outcome = self.monthly_recalc();
                self.scheduler.arm_at(
                    &JobKind::MonthlyRecalc,
                    periodic::next_monthly_recalc(&self.clock.now()),
                )?;
                outcome?;
            }
            JobKind::HourlyMaintenance => {
                let outcome = self.hourly_maintenance();
                self.scheduler.arm_at(
                    &JobKind::HourlyMaintenance,
                    periodic::next_hourly(&self.clock.now()),
                )?;
                outcome?;
            }
        }

        Ok(())
    }
}

/// The fully wired appointment service
pub struct Service {
    /// Provider for user data
    pub users: Arc<dyn user::provider::Providable>,
    /// Provider for appointment data
    pub appointments: Arc<dyn appointment::provider::Providable>,
    /// Provider for message pool data
    pub messages: Arc<dyn message::provider::Providable>,
    /// Demand learning and admission engine
    pub demand: Arc<DemandEngine>,
    /// Booking orchestration
    pub booking: Arc<booking::Coordinator>,
    /// Attendance resolution
    pub attendance: Arc<attendance::Service>,
    /// Handle for arming and cancelling durable jobs
    pub scheduler: SchedulerHandle,
    /// Wall-clock source in clinic time
    pub clock: Arc<dyn Clock>,
    handler: Arc<Jobs>,
    dispatcher: Scheduler,
}

impl Service {
    /// Wires every component over the given database
    ///
    /// # Errors
    ///
    /// When the configured timezone is unknown
    pub fn new(config: &Config, database: Arc<dyn Database>) -> Result<Self, Error> {
        let timezone = config
            .clinic
            .timezone
            .parse()
            .map_err(|_| Error::UnknownTimezone {
                timezone: config.clinic.timezone.clone(),
            })?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(timezone));

        let users: Arc<dyn user::provider::Providable> =
            Arc::new(user::Provider::new(Arc::clone(&database)));
        let appointments: Arc<dyn appointment::provider::Providable> =
            Arc::new(appointment::Provider::new(Arc::clone(&database)));
        let messages: Arc<dyn message::provider::Providable> =
            Arc::new(message::Provider::new(Arc::clone(&database)));
        let cells: Arc<dyn demand::provider::Providable> =
            Arc::new(demand::Provider::new(Arc::clone(&database)));
        let jobs: Arc<dyn scheduler::provider::Providable> =
            Arc::new(scheduler::Provider::new(Arc::clone(&database)));

        let notifier: Arc<dyn Notifier> = match &config.telegram {
            Some(telegram) if !telegram.bot_token.is_empty() => {
                Arc::new(notifier::Telegram::new(&telegram.bot_token))
            }
            _ => Arc::new(notifier::Noop),
        };

        let catalog = Arc::new(Catalog::new(Arc::clone(&messages)));

        let demand = Arc::new(DemandEngine::new(
            cells,
            Arc::clone(&appointments),
            Arc::clone(&clock),
        ));

        let (scheduler, commands) = SchedulerHandle::new(Arc::clone(&jobs));

        let attendance = Arc::new(attendance::Service::new(
            Arc::clone(&appointments),
            Arc::clone(&users),
            Arc::clone(&demand),
            Arc::clone(&notifier),
            config.clinic.survey_url.clone(),
        ));

        let booking = Arc::new(booking::Coordinator::new(
            Arc::clone(&appointments),
            Arc::clone(&users),
            Arc::clone(&demand),
            Arc::clone(&catalog),
            Arc::clone(&notifier),
            scheduler.clone(),
            Arc::clone(&clock),
            config.clinic.name.clone(),
        ));

        let handler = Arc::new(Jobs {
            appointments: Arc::clone(&appointments),
            users: Arc::clone(&users),
            attendance: Arc::clone(&attendance),
            demand: Arc::clone(&demand),
            catalog,
            notifier,
            scheduler: scheduler.clone(),
            clock: Arc::clone(&clock),
            clinic_name: config.clinic.name.clone(),
        });

        let dispatcher = Scheduler::new(
            jobs,
            Arc::clone(&handler) as Arc<dyn Handler>,
            Arc::clone(&clock),
            commands,
            config.scheduler.workers,
            Duration::minutes(config.scheduler.grace_minutes),
        );

        Ok(Self {
            users,
            appointments,
            messages,
            demand,
            booking,
            attendance,
            scheduler,
            clock,
            handler,
            dispatcher,
        })
    }

    /// Boots the long-lived service: replays persisted jobs, arms the
    /// recurring maintenance jobs, and runs the dispatcher until shutdown
    ///
    /// # Errors
    ///
    /// When boot replay or the dispatcher fails
    pub async fn start(mut self) -> Result<(), scheduler::Error> {
        self.dispatcher.on_boot()?;
        self.handler.arm_periodic()?;

        info!("Scheduler is running");

        self.dispatcher.run().await
    }
}
