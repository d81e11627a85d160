//! Booking orchestration: admission, claiming, and reminder planning

mod error;

pub use error::Error;

use crate::appointment::model::{Appointment, Reminder, ReminderStatus, Status};
use crate::classifier;
use crate::clock::Clock;
use crate::demand::DemandEngine;
use crate::message::{catalog, Catalog};
use crate::notifier::Notifier;
use crate::scheduler::{JobKind, SchedulerHandle};
use crate::user::model::{Category, User};
use chrono::{Duration, TimeZone};
use log::warn;
use std::collections::HashSet;
use std::sync::Arc;

/// Minutes after the appointment start at which the no-show check fires
const AUTO_MISS_DELAY_MINUTES: i64 = 10;

/// A successful booking and the nudge delivered at booking time, if any
#[derive(Debug)]
pub struct Booked {
    /// The appointment after claiming, with its reminder rows
    pub appointment: Appointment,
    /// Rendered text of the instant catch-up delivery, when one happened
    pub instant_nudge: Option<String>,
}

/// Orchestrates the booking protocol end to end
pub struct Coordinator {
    appointments: Arc<dyn crate::appointment::provider::Providable>,
    users: Arc<dyn crate::user::provider::Providable>,
    demand: Arc<DemandEngine>,
    catalog: Arc<Catalog>,
    notifier: Arc<dyn Notifier>,
    scheduler: SchedulerHandle,
    clock: Arc<dyn Clock>,
    clinic_name: String,
}

impl Coordinator {
    /// Creates a booking coordinator over the service seams
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        appointments: Arc<dyn crate::appointment::provider::Providable>,
        users: Arc<dyn crate::user::provider::Providable>,
        demand: Arc<DemandEngine>,
        catalog: Arc<Catalog>,
        notifier: Arc<dyn Notifier>,
        scheduler: SchedulerHandle,
        clock: Arc<dyn Clock>,
        clinic_name: String,
    ) -> Self {
        Self {
            appointments,
            users,
            demand,
            catalog,
            notifier,
            scheduler,
            clock,
            clinic_name,
        }
    }

    /// Books an available appointment for a registered user.
    ///
    /// Admission, claiming, reminder planning, and the no-show check are one
    /// protocol: at-risk users are rejected for high-demand slots, the claim
    /// is a compare-and-set, elapsed lead hours collapse into at most one
    /// instant catch-up delivery, and future reminders plus the auto-miss
    /// check are armed durably.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown appointment, `NotAvailable` when the slot
    /// is taken (including lost claim races), `UserNotRegistered` for an
    /// unknown user, `AdmissionDenied` for an at-risk user against a
    /// high-demand slot, and store errors from the seams
    pub async fn book(
        &self,
        appointment_uid: i32,
        user_name: &str,
        phone: Option<String>,
    ) -> Result<Booked, Error> {
        let appointment = self
            .appointments
            .get_by_uid(appointment_uid)?
            .ok_or(Error::NotFound {
                uid: appointment_uid,
            })?;

        if appointment.status != Status::Available {
            return Err(Error::NotAvailable {
                uid: appointment_uid,
            });
        }

        let mut user =
            self.users
                .get_by_name(user_name)?
                .ok_or_else(|| Error::UserNotRegistered {
                    user_name: user_name.to_string(),
                })?;

        if let Some(phone) = phone {
            if user.phone.is_none() {
                user.phone = Some(phone);
                user = self.users.update(&user)?;
            }
        }

        self.demand
            .ensure_month(&appointment.doctor_name, appointment.scheduled_at)?;

        if user.category == Category::AtRisk
            && self
                .demand
                .is_high_demand(&appointment.doctor_name, appointment.scheduled_at)?
        {
            return Err(Error::AdmissionDenied {
                doctor_name: appointment.doctor_name,
            });
        }

        if !self.appointments.claim(appointment_uid, &user.user_name)? {
            return Err(Error::NotAvailable {
                uid: appointment_uid,
            });
        }

        let (rows, instant_nudge) = self.plan_reminders(&appointment, &user)?;

        self.appointments.set_reminders(appointment_uid, rows.clone())?;

        if let Some(nudge) = &instant_nudge {
            self.notifier.send(&user, nudge).await;
        }

        for row in &rows {
            if row.status == ReminderStatus::Scheduled {
                self.scheduler.arm_at(
                    &JobKind::ReminderFire {
                        appointment_uid,
                        send_at: row.send_at,
                    },
                    row.send_at,
                )?;
            }
        }

        self.scheduler.arm_at(
            &JobKind::AutoMissCheck { appointment_uid },
            appointment.scheduled_at + Duration::minutes(AUTO_MISS_DELAY_MINUTES),
        )?;

        let appointment = self
            .appointments
            .get_by_uid(appointment_uid)?
            .ok_or(Error::NotFound {
                uid: appointment_uid,
            })?;

        Ok(Booked {
            appointment,
            instant_nudge,
        })
    }

    /// Builds the reminder rows for a fresh booking.
    ///
    /// Lead hours are walked largest first; elapsed leads are recorded as
    /// sent at the current instant, and only the first of them renders a
    /// text for the instant catch-up. An empty template pool degrades to
    /// recording without delivery.
    fn plan_reminders(
        &self,
        appointment: &Appointment,
        user: &User,
    ) -> Result<(Vec<Reminder>, Option<String>), Error> {
        let now = self.clock.now().naive_utc();
        let category = classifier::message_category(user.category);
        let local_start = self
            .clock
            .timezone()
            .from_utc_datetime(&appointment.scheduled_at);

        let mut rows = Vec::new();
        let mut used = HashSet::new();
        let mut instant_nudge = None;
        let mut caught_up = false;

        for lead in classifier::lead_hours(user.category) {
            let send_at = appointment.scheduled_at - Duration::hours(*lead);

            if send_at > now {
                rows.push(Reminder {
                    category,
                    send_at,
                    status: ReminderStatus::Scheduled,
                    text: None,
                });
                continue;
            }

            let text = if caught_up {
                None
            } else {
                caught_up = true;

                match self.catalog.pick_unique(category, &mut used) {
                    Ok(template) => {
                        let rendered = catalog::compose(
                            &self.clinic_name,
                            &appointment.doctor_name,
                            &local_start,
                            &template,
                            user,
                        );
                        instant_nudge = Some(rendered.clone());
                        Some(rendered)
                    }
                    Err(crate::message::Error::EmptyCategory(category)) => {
                        warn!(
                            "No templates for {}; recording reminder without delivery",
                            category
                        );
                        None
                    }
                    Err(pool_error) => return Err(pool_error.into()),
                }
            };

            rows.push(Reminder {
                category,
                send_at: now,
                status: ReminderStatus::Sent,
                text,
            });
        }

        Ok((rows, instant_nudge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::provider::MockProvidable as MockAppointments;
    use crate::clock::MockClock;
    use crate::demand::provider::MockProvidable as MockCells;
    use crate::message::model::{Message, MessageCategory};
    use crate::message::provider::MockProvidable as MockMessages;
    use crate::notifier::MockNotifier;
    use crate::scheduler::provider::MockProvidable as MockJobs;
    use crate::user::provider::MockProvidable as MockUsers;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
    use chrono_tz::Asia::Riyadh;

    type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

    fn instant(hour: u32) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2025, 10, 7)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .ok_or_else(|| "invalid test instant".into())
    }

    fn fixed_clock(at: NaiveDateTime) -> MockClock {
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .returning(move || Utc.from_utc_datetime(&at).with_timezone(&Riyadh));
        clock.expect_timezone().return_const(Riyadh);
        clock
    }

    fn good_user() -> User {
        User {
            uid: 1,
            user_name: String::from("Laura"),
            normalized_name: String::from("laura"),
            display_name: None,
            phone: Some(String::from("555-0100")),
            notify_channel_id: Some(String::from("42")),
            attended_count: 2,
            missed_count: 1,
            score: 20,
            category: Category::Good,
        }
    }

    fn available_appointment(scheduled_at: NaiveDateTime) -> Appointment {
        Appointment {
            uid: 7,
            doctor_name: String::from("Dr. Sara"),
            scheduled_at,
            status: Status::Available,
            user_name: None,
            reminders: Vec::new(),
        }
    }

    struct Seams {
        appointments: MockAppointments,
        users: MockUsers,
        cells: MockCells,
        messages: MockMessages,
        jobs: MockJobs,
        notifier: MockNotifier,
    }

    impl Seams {
        fn new() -> Self {
            Self {
                appointments: MockAppointments::new(),
                users: MockUsers::new(),
                cells: MockCells::new(),
                messages: MockMessages::new(),
                jobs: MockJobs::new(),
                notifier: MockNotifier::new(),
            }
        }

        fn into_coordinator(self, now: NaiveDateTime) -> Coordinator {
            let appointments: Arc<dyn crate::appointment::provider::Providable> =
                Arc::new(self.appointments);
            let clock: Arc<dyn Clock> = Arc::new(fixed_clock(now));

            let demand = Arc::new(DemandEngine::new(
                Arc::new(self.cells),
                Arc::clone(&appointments),
                Arc::clone(&clock),
            ));

            let (scheduler, _commands) = SchedulerHandle::new(Arc::new(self.jobs));

            Coordinator::new(
                appointments,
                Arc::new(self.users),
                demand,
                Arc::new(Catalog::new(Arc::new(self.messages))),
                Arc::new(self.notifier),
                scheduler,
                clock,
                String::from("Lakeside Clinic"),
            )
        }
    }

    #[tokio::test]
    async fn it_rejects_unknown_appointments() -> Result<()> {
        let now = instant(6)?;
        let mut seams = Seams::new();

        seams.appointments.expect_get_by_uid().returning(|_| Ok(None));

        let coordinator = seams.into_coordinator(now);

        assert!(matches!(
            coordinator.book(7, "Laura", None).await,
            Err(Error::NotFound { uid: 7 })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_unregistered_users() -> Result<()> {
        let now = instant(6)?;
        let slot = instant(9)?;
        let mut seams = Seams::new();

        seams
            .appointments
            .expect_get_by_uid()
            .returning(move |_| Ok(Some(available_appointment(slot))));
        seams.users.expect_get_by_name().returning(|_| Ok(None));

        let coordinator = seams.into_coordinator(now);

        assert!(matches!(
            coordinator.book(7, "Laura", None).await,
            Err(Error::UserNotRegistered { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn it_denies_at_risk_users_on_high_demand_slots() -> Result<()> {
        let now = instant(6)?;
        let slot = instant(9)?;
        let mut seams = Seams::new();

        seams
            .appointments
            .expect_get_by_uid()
            .returning(move |_| Ok(Some(available_appointment(slot))));

        seams.users.expect_get_by_name().returning(|_| {
            let mut user = good_user();
            user.category = Category::AtRisk;
            Ok(Some(user))
        });

        seams.cells.expect_month_exists().returning(|_, _, _| Ok(true));

        // The effective cell for the slot is at its threshold
        seams.cells.expect_find().returning(|key| {
            Ok(Some(crate::demand::model::DemandCell {
                uid: 1,
                doctor_name: key.doctor_name.clone(),
                year: key.year,
                month: key.month,
                day_of_week: key.day_of_week,
                hour: key.hour,
                total_appointments: 3,
                high_demand_threshold: 3.0,
                source: crate::demand::model::CellSource::Auto,
                last_updated: NaiveDateTime::default(),
            }))
        });

        let coordinator = seams.into_coordinator(now);

        assert!(matches!(
            coordinator.book(7, "Laura", None).await,
            Err(Error::AdmissionDenied { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn it_delivers_exactly_one_instant_catch_up_for_elapsed_leads() -> Result<()> {
        let now = instant(6)?;
        let slot = instant(7)?; // one hour out: both Good leads are elapsed
        let mut seams = Seams::new();

        seams
            .appointments
            .expect_get_by_uid()
            .returning(move |_| Ok(Some(available_appointment(slot))));
        seams
            .users
            .expect_get_by_name()
            .returning(|_| Ok(Some(good_user())));
        seams.cells.expect_month_exists().returning(|_, _, _| Ok(true));
        seams.cells.expect_find().returning(|_| Ok(None));
        seams
            .appointments
            .expect_claim()
            .times(1)
            .returning(|_, _| Ok(true));

        seams.messages.expect_get_by_category().returning(|_| {
            Ok(vec![Message {
                uid: 1,
                category: MessageCategory::DefaultNudge,
                text: String::from("See you soon, name"),
            }])
        });

        let sent_rows = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = Arc::clone(&sent_rows);
        seams
            .appointments
            .expect_set_reminders()
            .times(1)
            .returning(move |_, rows| {
                captured
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .extend(rows);
                Ok(())
            });

        seams.notifier.expect_send().times(1).returning(|_, _| true);

        // No future reminders: only the auto-miss check is armed
        seams.jobs.expect_arm().times(1).returning(|new_job| {
            Ok(crate::scheduler::job::Job {
                uid: 1,
                kind: new_job.kind,
                key: new_job.key,
                fire_at: new_job.fire_at,
                payload: new_job.payload,
                status: crate::scheduler::job::JobStatus::Pending,
                attempts: 0,
            })
        });

        let coordinator = seams.into_coordinator(now);
        let booked = coordinator.book(7, "Laura", None).await?;

        assert!(booked.instant_nudge.is_some());

        let rows = sent_rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        assert_eq!(2, rows.len());
        assert!(rows
            .iter()
            .all(|row| row.status == ReminderStatus::Sent && row.send_at == now));
        assert_eq!(1, rows.iter().filter(|row| row.text.is_some()).count());

        Ok(())
    }

    #[tokio::test]
    async fn it_reports_a_lost_claim_race_as_not_available() -> Result<()> {
        let now = instant(6)?;
        let slot = instant(12)?;
        let mut seams = Seams::new();

        seams
            .appointments
            .expect_get_by_uid()
            .returning(move |_| Ok(Some(available_appointment(slot))));
        seams
            .users
            .expect_get_by_name()
            .returning(|_| Ok(Some(good_user())));
        seams.cells.expect_month_exists().returning(|_, _, _| Ok(true));
        seams.cells.expect_find().returning(|_| Ok(None));
        seams.appointments.expect_claim().returning(|_, _| Ok(false));

        let coordinator = seams.into_coordinator(now);

        assert!(matches!(
            coordinator.book(7, "Laura", None).await,
            Err(Error::NotAvailable { uid: 7 })
        ));

        Ok(())
    }
}
