//! Attendance resolution: terminal transitions and their side effects

mod error;

pub use error::Error;

use crate::appointment::model::{Appointment, Status};
use crate::classifier::{self, Outcome};
use crate::demand::DemandEngine;
use crate::notifier::Notifier;
use log::warn;
use std::sync::Arc;

/// Resolves appointments to attended or missed and applies the fallout to
/// the patient's record and the demand engine
pub struct Service {
    appointments: Arc<dyn crate::appointment::provider::Providable>,
    users: Arc<dyn crate::user::provider::Providable>,
    demand: Arc<DemandEngine>,
    notifier: Arc<dyn Notifier>,
    survey_url: Option<String>,
}

impl Service {
    /// Creates an attendance service over the service seams
    #[must_use]
    pub fn new(
        appointments: Arc<dyn crate::appointment::provider::Providable>,
        users: Arc<dyn crate::user::provider::Providable>,
        demand: Arc<DemandEngine>,
        notifier: Arc<dyn Notifier>,
        survey_url: Option<String>,
    ) -> Self {
        Self {
            appointments,
            users,
            demand,
            notifier,
            survey_url,
        }
    }

    /// Resolves an appointment to a terminal status.
    ///
    /// Idempotent: resolving to the status the appointment already holds
    /// changes nothing. Resolving against the other terminal status fails,
    /// and terminal states never revert.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown appointment, `InvalidTransition` when the
    /// appointment is not booked or already resolved differently, and store
    /// errors from the seams
    pub async fn set_status(&self, uid: i32, status: Status) -> Result<Appointment, Error> {
        self.transition(uid, status, false).await
    }

    /// Marks a still-booked appointment missed shortly after its start.
    ///
    /// A no-op when the appointment is gone or already resolved, which makes
    /// crash-recovery replays safe.
    ///
    /// # Errors
    ///
    /// When a store operation fails
    pub async fn auto_miss(&self, uid: i32) -> Result<Option<Appointment>, Error> {
        let Some(appointment) = self.appointments.get_by_uid(uid)? else {
            return Ok(None);
        };

        if appointment.status != Status::Booked {
            return Ok(None);
        }

        self.transition(uid, Status::Missed, true).await.map(Some)
    }

    async fn transition(
        &self,
        uid: i32,
        status: Status,
        via_auto_miss: bool,
    ) -> Result<Appointment, Error> {
        let appointment = self
            .appointments
            .get_by_uid(uid)?
            .ok_or(Error::NotFound { uid })?;

        if !status.is_terminal() {
            return Err(Error::InvalidTransition {
                uid,
                from: appointment.status,
                to: status,
            });
        }

        if appointment.status == status {
            return Ok(appointment);
        }

        if !self.appointments.resolve(uid, status)? {
            // Lost a race or the appointment was never booked; reload to
            // distinguish an idempotent replay from a conflict
            let current = self
                .appointments
                .get_by_uid(uid)?
                .ok_or(Error::NotFound { uid })?;

            if current.status == status {
                return Ok(current);
            }

            return Err(Error::InvalidTransition {
                uid,
                from: current.status,
                to: status,
            });
        }

        let outcome = if status == Status::Attended {
            Outcome::Attended
        } else {
            Outcome::Missed
        };

        self.apply_to_user(&appointment, outcome, via_auto_miss)
            .await?;

        if outcome == Outcome::Attended {
            self.demand.record_attendance(&appointment)?;
        }

        Ok(Appointment {
            status,
            ..appointment
        })
    }

    /// Applies counters, score, and category to the booking user, and
    /// delivers the follow-up survey after an automatic miss
    async fn apply_to_user(
        &self,
        appointment: &Appointment,
        outcome: Outcome,
        via_auto_miss: bool,
    ) -> Result<(), Error> {
        let Some(user_name) = &appointment.user_name else {
            return Ok(());
        };

        let Some(mut user) = self.users.get_by_name(user_name)? else {
            warn!(
                "Appointment {} was booked by unknown user {}",
                appointment.uid, user_name
            );
            return Ok(());
        };

        match outcome {
            Outcome::Attended => user.attended_count += 1,
            Outcome::Missed => user.missed_count += 1,
        }

        user.score = classifier::apply_score(user.score, outcome);
        user.category = classifier::category_for(user.attended_count, user.missed_count, user.category);

        let user = self.users.update(&user)?;

        if outcome == Outcome::Missed && via_auto_miss {
            if let Some(survey_url) = &self.survey_url {
                let text = format!(
                    "We missed you at your appointment, {}. Tell us what happened: {}",
                    user.preferred_name(),
                    survey_url
                );

                self.notifier.send(&user, &text).await;
            }
        }

        Ok(())
    }
}
