//! Provider for appointment data

use super::model::{Appointment, NewAppointment, Reminder, ReminderStatus, Status, StoredReminders};
use super::Error;
use crate::database::{schema::appointments, Database};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Providable interface for appointment management
#[cfg_attr(test, automock)]
pub trait Providable: Send + Sync {
    /// Creates a new available slot in the database
    ///
    /// # Errors
    ///
    /// When the insertion fails
    fn add(&self, appointment: NewAppointment) -> Result<Appointment, Error>;

    /// Creates a batch of available slots in the database
    ///
    /// # Errors
    ///
    /// When any insertion fails
    fn add_all(&self, new_appointments: Vec<NewAppointment>) -> Result<Vec<Appointment>, Error>;

    /// Removes an existing appointment from the database
    ///
    /// # Errors
    ///
    /// When the removal fails
    fn remove(&self, uid: i32) -> Result<(), Error>;

    /// Retrieves an appointment from the database by its uid
    ///
    /// # Errors
    ///
    /// When appointment retrieval fails
    fn get_by_uid(&self, uid: i32) -> Result<Option<Appointment>, Error>;

    /// Retrieves all appointments from the database
    ///
    /// # Errors
    ///
    /// When appointment retrieval fails
    fn get_all(&self) -> Result<Vec<Appointment>, Error>;

    /// Retrieves all appointments with the given status
    ///
    /// # Errors
    ///
    /// When appointment retrieval fails
    fn get_by_status(&self, status: Status) -> Result<Vec<Appointment>, Error>;

    /// Transitions an available slot to booked for the given user.
    ///
    /// The write is a compare-and-set on the status so a lost race reports
    /// `false` instead of double-booking.
    ///
    /// # Errors
    ///
    /// When the update fails
    fn claim(&self, uid: i32, user_name: &str) -> Result<bool, Error>;

    /// Transitions a booked appointment to a terminal status.
    ///
    /// The write is a compare-and-set on the status; `false` means the
    /// appointment was not booked at write time.
    ///
    /// # Errors
    ///
    /// When the update fails
    fn resolve(&self, uid: i32, status: Status) -> Result<bool, Error>;

    /// Replaces the reminder list owned by an appointment
    ///
    /// # Errors
    ///
    /// When the update fails
    fn set_reminders(&self, uid: i32, reminders: Vec<Reminder>) -> Result<(), Error>;

    /// Transitions the reminder row at `send_at` from scheduled to sent,
    /// recording the rendered text when a delivery was attempted.
    ///
    /// Reports `false` when no scheduled row exists at that send time, which
    /// makes replayed deliveries no-ops.
    ///
    /// # Errors
    ///
    /// When the update fails
    fn mark_reminder_sent(
        &self,
        uid: i32,
        send_at: NaiveDateTime,
        text: Option<String>,
    ) -> Result<bool, Error>;

    /// Deletes available slots which start before the given instant
    ///
    /// # Errors
    ///
    /// When the deletion fails
    fn delete_expired_available(&self, before: NaiveDateTime) -> Result<usize, Error>;

    /// Retrieves attended appointments within `[start, end)`
    ///
    /// # Errors
    ///
    /// When appointment retrieval fails
    fn attended_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, Error>;

    /// Retrieves available appointments within `[start, end)`
    ///
    /// # Errors
    ///
    /// When appointment retrieval fails
    fn available_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, Error>;
}

/// Provides access to appointment data in persistent storage
pub struct Provider {
    database: Arc<dyn Database>,
}

impl Provider {
    /// Creates a new appointment data provider
    #[must_use]
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }
}

impl Providable for Provider {
    fn add(&self, appointment: NewAppointment) -> Result<Appointment, Error> {
        let connection = self.database.connection();

        diesel::insert_into(appointments::table)
            .values(appointment)
            .execute(&*connection)?;

        Ok(appointments::table
            .order(appointments::uid.desc())
            .first(&*connection)?)
    }

    fn add_all(&self, new_appointments: Vec<NewAppointment>) -> Result<Vec<Appointment>, Error> {
        let connection = self.database.connection();
        let count = new_appointments.len();

        for appointment in new_appointments {
            diesel::insert_into(appointments::table)
                .values(appointment)
                .execute(&*connection)?;
        }

        let mut created: Vec<Appointment> = appointments::table
            .order(appointments::uid.desc())
            .limit(i64::try_from(count).unwrap_or(i64::MAX))
            .load(&*connection)?;

        created.reverse();

        Ok(created)
    }

    fn remove(&self, uid: i32) -> Result<(), Error> {
        diesel::delete(appointments::table.find(uid))
            .execute(&*self.database.connection())?;

        Ok(())
    }

    fn get_by_uid(&self, uid: i32) -> Result<Option<Appointment>, Error> {
        Ok(appointments::table
            .find(uid)
            .first(&*self.database.connection())
            .optional()?)
    }

    fn get_all(&self) -> Result<Vec<Appointment>, Error> {
        Ok(appointments::table
            .order(appointments::scheduled_at.asc())
            .load(&*self.database.connection())?)
    }

    fn get_by_status(&self, status: Status) -> Result<Vec<Appointment>, Error> {
        Ok(appointments::table
            .filter(appointments::status.eq(status))
            .order(appointments::scheduled_at.asc())
            .load(&*self.database.connection())?)
    }

    fn claim(&self, uid: i32, user_name: &str) -> Result<bool, Error> {
        let updated = diesel::update(
            appointments::table
                .find(uid)
                .filter(appointments::status.eq(Status::Available)),
        )
        .set((
            appointments::status.eq(Status::Booked),
            appointments::user_name.eq(user_name.to_string()),
        ))
        .execute(&*self.database.connection())?;

        Ok(updated > 0)
    }

    fn resolve(&self, uid: i32, status: Status) -> Result<bool, Error> {
        let updated = diesel::update(
            appointments::table
                .find(uid)
                .filter(appointments::status.eq(Status::Booked)),
        )
        .set(appointments::status.eq(status))
        .execute(&*self.database.connection())?;

        Ok(updated > 0)
    }

    fn set_reminders(&self, uid: i32, reminders: Vec<Reminder>) -> Result<(), Error> {
        diesel::update(appointments::table.find(uid))
            .set(appointments::reminders.eq(StoredReminders(reminders)))
            .execute(&*self.database.connection())?;

        Ok(())
    }

    fn mark_reminder_sent(
        &self,
        uid: i32,
        send_at: NaiveDateTime,
        text: Option<String>,
    ) -> Result<bool, Error> {
        let connection = self.database.connection();

        let appointment: Option<Appointment> = appointments::table
            .find(uid)
            .first(&*connection)
            .optional()?;

        let Some(appointment) = appointment else {
            return Ok(false);
        };

        let mut reminders = appointment.reminders;
        let row = reminders.iter_mut().find(|reminder| {
            reminder.send_at == send_at && reminder.status == ReminderStatus::Scheduled
        });

        let Some(row) = row else {
            return Ok(false);
        };

        row.status = ReminderStatus::Sent;
        row.text = text;

        diesel::update(appointments::table.find(uid))
            .set(appointments::reminders.eq(StoredReminders(reminders)))
            .execute(&*connection)?;

        Ok(true)
    }

    fn delete_expired_available(&self, before: NaiveDateTime) -> Result<usize, Error> {
        Ok(diesel::delete(
            appointments::table
                .filter(appointments::status.eq(Status::Available))
                .filter(appointments::scheduled_at.lt(before)),
        )
        .execute(&*self.database.connection())?)
    }

    fn attended_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, Error> {
        Ok(appointments::table
            .filter(appointments::status.eq(Status::Attended))
            .filter(appointments::scheduled_at.ge(start))
            .filter(appointments::scheduled_at.lt(end))
            .load(&*self.database.connection())?)
    }

    fn available_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Appointment>, Error> {
        Ok(appointments::table
            .filter(appointments::status.eq(Status::Available))
            .filter(appointments::scheduled_at.ge(start))
            .filter(appointments::scheduled_at.lt(end))
            .load(&*self.database.connection())?)
    }
}
