//! Data model for an appointment slot

use super::{Reminder, Status, StoredReminders};
use crate::database::schema::appointments;
use chrono::NaiveDateTime;
use diesel::backend::Backend;
use diesel::deserialize::{FromSqlRow, Queryable, Result as FromSqlResult};
use diesel::sql_types::{Integer, Nullable, Text, Timestamp};
use serde::Serialize;

/// Record for an individual appointment slot
#[derive(Clone, Debug, Identifiable, PartialEq, Serialize)]
#[primary_key("uid")]
pub struct Appointment {
    /// Unique identifier for the appointment record
    pub uid: i32,
    /// Doctor the slot belongs to
    pub doctor_name: String,
    /// Start of the slot as a UTC instant
    pub scheduled_at: NaiveDateTime,
    /// Lifecycle status of the slot
    pub status: Status,
    /// Booking user, present unless the slot is available
    pub user_name: Option<String>,
    /// Reminders owned by this appointment, ordered by send time
    pub reminders: Vec<Reminder>,
}

impl Appointment {
    /// Texts already used by this appointment's reminders.
    ///
    /// Template uniqueness is scoped to one appointment's lifetime, so the
    /// used set is derived from the rows rather than kept globally.
    #[must_use]
    pub fn used_texts(&self) -> std::collections::HashSet<String> {
        self.reminders
            .iter()
            .filter_map(|reminder| reminder.text.clone())
            .collect()
    }
}

impl<TDatabase> FromSqlRow<(Integer, Text, Timestamp, Text, Nullable<Text>, Text), TDatabase>
    for Appointment
where
    TDatabase: Backend,
    i32: FromSqlRow<Integer, TDatabase>,
    String: FromSqlRow<Text, TDatabase>,
    NaiveDateTime: FromSqlRow<Timestamp, TDatabase>,
    Status: FromSqlRow<Text, TDatabase>,
    Option<String>: FromSqlRow<Nullable<Text>, TDatabase>,
    StoredReminders: FromSqlRow<Text, TDatabase>,
{
    const FIELDS_NEEDED: usize = 6;

    /// Converts a `SQLite` row to an `Appointment` using `StoredReminders`
    fn build_from_row<TRow: diesel::row::Row<TDatabase>>(row: &mut TRow) -> FromSqlResult<Self> {
        Ok(Self {
            uid: i32::build_from_row(row)?,
            doctor_name: String::build_from_row(row)?,
            scheduled_at: NaiveDateTime::build_from_row(row)?,
            status: Status::build_from_row(row)?,
            user_name: Option::<String>::build_from_row(row)?,
            reminders: StoredReminders::build_from_row(row)?.0,
        })
    }
}

impl Queryable<appointments::SqlType, diesel::sqlite::Sqlite> for Appointment {
    type Row = Appointment;

    fn build(row: Self::Row) -> Self {
        row
    }
}
