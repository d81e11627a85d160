//! Data model for a new appointment slot

use crate::database::schema::appointments;
use chrono::NaiveDateTime;

/// Necessary data to create an available appointment slot
#[derive(Debug, Eq, Insertable, PartialEq)]
#[table_name = "appointments"]
pub struct NewAppointment {
    /// Doctor the slot belongs to
    pub doctor_name: String,
    /// Start of the slot as a UTC instant
    pub scheduled_at: NaiveDateTime,
}
