//! Data models for appointment slots

mod appointment;
mod new_appointment;
mod reminder;
mod status;

pub use appointment::Appointment;
pub use new_appointment::NewAppointment;
pub use reminder::{Reminder, ReminderStatus, StoredReminders};
pub use status::Status;
