//! CLI interface commands for appointment slot management

use super::{Command, Context};
use crate::appointment::model::{NewAppointment, Status};
use crate::appointment::slots::SlotRequest;
use chrono::NaiveDate;
use structopt::StructOpt;

#[derive(StructOpt)]
/// Commands for appointment slot management
pub enum Appointment {
    /// Creates available slots: a single slot, one per day, or a daily grid
    Add {
        /// Doctor the slots belong to
        doctor_name: String,
        /// First day to create slots on, as YYYY-MM-DD in clinic time
        start_date: NaiveDate,
        /// Hour of day the window opens
        start_hour: u32,
        /// Last day to create slots on; defaults to the start date
        #[structopt(long)]
        end_date: Option<NaiveDate>,
        /// Minute the window opens
        #[structopt(long, default_value = "0")]
        start_minute: u32,
        /// Hour of day the window closes; omit for one slot per day
        #[structopt(long)]
        end_hour: Option<u32>,
        /// Minute the window closes
        #[structopt(long, default_value = "0")]
        end_minute: u32,
        /// Step between grid slots
        #[structopt(long, default_value = "60")]
        interval_minutes: u32,
    },
    /// Removes a slot by its uid
    Remove {
        /// Uid of the slot to remove
        uid: i32,
    },
    /// Lists available slots as a JSON array
    Available,
    /// Lists booked appointments as a JSON array
    Booked,
    /// Lists all appointments as a JSON array
    List,
}

impl Command for Appointment {
    fn execute(self, context: Context<'_>) -> Result<String, Box<dyn std::error::Error>> {
        match self {
            Self::Add {
                doctor_name,
                start_date,
                start_hour,
                end_date,
                start_minute,
                end_hour,
                end_minute,
                interval_minutes,
            } => {
                let request = SlotRequest {
                    start_date,
                    end_date,
                    start_hour,
                    start_minute,
                    end_hour,
                    end_minute,
                    interval_minutes,
                };

                let new_appointments: Vec<NewAppointment> = request
                    .expand(context.timezone)?
                    .into_iter()
                    .map(|scheduled_at| NewAppointment {
                        doctor_name: doctor_name.clone(),
                        scheduled_at,
                    })
                    .collect();

                let created = context.appointments.add_all(new_appointments)?;

                Ok(serde_json::to_string_pretty(&created)?)
            }
            Self::Remove { uid } => match context.appointments.get_by_uid(uid)? {
                Some(appointment) => {
                    context.appointments.remove(uid)?;
                    Ok(serde_json::to_string_pretty(&appointment)?)
                }
                None => Err(format!("No appointment exists with id {}", uid).into()),
            },
            Self::Available => Ok(serde_json::to_string_pretty(
                &context.appointments.get_by_status(Status::Available)?,
            )?),
            Self::Booked => Ok(serde_json::to_string_pretty(
                &context.appointments.get_by_status(Status::Booked)?,
            )?),
            Self::List => Ok(serde_json::to_string_pretty(
                &context.appointments.get_all()?,
            )?),
        }
    }
}
