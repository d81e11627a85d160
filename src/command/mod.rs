//! Commands for the CLI interface

mod appointment;
mod demand;
mod message;
mod user;

use crate::demand::DemandEngine;
use crate::service::Service;
use chrono_tz::Tz;
use structopt::StructOpt;

/// Providers and engines available to CLI command functionality
pub struct Context<'a> {
    /// Provider for user functionality
    pub users: &'a dyn crate::user::provider::Providable,
    /// Provider for appointment functionality
    pub appointments: &'a dyn crate::appointment::provider::Providable,
    /// Provider for message pool functionality
    pub messages: &'a dyn crate::message::provider::Providable,
    /// Demand learning and admission engine
    pub demand: &'a DemandEngine,
    /// Clinic timezone for interpreting dates and hours
    pub timezone: Tz,
}

/// Interface for executable CLI commands
pub trait Command {
    /// Executes the command
    ///
    /// # Errors
    ///
    /// When command execution fails, usually from a provider error
    fn execute(self, context: Context<'_>) -> Result<String, Box<dyn std::error::Error>>;
}

#[derive(StructOpt)]
#[structopt(name = "appointed", about = "Clinic appointments with adaptive reminders")]
/// Global commands for the CLI interface
pub enum Global {
    /// Manage registered patients
    User(user::User),
    /// Manage appointment slots
    Appointment(appointment::Appointment),
    /// Manage high-demand baselines and inspect learned demand
    Demand(demand::Demand),
    /// Manage the reminder message pool
    Message(message::Message),
    /// Book an available appointment for a registered patient
    Book {
        /// Uid of the appointment to book
        uid: i32,
        /// Name of the booking patient
        user_name: String,
        /// Contact phone to store if the patient has none
        #[structopt(short, long)]
        phone: Option<String>,
    },
    /// Resolve an appointment as attended or missed
    Status {
        /// Uid of the appointment to resolve
        uid: i32,
        /// Terminal status, attended or missed
        status: crate::appointment::model::Status,
    },
    /// Start the service: replay persisted jobs and run the scheduler
    Start,
}

/// Executes the given global command against the wired service
///
/// # Errors
///
/// When command execution fails
pub async fn execute(command: Global, service: Service) -> Result<String, Box<dyn std::error::Error>> {
    match command {
        Global::Start => {
            service.start().await?;
            Ok(String::from("Scheduler stopped"))
        }
        Global::Book {
            uid,
            user_name,
            phone,
        } => {
            let booked = service.booking.book(uid, &user_name, phone).await?;

            Ok(serde_json::to_string_pretty(&serde_json::json!({
                "appointment": booked.appointment,
                "instantNudge": booked.instant_nudge,
            }))?)
        }
        Global::Status { uid, status } => {
            let appointment = service.attendance.set_status(uid, status).await?;

            Ok(serde_json::to_string_pretty(&appointment)?)
        }
        Global::User(command) => command.execute(context(&service)),
        Global::Appointment(command) => command.execute(context(&service)),
        Global::Demand(command) => command.execute(context(&service)),
        Global::Message(command) => command.execute(context(&service)),
    }
}

/// Borrows a command context from the wired service
fn context(service: &Service) -> Context<'_> {
    Context {
        users: service.users.as_ref(),
        appointments: service.appointments.as_ref(),
        messages: service.messages.as_ref(),
        demand: service.demand.as_ref(),
        timezone: service.clock.timezone(),
    }
}
