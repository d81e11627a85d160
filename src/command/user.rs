//! CLI interface commands for patient management

use super::{Command, Context};
use crate::user::model::{Category, NewUser};
use structopt::StructOpt;

#[derive(StructOpt)]
/// Commands for patient management
pub enum User {
    /// Registers a patient, or refreshes their details if already registered
    Register {
        /// Name to register the patient with
        user_name: String,
        /// Preferred display name
        #[structopt(short, long)]
        display_name: Option<String>,
        /// Contact phone number
        #[structopt(short, long)]
        phone: Option<String>,
    },
    /// Lists all patients as a JSON array
    List,
    /// Shows one patient
    Show {
        /// Name of the patient, any letter case
        user_name: String,
        /// Include counters, category, and channel-link state
        #[structopt(long)]
        admin: bool,
    },
    /// Overrides a patient's behavior class
    SetCategory {
        /// Name of the patient, any letter case
        user_name: String,
        /// Category: Good, "Very Good", or At-Risk
        category: Category,
    },
    /// Links a patient to a messenger channel for deliveries
    Link {
        /// Name of the patient, any letter case
        user_name: String,
        /// Opaque messenger channel id
        channel_id: String,
    },
}

impl Command for User {
    fn execute(self, context: Context<'_>) -> Result<String, Box<dyn std::error::Error>> {
        match self {
            Self::Register {
                user_name,
                display_name,
                phone,
            } => {
                let user = context.users.register(NewUser {
                    user_name,
                    display_name,
                    phone,
                })?;

                Ok(serde_json::to_string_pretty(&user.admin_summary())?)
            }
            Self::List => {
                let summaries: Vec<serde_json::Value> = context
                    .users
                    .get_all()?
                    .iter()
                    .map(crate::user::model::User::summary)
                    .collect();

                Ok(serde_json::to_string_pretty(&summaries)?)
            }
            Self::Show { user_name, admin } => match context.users.get_by_name(&user_name)? {
                Some(user) => {
                    let summary = if admin {
                        user.admin_summary()
                    } else {
                        user.summary()
                    };

                    Ok(serde_json::to_string_pretty(&summary)?)
                }
                None => Err(format!("No user is registered as {}", user_name).into()),
            },
            Self::SetCategory {
                user_name,
                category,
            } => match context.users.get_by_name(&user_name)? {
                Some(mut user) => {
                    user.category = category;

                    let user = context.users.update(&user)?;
                    Ok(serde_json::to_string_pretty(&user.admin_summary())?)
                }
                None => Err(format!("No user is registered as {}", user_name).into()),
            },
            Self::Link {
                user_name,
                channel_id,
            } => match context.users.get_by_name(&user_name)? {
                Some(mut user) => {
                    user.notify_channel_id = Some(channel_id);

                    let user = context.users.update(&user)?;
                    Ok(serde_json::to_string_pretty(&user.admin_summary())?)
                }
                None => Err(format!("No user is registered as {}", user_name).into()),
            },
        }
    }
}
