//! CLI interface commands for the reminder message pool

use super::{Command, Context};
use crate::message::model::{MessageCategory, NewMessage};
use structopt::StructOpt;

#[derive(StructOpt)]
/// Commands for the reminder message pool
pub enum Message {
    /// Adds a template to a category's pool
    Add {
        /// Category: default-nudge, positive-nudge, or re-engagement
        category: MessageCategory,
        /// Template text; the literal token `name` is substituted on render
        text: String,
    },
    /// Lists all templates as a JSON array
    List,
}

impl Command for Message {
    fn execute(self, context: Context<'_>) -> Result<String, Box<dyn std::error::Error>> {
        match self {
            Self::Add { category, text } => {
                let message = context.messages.add(NewMessage { category, text })?;

                Ok(serde_json::to_string_pretty(&message)?)
            }
            Self::List => Ok(serde_json::to_string_pretty(&context.messages.get_all()?)?),
        }
    }
}
