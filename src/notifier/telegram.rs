//! Notifier implementation over the Telegram Bot API

use super::Notifier;
use crate::user::model::User;
use async_trait::async_trait;
use log::warn;
use reqwest::Client;

/// Delivers nudges through a Telegram bot
pub struct Telegram {
    client: Client,
    base_url: String,
}

impl Telegram {
    /// Creates a notifier for the given bot token
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", token),
        }
    }
}

#[async_trait]
impl Notifier for Telegram {
    async fn send(&self, user: &User, text: &str) -> bool {
        let Some(channel) = &user.notify_channel_id else {
            return false;
        };

        let url = format!("{}/sendMessage", self.base_url);
        let body = serde_json::json!({
            "chat_id": channel,
            "text": text,
        });

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(
                    "Telegram rejected a delivery to {}: {}",
                    user.user_name,
                    response.status()
                );
                false
            }
            Err(error) => {
                warn!("Failed to reach Telegram for {}: {}", user.user_name, error);
                false
            }
        }
    }
}
