//! Delivery of rendered nudges to a patient's linked messenger channel

mod telegram;

pub use telegram::Telegram;

use crate::user::model::User;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Best-effort delivery of a text to a linked user.
///
/// Implementations never propagate failures into the caller; the return
/// value only signals whether a delivery was attempted and likely landed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempts to deliver `text` to the user's linked channel.
    ///
    /// A user without a linked channel is a silent no-op.
    async fn send(&self, user: &User, text: &str) -> bool;
}

/// Notifier used when no messenger is configured; drops every delivery
pub struct Noop;

#[async_trait]
impl Notifier for Noop {
    async fn send(&self, _user: &User, _text: &str) -> bool {
        false
    }
}
