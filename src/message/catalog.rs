//! Category-keyed template selection with per-appointment uniqueness

use super::model::MessageCategory;
use super::Error;
use crate::user::model::User;
use chrono::DateTime;
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;

/// Token in a template which is replaced with the patient's name on render
const NAME_TOKEN: &str = "name";

/// Selects reminder templates from the pool
pub struct Catalog {
    messages: Arc<dyn super::provider::Providable>,
}

impl Catalog {
    /// Creates a new catalog over the message pool
    #[must_use]
    pub fn new(messages: Arc<dyn super::provider::Providable>) -> Self {
        Self { messages }
    }

    /// Picks a template for the category whose text is not in `used`,
    /// uniformly at random from the remaining pool, and records it in `used`.
    ///
    /// Uniqueness is scoped to the caller's `used` set, which callers carry
    /// per appointment.
    ///
    /// # Errors
    ///
    /// `EmptyCategory` when the pool holds no templates for the category, or
    /// `ExhaustedPool` when `used` already covers the pool; the caller
    /// decides whether to reset the set or skip the delivery.
    pub fn pick_unique(
        &self,
        category: MessageCategory,
        used: &mut HashSet<String>,
    ) -> Result<String, Error> {
        let pool = self.messages.get_by_category(category)?;

        if pool.is_empty() {
            return Err(Error::EmptyCategory(category));
        }

        let remaining: Vec<&str> = pool
            .iter()
            .map(|message| message.text.as_str())
            .filter(|text| !used.contains(*text))
            .collect();

        let text = remaining
            .choose(&mut rand::thread_rng())
            .ok_or(Error::ExhaustedPool(category))?;

        used.insert((*text).to_string());

        Ok((*text).to_string())
    }
}

/// Substitutes every literal `name` token with the user's preferred name
#[must_use]
pub fn personalize(template: &str, user: &User) -> String {
    template.replace(NAME_TOKEN, user.preferred_name())
}

/// Composes a full nudge: the standard clinic header plus the personalized
/// template text
#[must_use]
pub fn compose(
    clinic_name: &str,
    doctor_name: &str,
    starts_at: &DateTime<Tz>,
    template: &str,
    user: &User,
) -> String {
    format!(
        "{}: appointment with {} on {}\n{}",
        clinic_name,
        doctor_name,
        starts_at.format("%Y-%m-%d %H:%M"),
        personalize(template, user),
    )
}
