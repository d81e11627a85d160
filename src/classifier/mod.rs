//! Behavior classification from attendance records.
//!
//! Pure functions only: the category rule, the reminder lead-hour plan, the
//! nudge category, and the score rule all derive from a user's counters with
//! no storage access.

use crate::message::model::MessageCategory;
use crate::user::model::Category;

/// Number of attendance events before the category rule takes effect
const CATEGORY_SAMPLE_FLOOR: i32 = 3;

/// Attendance outcome of a resolved appointment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The patient showed up
    Attended,
    /// The patient did not show up
    Missed,
}

/// Derives a user's behavior class from their attendance counters.
///
/// Below `CATEGORY_SAMPLE_FLOOR` total events the current category is kept;
/// admin overrides therefore stick until enough history accumulates.
#[must_use]
pub fn category_for(attended: i32, missed: i32, current: Category) -> Category {
    let total = attended + missed;

    if total < CATEGORY_SAMPLE_FLOOR {
        return current;
    }

    let rate = 100.0 * f64::from(attended) / f64::from(total);

    if rate >= 80.0 {
        Category::VeryGood
    } else if rate >= 60.0 {
        Category::Good
    } else {
        Category::AtRisk
    }
}

/// Returns the reminder lead hours for a behavior class, largest first
#[must_use]
pub fn lead_hours(category: Category) -> &'static [i64] {
    match category {
        Category::VeryGood => &[24],
        Category::Good => &[24, 2],
        Category::AtRisk => &[48, 6, 1],
    }
}

/// Returns the nudge category to draw reminder texts from
#[must_use]
pub fn message_category(category: Category) -> MessageCategory {
    match category {
        Category::VeryGood => MessageCategory::PositiveNudge,
        Category::Good => MessageCategory::DefaultNudge,
        Category::AtRisk => MessageCategory::ReEngagement,
    }
}

/// Applies an attendance outcome to a score, clamping at zero
#[must_use]
pub fn apply_score(score: i32, outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Attended => score + 10,
        Outcome::Missed => (score - 5).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_keeps_the_current_category_below_three_events() {
        assert_eq!(Category::Good, category_for(0, 0, Category::Good));
        assert_eq!(Category::Good, category_for(0, 2, Category::Good));
        assert_eq!(Category::AtRisk, category_for(2, 0, Category::AtRisk));
    }

    #[test]
    fn it_classifies_by_rate_once_three_events_accumulate() {
        // 2/3 ~ 66.6 stays Good, another attended reaches 75, then 80
        assert_eq!(Category::Good, category_for(2, 1, Category::Good));
        assert_eq!(Category::Good, category_for(3, 1, Category::Good));
        assert_eq!(Category::VeryGood, category_for(4, 1, Category::Good));
    }

    #[test]
    fn it_classifies_boundary_rates() {
        assert_eq!(Category::VeryGood, category_for(4, 1, Category::AtRisk));
        assert_eq!(Category::Good, category_for(3, 2, Category::VeryGood));
        assert_eq!(Category::AtRisk, category_for(1, 2, Category::Good));
    }

    #[test]
    fn it_plans_more_reminders_for_riskier_patients() {
        assert_eq!(&[24], lead_hours(Category::VeryGood));
        assert_eq!(&[24, 2], lead_hours(Category::Good));
        assert_eq!(&[48, 6, 1], lead_hours(Category::AtRisk));
    }

    #[test]
    fn it_selects_the_nudge_category_by_class() {
        assert_eq!(
            MessageCategory::PositiveNudge,
            message_category(Category::VeryGood)
        );
        assert_eq!(
            MessageCategory::DefaultNudge,
            message_category(Category::Good)
        );
        assert_eq!(
            MessageCategory::ReEngagement,
            message_category(Category::AtRisk)
        );
    }

    #[test]
    fn it_rewards_attendance_and_clamps_missed_penalties() {
        assert_eq!(10, apply_score(0, Outcome::Attended));
        assert_eq!(15, apply_score(5, Outcome::Attended));
        assert_eq!(0, apply_score(3, Outcome::Missed));
        assert_eq!(7, apply_score(12, Outcome::Missed));
    }
}
