//! Next-occurrence computation for the recurring maintenance jobs.
//!
//! The scheduler only knows one-shot jobs; each periodic job re-arms its
//! next occurrence after running. All occurrences are computed in clinic
//! time and returned as UTC instants.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;

/// First day of month on which the month-end learning pass runs
const MONTH_END_FIRST_DAY: u32 = 28;

/// Next top of the hour after `now`
#[must_use]
pub fn next_hourly(now: &DateTime<Tz>) -> NaiveDateTime {
    let trimmed = now
        .with_minute(0)
        .and_then(|instant| instant.with_second(0))
        .and_then(|instant| instant.with_nanosecond(0))
        .unwrap_or(*now);

    (trimmed + Duration::hours(1)).naive_utc()
}

/// Next 23:59 falling on a day from 28 through month end after `now`
#[must_use]
pub fn next_month_end(now: &DateTime<Tz>) -> NaiveDateTime {
    let mut day = now.date_naive();

    // Bounded walk; the next qualifying day is at most ~5 weeks out
    for _ in 0..62 {
        if day.day() >= MONTH_END_FIRST_DAY {
            let candidate = day
                .and_hms_opt(23, 59, 0)
                .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest());

            if let Some(candidate) = candidate {
                if candidate > *now {
                    return candidate.naive_utc();
                }
            }
        }

        let Some(next) = day.succ_opt() else {
            break;
        };

        day = next;
    }

    (*now + Duration::hours(24)).naive_utc()
}

/// Next 02:00 on the first of a month after `now`
#[must_use]
pub fn next_monthly_recalc(now: &DateTime<Tz>) -> NaiveDateTime {
    let first_of_this_month = now
        .timezone()
        .with_ymd_and_hms(now.year(), now.month(), 1, 2, 0, 0)
        .single();

    if let Some(candidate) = first_of_this_month {
        if candidate > *now {
            return candidate.naive_utc();
        }
    }

    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    now.timezone()
        .with_ymd_and_hms(year, month, 1, 2, 0, 0)
        .single()
        .map_or_else(|| (*now + Duration::days(1)).naive_utc(), |candidate| {
            candidate.naive_utc()
        })
}

/// The calendar month before the given local instant's month
#[must_use]
pub fn previous_month(now: &DateTime<Tz>) -> (i32, i32) {
    if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), i32::try_from(now.month()).unwrap_or(2) - 1)
    }
}
