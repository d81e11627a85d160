//! Expansion of slot requests into concrete appointment instants

use super::Error;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// A request for one or more appointment slots.
///
/// With no `end_hour` the request yields one slot per day at the start time;
/// with an `end_hour` it yields a grid at `interval_minutes` steps within
/// the inclusive time window each day.
#[derive(Debug, Eq, PartialEq)]
pub struct SlotRequest {
    /// First day to create slots on, in clinic time
    pub start_date: NaiveDate,
    /// Last day to create slots on; defaults to the start date
    pub end_date: Option<NaiveDate>,
    /// Hour of day the window opens
    pub start_hour: u32,
    /// Minute the window opens
    pub start_minute: u32,
    /// Hour of day the window closes, when requesting a grid
    pub end_hour: Option<u32>,
    /// Minute the window closes
    pub end_minute: u32,
    /// Step between grid slots
    pub interval_minutes: u32,
}

impl SlotRequest {
    /// Expands the request into slot instants, as UTC
    ///
    /// # Errors
    ///
    /// When the date or time window is reversed, a time component is out of
    /// range, or the grid interval is zero
    pub fn expand(&self, timezone: Tz) -> Result<Vec<NaiveDateTime>, Error> {
        let end_date = self.end_date.unwrap_or(self.start_date);

        if end_date < self.start_date {
            return Err(validation("end date precedes start date"));
        }

        let opens_at = NaiveTime::from_hms_opt(self.start_hour, self.start_minute, 0)
            .ok_or_else(|| validation("start time is out of range"))?;

        let mut slots = Vec::new();
        let mut day = self.start_date;

        while day <= end_date {
            match self.end_hour {
                None => slots.push(to_utc(day.and_time(opens_at), timezone)?),
                Some(end_hour) => {
                    let closes_at = NaiveTime::from_hms_opt(end_hour, self.end_minute, 0)
                        .ok_or_else(|| validation("end time is out of range"))?;

                    if closes_at < opens_at {
                        return Err(validation("end time precedes start time"));
                    }

                    if self.interval_minutes == 0 {
                        return Err(validation("interval must be at least one minute"));
                    }

                    let mut time = opens_at;

                    loop {
                        slots.push(to_utc(day.and_time(time), timezone)?);

                        let (next, wrapped) =
                            time.overflowing_add_signed(Duration::minutes(i64::from(
                                self.interval_minutes,
                            )));

                        if wrapped != 0 || next > closes_at {
                            break;
                        }

                        time = next;
                    }
                }
            }

            day = day
                .succ_opt()
                .ok_or_else(|| validation("date is out of range"))?;
        }

        Ok(slots)
    }
}

/// Shorthand for a validation error
fn validation(reason: &str) -> Error {
    Error::Validation {
        reason: reason.to_string(),
    }
}

/// Interprets a local clinic time as a UTC instant
fn to_utc(local: NaiveDateTime, timezone: Tz) -> Result<NaiveDateTime, Error> {
    timezone
        .from_local_datetime(&local)
        .earliest()
        .map(|instant| instant.naive_utc())
        .ok_or_else(|| validation("time does not exist in the clinic timezone"))
}
