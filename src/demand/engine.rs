//! Demand learning and admission gating

use super::model::{CellKey, CellSource, DemandCell, NewDemandCell};
use super::{provider, Error};
use crate::appointment::model::Appointment;
use crate::clock::Clock;
use chrono::{Datelike, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

/// Fraction of a month's busiest cells kept as high-demand candidates
pub const DEFAULT_PEAK_FRACTION: f64 = 0.5;

/// Hours ahead within which available high-demand slots are released
const LATE_RELEASE_WINDOW_HOURS: i64 = 2;

/// Learns hourly demand per doctor and decides which slots gate
/// at-risk bookings
pub struct DemandEngine {
    cells: Arc<dyn provider::Providable>,
    appointments: Arc<dyn crate::appointment::provider::Providable>,
    clock: Arc<dyn Clock>,
}

impl DemandEngine {
    /// Creates a new demand engine over the cell store
    #[must_use]
    pub fn new(
        cells: Arc<dyn provider::Providable>,
        appointments: Arc<dyn crate::appointment::provider::Providable>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cells,
            appointments,
            clock,
        }
    }

    /// Splits a UTC instant into clinic-local cell coordinates
    fn cell_coordinates(&self, at: NaiveDateTime) -> (i32, i32, i32, i32) {
        let local = self.clock.timezone().from_utc_datetime(&at);

        (
            local.year(),
            i32::try_from(local.month()).unwrap_or(1),
            i32::try_from(local.weekday().num_days_from_sunday()).unwrap_or(0),
            i32::try_from(local.hour()).unwrap_or(0),
        )
    }

    /// Lazily initializes a doctor's month from the previous year.
    ///
    /// A month with any cell is left untouched; otherwise the previous
    /// year's same-month cells are copied with their totals reset and their
    /// source marked auto. Idempotent: storage is written at most once per
    /// month.
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn ensure_month(&self, doctor_name: &str, scheduled_at: NaiveDateTime) -> Result<(), Error> {
        let (year, month, _, _) = self.cell_coordinates(scheduled_at);

        if self.cells.month_exists(doctor_name, year, month)? {
            return Ok(());
        }

        let previous = self.cells.list_month(doctor_name, year - 1, month)?;
        let now = self.clock.now().naive_utc();

        for cell in previous {
            self.cells.insert(NewDemandCell {
                doctor_name: cell.doctor_name,
                year,
                month,
                day_of_week: cell.day_of_week,
                hour: cell.hour,
                total_appointments: 0,
                high_demand_threshold: cell.high_demand_threshold,
                source: CellSource::Auto,
                last_updated: now,
            })?;
        }

        Ok(())
    }

    /// Learns one attended appointment into its cell
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn record_attendance(&self, appointment: &Appointment) -> Result<DemandCell, Error> {
        let (year, month, day_of_week, hour) = self.cell_coordinates(appointment.scheduled_at);

        self.ensure_month(&appointment.doctor_name, appointment.scheduled_at)?;

        let key = CellKey {
            doctor_name: appointment.doctor_name.clone(),
            year,
            month,
            day_of_week: Some(day_of_week),
            hour,
        };

        self.cells.increment(&key, self.clock.now().naive_utc())
    }

    /// Finds the cell which governs a slot, in precedence order: the current
    /// year's weekday cell, the previous year's weekday cell, then the
    /// current and previous years' admin baselines.
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn effective(
        &self,
        doctor_name: &str,
        scheduled_at: NaiveDateTime,
    ) -> Result<Option<DemandCell>, Error> {
        let (year, month, day_of_week, hour) = self.cell_coordinates(scheduled_at);

        let candidates = [
            (year, Some(day_of_week)),
            (year - 1, Some(day_of_week)),
            (year, None),
            (year - 1, None),
        ];

        for (candidate_year, candidate_day) in candidates {
            let key = CellKey {
                doctor_name: doctor_name.to_string(),
                year: candidate_year,
                month,
                day_of_week: candidate_day,
                hour,
            };

            if let Some(cell) = self.cells.find(&key)? {
                return Ok(Some(cell));
            }
        }

        Ok(None)
    }

    /// Whether a slot currently gates at-risk bookings
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn is_high_demand(
        &self,
        doctor_name: &str,
        scheduled_at: NaiveDateTime,
    ) -> Result<bool, Error> {
        Ok(self
            .effective(doctor_name, scheduled_at)?
            .map_or(false, |cell| cell.is_high_demand()))
    }

    /// Recalculates the adaptive threshold for a doctor's month.
    ///
    /// Learned cells only; admin baselines are high-demand by source and
    /// keep their operator-set threshold.
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn recalc(&self, doctor_name: &str, year: i32, month: i32) -> Result<(), Error> {
        let cells: Vec<DemandCell> = self
            .cells
            .list_month(doctor_name, year, month)?
            .into_iter()
            .filter(|cell| cell.source == CellSource::Auto)
            .collect();

        let totals: Vec<i32> = cells.iter().map(|cell| cell.total_appointments).collect();

        let Some(threshold) = adaptive_threshold(&totals) else {
            return Ok(());
        };

        let uids: Vec<i32> = cells.iter().map(|cell| cell.uid).collect();

        self.cells
            .apply_threshold(&uids, threshold, self.clock.now().naive_utc())?;

        debug!(
            "Recalculated demand threshold for {} {}-{}: {:.2} across {} cells",
            doctor_name,
            year,
            month,
            threshold,
            uids.len()
        );

        Ok(())
    }

    /// Caps the month's high-demand candidates to its busiest cells.
    ///
    /// Cells outside the top `max_fraction` share get an infinite threshold
    /// and can only regain high demand through a later recalculation.
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn cap_peaks(
        &self,
        doctor_name: &str,
        year: i32,
        month: i32,
        max_fraction: f64,
    ) -> Result<(), Error> {
        let mut cells: Vec<DemandCell> = self
            .cells
            .list_month(doctor_name, year, month)?
            .into_iter()
            .filter(|cell| cell.source == CellSource::Auto)
            .collect();

        cells.sort_by(|a, b| b.total_appointments.cmp(&a.total_appointments));

        let keep = peak_candidates(cells.len(), max_fraction);
        let capped: Vec<i32> = cells.iter().skip(keep).map(|cell| cell.uid).collect();

        if capped.is_empty() {
            return Ok(());
        }

        self.cells
            .apply_threshold(&capped, f64::INFINITY, self.clock.now().naive_utc())
    }

    /// Lifts the high-demand gate on slots starting within the release
    /// window which are still available, returning how many cells were
    /// released
    ///
    /// # Errors
    ///
    /// When a store read or write fails
    pub fn late_release(&self) -> Result<usize, Error> {
        let now = self.clock.now().naive_utc();
        let horizon = now + chrono::Duration::hours(LATE_RELEASE_WINDOW_HOURS);
        let upcoming = self.appointments.available_between(now, horizon)?;

        let mut released = 0;

        for appointment in upcoming {
            let cell = self.effective(&appointment.doctor_name, appointment.scheduled_at)?;

            if let Some(cell) = cell.filter(DemandCell::is_high_demand) {
                self.cells.set_threshold(cell.uid, f64::INFINITY, now)?;
                released += 1;

                info!(
                    "Late-released {} hour {} for {}",
                    cell.doctor_name, cell.hour, appointment.scheduled_at
                );
            }
        }

        Ok(released)
    }

    /// Replaces a doctor's admin baseline with one row per listed hour
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn set_baseline(
        &self,
        doctor_name: &str,
        year: i32,
        month: i32,
        hours: &[i32],
        threshold: f64,
    ) -> Result<Vec<DemandCell>, Error> {
        self.cells.delete_admin(doctor_name, year, month)?;

        let now = self.clock.now().naive_utc();
        let mut inserted = Vec::with_capacity(hours.len());

        for hour in hours {
            inserted.push(self.cells.insert(NewDemandCell {
                doctor_name: doctor_name.to_string(),
                year,
                month,
                day_of_week: None,
                hour: *hour,
                total_appointments: 0,
                high_demand_threshold: threshold,
                source: CellSource::Admin,
                last_updated: now,
            })?);
        }

        Ok(inserted)
    }

    /// Reconciles a month's cell totals from its attended appointments.
    ///
    /// Runs near month end, possibly several times; totals only ever rise,
    /// so replays and already-learned attendance are no-ops.
    ///
    /// # Errors
    ///
    /// When a store read or write fails
    pub fn month_end_learn(&self, year: i32, month: i32) -> Result<(), Error> {
        let (start, end) = month_bounds(self.clock.timezone(), year, month)
            .ok_or(Error::InvalidMonth { year, month })?;

        let attended = self.appointments.attended_between(start, end)?;
        let mut totals: HashMap<CellKey, i32> = HashMap::new();

        for appointment in &attended {
            let (_, _, day_of_week, hour) = self.cell_coordinates(appointment.scheduled_at);

            let key = CellKey {
                doctor_name: appointment.doctor_name.clone(),
                year,
                month,
                day_of_week: Some(day_of_week),
                hour,
            };

            *totals.entry(key).or_insert(0) += 1;
        }

        let now = self.clock.now().naive_utc();

        for (key, total) in totals {
            self.cells.reconcile_total(&key, total, now)?;
        }

        Ok(())
    }

    /// Retrieves every doctor with learned or baselined demand
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn doctors(&self) -> Result<Vec<String>, Error> {
        self.cells.distinct_doctors()
    }

    /// Retrieves every cell for a doctor's month
    ///
    /// # Errors
    ///
    /// When the cell store fails
    pub fn month(&self, doctor_name: &str, year: i32, month: i32) -> Result<Vec<DemandCell>, Error> {
        self.cells.list_month(doctor_name, year, month)
    }
}

/// Computes the adaptive threshold for a month's learned totals.
///
/// Below three cells the month is in light mode and thresholds sit just
/// above the average; with three or more the threshold is the larger of
/// 1.2x the average and the total at the top-quartile boundary.
#[must_use]
pub fn adaptive_threshold(totals: &[i32]) -> Option<f64> {
    if totals.is_empty() {
        return None;
    }

    let count = f64::from(u32::try_from(totals.len()).unwrap_or(u32::MAX));
    let average = f64::from(totals.iter().sum::<i32>()) / count;

    if totals.len() < 3 {
        return Some(average * 1.1);
    }

    let mut descending = totals.to_vec();
    descending.sort_unstable_by(|a, b| b.cmp(a));

    let boundary = f64::from(descending[totals.len() / 4]);

    Some((average * 1.2).max(boundary))
}

/// Number of cells kept as high-demand candidates by the peak cap
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn peak_candidates(count: usize, max_fraction: f64) -> usize {
    ((count as f64) * max_fraction).floor() as usize
}

/// UTC bounds of a clinic-local calendar month
fn month_bounds(timezone: Tz, year: i32, month: i32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let month = u32::try_from(month).ok()?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let start = timezone
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()?;
    let end = timezone
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()?;

    Some((start.naive_utc(), end.naive_utc()))
}
