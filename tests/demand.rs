//! Integration tests for demand learning and admission gating

mod common;
mod common_database;

use appointed::appointment::model::NewAppointment;
use appointed::appointment::provider::Providable as AppointmentProvidable;
use appointed::clock::{Clock, SystemClock};
use appointed::demand::model::{CellKey, CellSource, NewDemandCell};
use appointed::demand::provider::Providable;
use appointed::demand::{engine, DemandEngine, Provider};
use appointed::database::Database;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Asia::Riyadh;
use common::Result;
use std::sync::Arc;

/// A Tuesday in October 2025, 09:00 Riyadh time, as a UTC instant
fn tuesday_nine() -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2025, 10, 7)
        .and_then(|date| date.and_hms_opt(6, 0, 0))
        .ok_or_else(|| "invalid test instant".into())
}

fn cell(
    doctor_name: &str,
    year: i32,
    day_of_week: Option<i32>,
    hour: i32,
    total: i32,
    threshold: f64,
    source: CellSource,
) -> NewDemandCell {
    NewDemandCell {
        doctor_name: doctor_name.to_string(),
        year,
        month: 10,
        day_of_week,
        hour,
        total_appointments: total,
        high_demand_threshold: threshold,
        source,
        last_updated: Utc::now().naive_utc(),
    }
}

fn engine_over(database: Arc<dyn Database>) -> (DemandEngine, Provider) {
    let inspector = Provider::new(Arc::clone(&database));

    let engine = DemandEngine::new(
        Arc::new(Provider::new(Arc::clone(&database))),
        Arc::new(appointed::appointment::Provider::new(database)),
        Arc::new(SystemClock::new(Riyadh)),
    );

    (engine, inspector)
}

#[test]
fn it_increments_cells_lazily_with_an_infinite_threshold() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let key = CellKey {
        doctor_name: String::from("Dr. Sara"),
        year: 2025,
        month: 10,
        day_of_week: Some(2),
        hour: 9,
    };

    let created = provider.increment(&key, Utc::now().naive_utc())?;

    assert_eq!(1, created.total_appointments);
    assert!(created.high_demand_threshold.is_infinite());
    assert_eq!(CellSource::Auto, created.source);
    assert!(!created.is_high_demand());

    let incremented = provider.increment(&key, Utc::now().naive_utc())?;

    assert_eq!(2, incremented.total_appointments);
    assert_eq!(created.uid, incremented.uid);

    Ok(())
}

#[test]
fn it_separates_baseline_keys_from_weekday_keys() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    provider.insert(cell("Dr. Sara", 2025, None, 9, 0, 3.0, CellSource::Admin))?;

    let weekday_key = CellKey {
        doctor_name: String::from("Dr. Sara"),
        year: 2025,
        month: 10,
        day_of_week: Some(2),
        hour: 9,
    };

    assert!(provider.find(&weekday_key)?.is_none());

    let baseline_key = CellKey {
        day_of_week: None,
        ..weekday_key
    };

    assert!(provider.find(&baseline_key)?.is_some());

    Ok(())
}

#[test]
fn it_copies_the_previous_year_on_month_initialization() -> Result<()> {
    let database = common_database::new()?;
    let (engine, inspector) = engine_over(database);

    inspector.insert(cell("Dr. K", 2024, Some(2), 9, 7, 5.0, CellSource::Auto))?;
    inspector.insert(cell("Dr. K", 2024, Some(3), 10, 2, 5.0, CellSource::Auto))?;

    engine.ensure_month("Dr. K", tuesday_nine()?)?;

    let copied = inspector.list_month("Dr. K", 2025, 10)?;

    assert_eq!(2, copied.len());
    assert!(copied.iter().all(|cell| cell.total_appointments == 0));
    assert!(copied
        .iter()
        .all(|cell| (cell.high_demand_threshold - 5.0).abs() < 1e-9));
    assert!(copied.iter().all(|cell| cell.source == CellSource::Auto));

    // Idempotent: a second call copies nothing further
    engine.ensure_month("Dr. K", tuesday_nine()?)?;
    assert_eq!(2, inspector.list_month("Dr. K", 2025, 10)?.len());

    Ok(())
}

#[test]
fn it_looks_up_effective_cells_in_precedence_order() -> Result<()> {
    let database = common_database::new()?;
    let (engine, inspector) = engine_over(database);

    // Previous year weekday cell and current year baseline both exist
    inspector.insert(cell("Dr. Sara", 2024, Some(2), 9, 6, 3.0, CellSource::Auto))?;
    inspector.insert(cell("Dr. Sara", 2025, None, 9, 0, 3.0, CellSource::Admin))?;

    let effective = engine
        .effective("Dr. Sara", tuesday_nine()?)?
        .ok_or("expected an effective cell")?;

    // The previous year's weekday cell wins over the baseline
    assert_eq!(2024, effective.year);
    assert_eq!(Some(2), effective.day_of_week);

    // A current year weekday cell takes over once it exists
    inspector.insert(cell("Dr. Sara", 2025, Some(2), 9, 1, 3.0, CellSource::Auto))?;

    let effective = engine
        .effective("Dr. Sara", tuesday_nine()?)?
        .ok_or("expected an effective cell")?;

    assert_eq!(2025, effective.year);

    Ok(())
}

#[test]
fn it_gates_on_baselines_only_for_their_listed_hours() -> Result<()> {
    let database = common_database::new()?;
    let (engine, _inspector) = engine_over(database);

    engine.set_baseline("Dr. Sara", 2025, 10, &[9], 3.0)?;

    let nine = tuesday_nine()?;
    let ten = nine + Duration::hours(1);

    assert!(engine.is_high_demand("Dr. Sara", nine)?);
    assert!(!engine.is_high_demand("Dr. Sara", ten)?);

    Ok(())
}

#[test]
fn it_replaces_the_admin_baseline_on_setup() -> Result<()> {
    let database = common_database::new()?;
    let (engine, inspector) = engine_over(database);

    engine.set_baseline("Dr. Sara", 2025, 10, &[9, 10], 3.0)?;
    engine.set_baseline("Dr. Sara", 2025, 10, &[14], 5.0)?;

    let cells = inspector.list_month("Dr. Sara", 2025, 10)?;

    assert_eq!(1, cells.len());
    assert_eq!(14, cells[0].hour);
    assert_eq!(CellSource::Admin, cells[0].source);
    assert!(cells[0].is_high_demand());

    Ok(())
}

#[test]
fn it_recalculates_thresholds_from_the_month_distribution() -> Result<()> {
    let database = common_database::new()?;
    let (engine, inspector) = engine_over(database);

    for (hour, total) in [(9, 1), (10, 2), (11, 3), (12, 4), (13, 8)] {
        inspector.insert(cell("Dr. K", 2025, Some(2), hour, total, 0.0, CellSource::Auto))?;
    }

    engine.recalc("Dr. K", 2025, 10)?;

    let cells = inspector.list_month("Dr. K", 2025, 10)?;

    // avg = 3.6, so max(4.32, boundary 4) = 4.32 everywhere
    assert!(cells
        .iter()
        .all(|cell| (cell.high_demand_threshold - 4.32).abs() < 1e-9));

    Ok(())
}

#[test]
fn it_uses_the_light_threshold_mode_below_three_cells() -> Result<()> {
    let database = common_database::new()?;
    let (engine, inspector) = engine_over(database);

    inspector.insert(cell("Dr. K", 2025, Some(2), 9, 2, 0.0, CellSource::Auto))?;
    inspector.insert(cell("Dr. K", 2025, Some(2), 10, 4, 0.0, CellSource::Auto))?;

    engine.recalc("Dr. K", 2025, 10)?;

    let cells = inspector.list_month("Dr. K", 2025, 10)?;

    assert!(cells
        .iter()
        .all(|cell| (cell.high_demand_threshold - 3.3).abs() < 1e-9));

    Ok(())
}

#[test]
fn it_leaves_admin_baselines_out_of_recalculation() -> Result<()> {
    let database = common_database::new()?;
    let (engine, inspector) = engine_over(database);

    inspector.insert(cell("Dr. K", 2025, None, 9, 0, 3.0, CellSource::Admin))?;
    inspector.insert(cell("Dr. K", 2025, Some(2), 10, 2, 0.0, CellSource::Auto))?;

    engine.recalc("Dr. K", 2025, 10)?;

    let cells = inspector.list_month("Dr. K", 2025, 10)?;
    let baseline = cells
        .iter()
        .find(|cell| cell.source == CellSource::Admin)
        .ok_or("baseline vanished")?;

    assert!((baseline.high_demand_threshold - 3.0).abs() < 1e-9);

    Ok(())
}

#[test]
fn it_caps_all_but_the_busiest_cells() -> Result<()> {
    let database = common_database::new()?;
    let (engine, inspector) = engine_over(database);

    for (hour, total) in [(9, 1), (10, 2), (11, 3), (12, 4), (13, 8)] {
        inspector.insert(cell("Dr. K", 2025, Some(2), hour, total, 2.0, CellSource::Auto))?;
    }

    engine.cap_peaks("Dr. K", 2025, 10, engine::DEFAULT_PEAK_FRACTION)?;

    let cells = inspector.list_month("Dr. K", 2025, 10)?;
    let capped: Vec<i32> = cells
        .iter()
        .filter(|cell| cell.high_demand_threshold.is_infinite())
        .map(|cell| cell.total_appointments)
        .collect();

    // floor(5 * 0.5) = 2 candidates stay; totals 1, 2, and 3 are capped
    assert_eq!(3, capped.len());
    assert!(capped.iter().all(|total| *total <= 3));

    Ok(())
}

#[test]
fn it_late_releases_imminent_high_demand_slots() -> Result<()> {
    let database = common_database::new()?;
    let appointments = appointed::appointment::Provider::new(Arc::clone(&database));
    let (engine, inspector) = engine_over(database);

    let clock = SystemClock::new(Riyadh);
    let soon = clock.now().naive_utc() + Duration::minutes(90);
    let local = Riyadh.from_utc_datetime(&soon);

    inspector.insert(NewDemandCell {
        doctor_name: String::from("Dr. K"),
        year: local.year(),
        month: i32::try_from(local.month())?,
        day_of_week: Some(i32::try_from(local.weekday().num_days_from_sunday())?),
        hour: i32::try_from(local.hour())?,
        total_appointments: 5,
        high_demand_threshold: 3.0,
        source: CellSource::Auto,
        last_updated: clock.now().naive_utc(),
    })?;

    appointments.add(NewAppointment {
        doctor_name: String::from("Dr. K"),
        scheduled_at: soon,
    })?;

    assert!(engine.is_high_demand("Dr. K", soon)?);
    assert_eq!(1, engine.late_release()?);
    assert!(!engine.is_high_demand("Dr. K", soon)?);

    Ok(())
}

#[test]
fn it_reconciles_month_totals_idempotently() -> Result<()> {
    let database = common_database::new()?;
    let appointments = appointed::appointment::Provider::new(Arc::clone(&database));
    let (engine, inspector) = engine_over(database);

    let slot = tuesday_nine()?;

    for _ in 0..2 {
        let appointment = appointments.add(NewAppointment {
            doctor_name: String::from("Dr. Sara"),
            scheduled_at: slot,
        })?;
        appointments.claim(appointment.uid, "Laura")?;
        appointments.resolve(appointment.uid, appointed::appointment::model::Status::Attended)?;
    }

    engine.month_end_learn(2025, 10)?;
    engine.month_end_learn(2025, 10)?;

    let cells = inspector.list_month("Dr. Sara", 2025, 10)?;

    assert_eq!(1, cells.len());
    assert_eq!(2, cells[0].total_appointments);

    Ok(())
}
