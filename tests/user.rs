//! Integration tests for patient data management

mod common;
mod common_database;

use appointed::user::model::{Category, NewUser};
use appointed::user::{provider::Providable, Provider};
use common::Result;

fn laura() -> NewUser {
    NewUser {
        user_name: String::from("Laura"),
        display_name: None,
        phone: None,
    }
}

#[test]
fn it_gets_nothing_without_users() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    assert!(provider.get_all()?.is_empty());

    Ok(())
}

#[test]
fn it_registers_users_with_default_standing() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let user = provider.register(laura())?;

    assert_eq!("Laura", user.user_name);
    assert_eq!("laura", user.normalized_name);
    assert_eq!(0, user.attended_count);
    assert_eq!(0, user.missed_count);
    assert_eq!(0, user.score);
    assert_eq!(Category::Good, user.category);

    Ok(())
}

#[test]
fn it_registers_idempotently_regardless_of_letter_case() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let first = provider.register(laura())?;
    let second = provider.register(NewUser {
        user_name: String::from("LAURA"),
        display_name: Some(String::from("Laura Palmer")),
        phone: Some(String::from("555-0100")),
    })?;

    assert_eq!(first.uid, second.uid);
    assert_eq!(Some("Laura Palmer"), second.display_name.as_deref());
    assert_eq!(Some("555-0100"), second.phone.as_deref());
    assert_eq!(1, provider.get_all()?.len());

    Ok(())
}

#[test]
fn it_keeps_existing_details_when_registering_without_them() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    provider.register(NewUser {
        user_name: String::from("Laura"),
        display_name: None,
        phone: Some(String::from("555-0100")),
    })?;

    let refreshed = provider.register(laura())?;

    assert_eq!(Some("555-0100"), refreshed.phone.as_deref());

    Ok(())
}

#[test]
fn it_looks_users_up_case_insensitively() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    provider.register(laura())?;

    assert!(provider.get_by_name("lAuRa")?.is_some());
    assert!(provider.get_by_name("Donna")?.is_none());

    Ok(())
}

#[test]
fn it_round_trips_counters_and_category_through_updates() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let mut user = provider.register(laura())?;

    user.attended_count = 4;
    user.missed_count = 1;
    user.score = 40;
    user.category = Category::VeryGood;
    user.notify_channel_id = Some(String::from("42"));

    provider.update(&user)?;

    let reloaded = provider
        .get_by_name("laura")?
        .ok_or("registered user vanished")?;

    assert_eq!(4, reloaded.attended_count);
    assert_eq!(1, reloaded.missed_count);
    assert_eq!(40, reloaded.score);
    assert_eq!(Category::VeryGood, reloaded.category);
    assert_eq!(Some("42"), reloaded.notify_channel_id.as_deref());
    assert!((reloaded.attendance_rate() - 80.0).abs() < f64::EPSILON);

    Ok(())
}
