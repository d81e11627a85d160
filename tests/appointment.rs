//! Integration tests for appointment data management

mod common;
mod common_database;

use appointed::appointment::model::{
    NewAppointment, Reminder, ReminderStatus, Status,
};
use appointed::appointment::{provider::Providable, Provider};
use appointed::message::model::MessageCategory;
use chrono::{NaiveDate, NaiveDateTime};
use common::Result;

fn slot(day: u32, hour: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2025, 10, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| "invalid test instant".into())
}

fn new_slot(day: u32, hour: u32) -> Result<NewAppointment> {
    Ok(NewAppointment {
        doctor_name: String::from("Dr. Sara"),
        scheduled_at: slot(day, hour)?,
    })
}

#[test]
fn it_creates_available_slots() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let appointment = provider.add(new_slot(7, 6)?)?;

    assert_eq!(Status::Available, appointment.status);
    assert_eq!(None, appointment.user_name);
    assert!(appointment.reminders.is_empty());

    Ok(())
}

#[test]
fn it_creates_slot_batches_in_order() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let created = provider.add_all(vec![new_slot(7, 6)?, new_slot(7, 7)?, new_slot(7, 8)?])?;

    assert_eq!(3, created.len());
    assert_eq!(slot(7, 6)?, created[0].scheduled_at);
    assert_eq!(slot(7, 8)?, created[2].scheduled_at);

    Ok(())
}

#[test]
fn it_filters_appointments_by_status() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let first = provider.add(new_slot(7, 6)?)?;
    provider.add(new_slot(7, 7)?)?;

    provider.claim(first.uid, "Laura")?;

    assert_eq!(1, provider.get_by_status(Status::Available)?.len());
    assert_eq!(1, provider.get_by_status(Status::Booked)?.len());
    assert_eq!(2, provider.get_all()?.len());

    Ok(())
}

#[test]
fn it_claims_available_slots_exactly_once() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let appointment = provider.add(new_slot(7, 6)?)?;

    assert!(provider.claim(appointment.uid, "Laura")?);
    assert!(!provider.claim(appointment.uid, "Donna")?);

    let reloaded = provider
        .get_by_uid(appointment.uid)?
        .ok_or("created appointment vanished")?;

    assert_eq!(Status::Booked, reloaded.status);
    assert_eq!(Some("Laura"), reloaded.user_name.as_deref());

    Ok(())
}

#[test]
fn it_resolves_only_booked_appointments() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let appointment = provider.add(new_slot(7, 6)?)?;

    // Not booked yet
    assert!(!provider.resolve(appointment.uid, Status::Attended)?);

    provider.claim(appointment.uid, "Laura")?;

    assert!(provider.resolve(appointment.uid, Status::Attended)?);

    // Terminal states never revert
    assert!(!provider.resolve(appointment.uid, Status::Missed)?);

    Ok(())
}

#[test]
fn it_round_trips_reminder_lists() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let appointment = provider.add(new_slot(7, 6)?)?;

    let reminders = vec![
        Reminder {
            category: MessageCategory::DefaultNudge,
            send_at: slot(6, 6)?,
            status: ReminderStatus::Sent,
            text: Some(String::from("See you soon, Laura")),
        },
        Reminder {
            category: MessageCategory::DefaultNudge,
            send_at: slot(7, 4)?,
            status: ReminderStatus::Scheduled,
            text: None,
        },
    ];

    provider.set_reminders(appointment.uid, reminders.clone())?;

    let reloaded = provider
        .get_by_uid(appointment.uid)?
        .ok_or("created appointment vanished")?;

    assert_eq!(reminders, reloaded.reminders);
    assert_eq!(
        vec![String::from("See you soon, Laura")],
        reloaded.used_texts().into_iter().collect::<Vec<_>>()
    );

    Ok(())
}

#[test]
fn it_marks_scheduled_reminders_sent_exactly_once() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let appointment = provider.add(new_slot(7, 6)?)?;

    provider.set_reminders(
        appointment.uid,
        vec![Reminder {
            category: MessageCategory::DefaultNudge,
            send_at: slot(7, 4)?,
            status: ReminderStatus::Scheduled,
            text: None,
        }],
    )?;

    assert!(provider.mark_reminder_sent(
        appointment.uid,
        slot(7, 4)?,
        Some(String::from("Rendered"))
    )?);

    // Replays are no-ops once the row is sent
    assert!(!provider.mark_reminder_sent(appointment.uid, slot(7, 4)?, None)?);

    let reloaded = provider
        .get_by_uid(appointment.uid)?
        .ok_or("created appointment vanished")?;

    assert_eq!(ReminderStatus::Sent, reloaded.reminders[0].status);
    assert_eq!(Some("Rendered"), reloaded.reminders[0].text.as_deref());

    Ok(())
}

#[test]
fn it_deletes_only_expired_available_slots() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let expired = provider.add(new_slot(7, 6)?)?;
    let expired_but_booked = provider.add(new_slot(7, 7)?)?;
    provider.add(new_slot(9, 6)?)?;

    provider.claim(expired_but_booked.uid, "Laura")?;

    assert_eq!(1, provider.delete_expired_available(slot(8, 0)?)?);
    assert!(provider.get_by_uid(expired.uid)?.is_none());
    assert_eq!(2, provider.get_all()?.len());

    Ok(())
}

#[test]
fn it_ranges_appointments_by_status_and_window() -> Result<()> {
    let database = common_database::new()?;
    let provider = Provider::new(database);

    let inside = provider.add(new_slot(7, 6)?)?;
    let outside = provider.add(new_slot(20, 6)?)?;

    provider.claim(inside.uid, "Laura")?;
    provider.resolve(inside.uid, Status::Attended)?;
    provider.claim(outside.uid, "Laura")?;
    provider.resolve(outside.uid, Status::Attended)?;

    let attended = provider.attended_between(slot(1, 0)?, slot(15, 0)?)?;

    assert_eq!(1, attended.len());
    assert_eq!(inside.uid, attended[0].uid);

    provider.add(new_slot(8, 6)?)?;

    assert_eq!(1, provider.available_between(slot(8, 0)?, slot(9, 0)?)?.len());
    assert!(provider.available_between(slot(10, 0)?, slot(11, 0)?)?.is_empty());

    Ok(())
}
