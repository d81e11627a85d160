//! Diesel-generated schemas for database tables

table! {
    /// Records for registered patients
    users (uid) {
        /// Unique identifier for the user record
        uid -> Integer,
        /// Name the user registered with
        user_name -> Text,
        /// Lowercased form of the user name, for case-insensitive lookup
        normalized_name -> Text,
        /// Preferred display name, if any
        display_name -> Nullable<Text>,
        /// Contact phone number, if any
        phone -> Nullable<Text>,
        /// Opaque messenger channel id, if the account is linked
        notify_channel_id -> Nullable<Text>,
        /// Number of appointments the user attended
        attended_count -> Integer,
        /// Number of appointments the user missed
        missed_count -> Integer,
        /// Non-negative engagement score
        score -> Integer,
        /// Behavior class derived from attendance
        category -> Text,
    }
}

table! {
    /// Records for appointment slots
    appointments (uid) {
        /// Unique identifier for the appointment record
        uid -> Integer,
        /// Doctor the slot belongs to
        doctor_name -> Text,
        /// Start of the slot as a UTC instant
        scheduled_at -> Timestamp,
        /// Lifecycle status of the slot
        status -> Text,
        /// Booking user, present unless the slot is available
        user_name -> Nullable<Text>,
        /// JSON array of reminder entries owned by this appointment
        reminders -> Text,
    }
}

table! {
    /// Records for learned hourly demand
    demand_cells (uid) {
        /// Unique identifier for the cell record
        uid -> Integer,
        /// Doctor the cell belongs to
        doctor_name -> Text,
        /// Calendar year of the cell
        year -> Integer,
        /// Calendar month of the cell, 1 through 12
        month -> Integer,
        /// Day of week 0 (Sunday) through 6, or null for an admin baseline
        day_of_week -> Nullable<Integer>,
        /// Hour of day, 0 through 23
        hour -> Integer,
        /// Attended appointments learned for this cell within the month
        total_appointments -> Integer,
        /// High-demand threshold; +infinity means never high
        high_demand_threshold -> Double,
        /// Origin of the cell, admin or auto
        source -> Text,
        /// Instant the cell was last written
        last_updated -> Timestamp,
    }
}

table! {
    /// Records for the reminder message pool
    messages (uid) {
        /// Unique identifier for the message record
        uid -> Integer,
        /// Nudge category the text belongs to
        category -> Text,
        /// Template text; the literal token `name` is substituted on render
        text -> Text,
    }
}

table! {
    /// Records for durable one-shot scheduler jobs
    scheduler_jobs (uid) {
        /// Unique identifier for the job record
        uid -> Integer,
        /// Job kind discriminant
        kind -> Text,
        /// Identity key, unique together with the kind
        key -> Text,
        /// Wall-clock instant the job should fire, as UTC
        fire_at -> Timestamp,
        /// JSON payload for the job handler
        payload -> Text,
        /// Execution status of the job
        status -> Text,
        /// Number of execution attempts so far
        attempts -> Integer,
    }
}

allow_tables_to_appear_in_same_query!(users, appointments, demand_cells, messages, scheduler_jobs);
