//! Data models for learned hourly demand

use crate::database::schema::demand_cells;
use chrono::NaiveDateTime;
use diesel::backend::Backend;
use diesel::deserialize::{FromSql, Result as FromSqlResult};
use diesel::serialize::{Output, Result as ToSqlResult, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Origin of a demand cell
#[derive(
    AsExpression, Clone, Copy, Debug, Deserialize, Eq, FromSqlRow, PartialEq, Serialize,
)]
#[sql_type = "Text"]
#[serde(rename_all = "snake_case")]
pub enum CellSource {
    /// Inserted by an operator as a baseline; always high-demand
    Admin,
    /// Learned from attendance
    Auto,
}

impl CellSource {
    /// Returns the stored form of the source
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for CellSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl FromStr for CellSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "auto" => Ok(Self::Auto),
            _ => Err(format!("Unknown cell source {}", value)),
        }
    }
}

impl<TDatabase: Backend> ToSql<Text, TDatabase> for CellSource
where
    String: ToSql<Text, TDatabase>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, TDatabase>) -> ToSqlResult {
        self.as_str().to_string().to_sql(out)
    }
}

impl<TDatabase: Backend> FromSql<Text, TDatabase> for CellSource
where
    String: FromSql<Text, TDatabase>,
{
    fn from_sql(bytes: Option<&TDatabase::RawValue>) -> FromSqlResult<Self> {
        let stored = String::from_sql(bytes)?;

        stored.parse().map_err(Into::into)
    }
}

/// Composite identity of a demand cell.
///
/// A `day_of_week` of `None` marks an admin baseline row which applies to
/// every day of the month.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CellKey {
    /// Doctor the cell belongs to
    pub doctor_name: String,
    /// Calendar year of the cell
    pub year: i32,
    /// Calendar month of the cell, 1 through 12
    pub month: i32,
    /// Day of week 0 (Sunday) through 6, or `None` for a baseline
    pub day_of_week: Option<i32>,
    /// Hour of day, 0 through 23
    pub hour: i32,
}

/// Record for an individual demand cell
#[derive(Clone, Debug, PartialEq, Queryable, Serialize)]
pub struct DemandCell {
    /// Unique identifier for the cell record
    pub uid: i32,
    /// Doctor the cell belongs to
    pub doctor_name: String,
    /// Calendar year of the cell
    pub year: i32,
    /// Calendar month of the cell, 1 through 12
    pub month: i32,
    /// Day of week 0 (Sunday) through 6, or `None` for a baseline
    pub day_of_week: Option<i32>,
    /// Hour of day, 0 through 23
    pub hour: i32,
    /// Attended appointments learned for this cell within the month
    pub total_appointments: i32,
    /// High-demand threshold; +infinity means never high
    pub high_demand_threshold: f64,
    /// Origin of the cell
    pub source: CellSource,
    /// Instant the cell was last written
    pub last_updated: NaiveDateTime,
}

impl DemandCell {
    /// Whether the cell currently gates at-risk bookings.
    ///
    /// Admin baselines are high-demand by construction; learned cells are
    /// high-demand once their total reaches the threshold.
    #[must_use]
    pub fn is_high_demand(&self) -> bool {
        self.source == CellSource::Admin
            || f64::from(self.total_appointments) >= self.high_demand_threshold
    }

    /// Returns the composite identity of the cell
    #[must_use]
    pub fn key(&self) -> CellKey {
        CellKey {
            doctor_name: self.doctor_name.clone(),
            year: self.year,
            month: self.month,
            day_of_week: self.day_of_week,
            hour: self.hour,
        }
    }
}

/// Insertable demand cell for use with `diesel`
#[derive(Debug, Insertable)]
#[table_name = "demand_cells"]
pub struct NewDemandCell {
    /// Doctor the cell belongs to
    pub doctor_name: String,
    /// Calendar year of the cell
    pub year: i32,
    /// Calendar month of the cell, 1 through 12
    pub month: i32,
    /// Day of week 0 (Sunday) through 6, or `None` for a baseline
    pub day_of_week: Option<i32>,
    /// Hour of day, 0 through 23
    pub hour: i32,
    /// Initial learned total
    pub total_appointments: i32,
    /// High-demand threshold; +infinity means never high
    pub high_demand_threshold: f64,
    /// Origin of the cell
    pub source: CellSource,
    /// Instant the cell was written
    pub last_updated: NaiveDateTime,
}
