//! Provider for demand cell data

use super::model::{CellKey, CellSource, DemandCell, NewDemandCell};
use super::Error;
use crate::database::{schema::demand_cells, Database};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Providable interface for demand cell management.
///
/// Each write happens under one connection guard, which makes the
/// read-modify-write operations atomic per cell.
#[cfg_attr(test, automock)]
pub trait Providable: Send + Sync {
    /// Inserts a new cell
    ///
    /// # Errors
    ///
    /// When the insertion fails
    fn insert(&self, cell: NewDemandCell) -> Result<DemandCell, Error>;

    /// Retrieves the cell with the given identity
    ///
    /// # Errors
    ///
    /// When cell retrieval fails
    fn find(&self, key: &CellKey) -> Result<Option<DemandCell>, Error>;

    /// Increments a cell's learned total, creating the cell with an
    /// infinite threshold when it does not exist yet
    ///
    /// # Errors
    ///
    /// When the write fails
    fn increment(&self, key: &CellKey, at: NaiveDateTime) -> Result<DemandCell, Error>;

    /// Raises a cell's learned total to `total` when it is lower, creating
    /// the cell when it does not exist yet.
    ///
    /// Totals are monotonic within a month, so reconciliation never lowers
    /// them.
    ///
    /// # Errors
    ///
    /// When the write fails
    fn reconcile_total(
        &self,
        key: &CellKey,
        total: i32,
        at: NaiveDateTime,
    ) -> Result<DemandCell, Error>;

    /// Overwrites a cell's threshold
    ///
    /// # Errors
    ///
    /// When the write fails
    fn set_threshold(&self, uid: i32, threshold: f64, at: NaiveDateTime) -> Result<(), Error>;

    /// Overwrites the threshold of every listed cell
    ///
    /// # Errors
    ///
    /// When any write fails
    fn apply_threshold(
        &self,
        uids: &[i32],
        threshold: f64,
        at: NaiveDateTime,
    ) -> Result<(), Error>;

    /// Deletes the admin baseline rows for a doctor's month
    ///
    /// # Errors
    ///
    /// When the deletion fails
    fn delete_admin(&self, doctor_name: &str, year: i32, month: i32) -> Result<usize, Error>;

    /// Retrieves every cell for a doctor's month
    ///
    /// # Errors
    ///
    /// When cell retrieval fails
    fn list_month(&self, doctor_name: &str, year: i32, month: i32)
        -> Result<Vec<DemandCell>, Error>;

    /// Whether any cell exists for a doctor's month
    ///
    /// # Errors
    ///
    /// When the lookup fails
    fn month_exists(&self, doctor_name: &str, year: i32, month: i32) -> Result<bool, Error>;

    /// Retrieves every doctor with at least one cell
    ///
    /// # Errors
    ///
    /// When the lookup fails
    fn distinct_doctors(&self) -> Result<Vec<String>, Error>;
}

/// Provides access to demand cell data in persistent storage
pub struct Provider {
    database: Arc<dyn Database>,
}

impl Provider {
    /// Creates a new demand cell data provider
    #[must_use]
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }
}

impl Provider {
    /// Finds a cell by its composite identity on an already-held connection.
    ///
    /// The nullable day-of-week comparison happens in Rust so a baseline key
    /// and a weekday key never match each other.
    fn find_locked(
        connection: &SqliteConnection,
        key: &CellKey,
    ) -> Result<Option<DemandCell>, Error> {
        let mut cells: Vec<DemandCell> = demand_cells::table
            .filter(demand_cells::doctor_name.eq(&key.doctor_name))
            .filter(demand_cells::year.eq(key.year))
            .filter(demand_cells::month.eq(key.month))
            .filter(demand_cells::hour.eq(key.hour))
            .load(connection)?;

        cells.retain(|cell| cell.day_of_week == key.day_of_week);

        Ok(cells.pop())
    }
}

impl Providable for Provider {
    fn insert(&self, cell: NewDemandCell) -> Result<DemandCell, Error> {
        let connection = self.database.connection();

        diesel::insert_into(demand_cells::table)
            .values(cell)
            .execute(&*connection)?;

        Ok(demand_cells::table
            .order(demand_cells::uid.desc())
            .first(&*connection)?)
    }

    fn find(&self, key: &CellKey) -> Result<Option<DemandCell>, Error> {
        Self::find_locked(&self.database.connection(), key)
    }

    fn increment(&self, key: &CellKey, at: NaiveDateTime) -> Result<DemandCell, Error> {
        let connection = self.database.connection();

        if let Some(cell) = Self::find_locked(&connection, key)? {
            diesel::update(demand_cells::table.find(cell.uid))
                .set((
                    demand_cells::total_appointments.eq(cell.total_appointments + 1),
                    demand_cells::last_updated.eq(at),
                ))
                .execute(&*connection)?;

            Ok(demand_cells::table.find(cell.uid).first(&*connection)?)
        } else {
            diesel::insert_into(demand_cells::table)
                .values(NewDemandCell {
                    doctor_name: key.doctor_name.clone(),
                    year: key.year,
                    month: key.month,
                    day_of_week: key.day_of_week,
                    hour: key.hour,
                    total_appointments: 1,
                    high_demand_threshold: f64::INFINITY,
                    source: CellSource::Auto,
                    last_updated: at,
                })
                .execute(&*connection)?;

            Ok(demand_cells::table
                .order(demand_cells::uid.desc())
                .first(&*connection)?)
        }
    }

    fn reconcile_total(
        &self,
        key: &CellKey,
        total: i32,
        at: NaiveDateTime,
    ) -> Result<DemandCell, Error> {
        let connection = self.database.connection();

        if let Some(cell) = Self::find_locked(&connection, key)? {
            if cell.total_appointments < total {
                diesel::update(demand_cells::table.find(cell.uid))
                    .set((
                        demand_cells::total_appointments.eq(total),
                        demand_cells::last_updated.eq(at),
                    ))
                    .execute(&*connection)?;
            }

            Ok(demand_cells::table.find(cell.uid).first(&*connection)?)
        } else {
            diesel::insert_into(demand_cells::table)
                .values(NewDemandCell {
                    doctor_name: key.doctor_name.clone(),
                    year: key.year,
                    month: key.month,
                    day_of_week: key.day_of_week,
                    hour: key.hour,
                    total_appointments: total,
                    high_demand_threshold: f64::INFINITY,
                    source: CellSource::Auto,
                    last_updated: at,
                })
                .execute(&*connection)?;

            Ok(demand_cells::table
                .order(demand_cells::uid.desc())
                .first(&*connection)?)
        }
    }

    fn set_threshold(&self, uid: i32, threshold: f64, at: NaiveDateTime) -> Result<(), Error> {
        diesel::update(demand_cells::table.find(uid))
            .set((
                demand_cells::high_demand_threshold.eq(threshold),
                demand_cells::last_updated.eq(at),
            ))
            .execute(&*self.database.connection())?;

        Ok(())
    }

    fn apply_threshold(
        &self,
        uids: &[i32],
        threshold: f64,
        at: NaiveDateTime,
    ) -> Result<(), Error> {
        let connection = self.database.connection();

        for uid in uids {
            diesel::update(demand_cells::table.find(*uid))
                .set((
                    demand_cells::high_demand_threshold.eq(threshold),
                    demand_cells::last_updated.eq(at),
                ))
                .execute(&*connection)?;
        }

        Ok(())
    }

    fn delete_admin(&self, doctor_name: &str, year: i32, month: i32) -> Result<usize, Error> {
        Ok(diesel::delete(
            demand_cells::table
                .filter(demand_cells::doctor_name.eq(doctor_name))
                .filter(demand_cells::year.eq(year))
                .filter(demand_cells::month.eq(month))
                .filter(demand_cells::source.eq(CellSource::Admin)),
        )
        .execute(&*self.database.connection())?)
    }

    fn list_month(
        &self,
        doctor_name: &str,
        year: i32,
        month: i32,
    ) -> Result<Vec<DemandCell>, Error> {
        Ok(demand_cells::table
            .filter(demand_cells::doctor_name.eq(doctor_name))
            .filter(demand_cells::year.eq(year))
            .filter(demand_cells::month.eq(month))
            .order(demand_cells::hour.asc())
            .load(&*self.database.connection())?)
    }

    fn month_exists(&self, doctor_name: &str, year: i32, month: i32) -> Result<bool, Error> {
        use diesel::dsl::count_star;

        let cells: i64 = demand_cells::table
            .filter(demand_cells::doctor_name.eq(doctor_name))
            .filter(demand_cells::year.eq(year))
            .filter(demand_cells::month.eq(month))
            .select(count_star())
            .first(&*self.database.connection())?;

        Ok(cells > 0)
    }

    fn distinct_doctors(&self) -> Result<Vec<String>, Error> {
        Ok(demand_cells::table
            .select(demand_cells::doctor_name)
            .distinct()
            .load(&*self.database.connection())?)
    }
}
