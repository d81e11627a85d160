//! CLI interface commands for high-demand management

use super::{Command, Context};
use structopt::StructOpt;

#[derive(StructOpt)]
/// Commands for high-demand management
pub enum Demand {
    /// Replaces a doctor's admin baseline with the listed hours
    Setup {
        /// Doctor the baseline belongs to
        doctor_name: String,
        /// Calendar year of the baseline
        year: i32,
        /// Calendar month of the baseline, 1 through 12
        month: i32,
        /// Hours of day to baseline, 0 through 23
        #[structopt(required = true)]
        hours: Vec<i32>,
        /// Threshold stored on the baseline rows
        #[structopt(long, default_value = "3")]
        threshold: f64,
    },
    /// Shows a doctor's cells and a high-demand summary for one month
    Show {
        /// Doctor to inspect
        doctor_name: String,
        /// Calendar year to inspect
        year: i32,
        /// Calendar month to inspect, 1 through 12
        month: i32,
    },
}

impl Command for Demand {
    fn execute(self, context: Context<'_>) -> Result<String, Box<dyn std::error::Error>> {
        match self {
            Self::Setup {
                doctor_name,
                year,
                month,
                hours,
                threshold,
            } => {
                if !(1..=12).contains(&month) {
                    return Err(format!("Invalid month {}", month).into());
                }

                if let Some(hour) = hours.iter().find(|hour| !(0..=23).contains(*hour)) {
                    return Err(format!("Invalid hour {}", hour).into());
                }

                let inserted =
                    context
                        .demand
                        .set_baseline(&doctor_name, year, month, &hours, threshold)?;

                Ok(serde_json::to_string_pretty(&inserted)?)
            }
            Self::Show {
                doctor_name,
                year,
                month,
            } => {
                let cells = context.demand.month(&doctor_name, year, month)?;

                let high_demand_hours: Vec<i32> = cells
                    .iter()
                    .filter(|cell| cell.is_high_demand())
                    .map(|cell| cell.hour)
                    .collect();

                let total_slots: i32 = cells.iter().map(|cell| cell.total_appointments).sum();

                let summary = serde_json::json!({
                    "cells": cells,
                    "summary": {
                        "totalSlots": total_slots,
                        "highDemandHours": high_demand_hours,
                    },
                });

                Ok(serde_json::to_string_pretty(&summary)?)
            }
        }
    }
}
