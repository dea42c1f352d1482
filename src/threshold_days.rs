use std::fmt;
use std::path::Path;

use log::{debug, info};

use crate::calendar::{month_day, sort_chronologically};
use crate::charts;
use crate::config::ensure_output_dir;
use crate::error::{AnalysisError, Result};
use crate::read_csv::{load_dataset, Column, Dataset, DAY, MONTH};
use crate::stats::percentile;

pub const HIGH_GRID_FILE: &str = "high_grid_use_days.png";
pub const RENEWABLE_FILE: &str = "100pct_renewable_days.png";
pub const PUE_SPIKE_FILE: &str = "pue_spike_days.png";

/// Days above this percentile of grid use or PUE are flagged
pub const SPIKE_PERCENTILE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedDay {
    pub month: String,
    pub day: u32,
    /// 1-based position in calendar order
    pub day_of_year: usize,
    pub percent_renewable: f64,
    pub grid_energy_use_kwh: f64,
    pub pue: f64,
    pub is_100pct_renewable: bool,
    pub is_high_grid: bool,
    pub is_pue_spike: bool,
}

impl FlaggedDay {
    pub fn is_flagged(&self) -> bool {
        self.is_100pct_renewable || self.is_high_grid || self.is_pue_spike
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdReport {
    pub grid_threshold: f64,
    pub pue_threshold: f64,
    pub days: Vec<FlaggedDay>,
}

impl ThresholdReport {
    /// Drops the days that match none of the flags
    pub fn into_flagged(self) -> ThresholdReport {
        ThresholdReport {
            days: self.days.into_iter().filter(FlaggedDay::is_flagged).collect(),
            ..self
        }
    }

    pub fn head(&self, n: usize) -> &[FlaggedDay] {
        &self.days[..n.min(self.days.len())]
    }

    fn points(&self, value: impl Fn(&FlaggedDay) -> f64) -> Vec<(f64, f64)> {
        self.days.iter().map(|d| (d.day_of_year as f64, value(d))).collect()
    }

    fn mask(&self, flag: impl Fn(&FlaggedDay) -> bool) -> Vec<bool> {
        self.days.iter().map(flag).collect()
    }
}

impl fmt::Display for ThresholdReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid threshold (p95): {:.4} | PUE threshold (p95): {:.4}", self.grid_threshold, self.pue_threshold)?;
        writeln!(
            f,
            "{:<10} {:>4} {:>11} {:>17} {:>19} {:>8} {:>19} {:>12} {:>12}",
            "Month",
            "Day",
            "Day_of_Year",
            "Percent_Renewable",
            "Grid_Energy_Use_kWh",
            "PUE",
            "Is_100pct_Renewable",
            "Is_High_Grid",
            "Is_PUE_Spike"
        )?;
        for d in &self.days {
            writeln!(
                f,
                "{:<10} {:>4} {:>11} {:>17.4} {:>19.4} {:>8.4} {:>19} {:>12} {:>12}",
                d.month,
                d.day,
                d.day_of_year,
                d.percent_renewable,
                d.grid_energy_use_kwh,
                d.pue,
                d.is_100pct_renewable,
                d.is_high_grid,
                d.is_pue_spike
            )?;
        }
        Ok(())
    }
}

/// Flags every row in calendar order against the 95th percentile thresholds
pub fn flag_threshold_days(data: &Dataset) -> Result<ThresholdReport> {
    let sorted = sort_chronologically(&data.records)?;
    let mut days = Vec::with_capacity(sorted.len());
    for (i, (row, record)) in sorted.iter().enumerate() {
        let (_, day) = month_day(record, *row)?;
        days.push(FlaggedDay {
            month: record.month.clone().unwrap_or_default(),
            day,
            day_of_year: i + 1,
            percent_renewable: record.require(Column::PercentRenewable, *row)?,
            grid_energy_use_kwh: record.require(Column::GridEnergyUse, *row)?,
            pue: record.require(Column::Pue, *row)?,
            is_100pct_renewable: false,
            is_high_grid: false,
            is_pue_spike: false,
        });
    }

    let grid: Vec<f64> = days.iter().map(|d| d.grid_energy_use_kwh).collect();
    let pue: Vec<f64> = days.iter().map(|d| d.pue).collect();
    let (Some(grid_threshold), Some(pue_threshold)) =
        (percentile(&grid, SPIKE_PERCENTILE), percentile(&pue, SPIKE_PERCENTILE))
    else {
        return Err(AnalysisError::EmptyDataset(data.source.clone()));
    };
    debug!("grid threshold {:.4}, PUE threshold {:.4}", grid_threshold, pue_threshold);

    for d in days.iter_mut() {
        d.is_100pct_renewable = d.percent_renewable == 1.0;
        d.is_high_grid = d.grid_energy_use_kwh > grid_threshold;
        d.is_pue_spike = d.pue > pue_threshold;
    }

    Ok(ThresholdReport { grid_threshold, pue_threshold, days })
}

/// Highlights high grid use, fully renewable and PUE spike days on three scatter charts
///
/// Returns the thresholds and the days matching at least one flag.
pub fn highlight_threshold_days(path: &Path, output_dir: &Path) -> Result<ThresholdReport> {
    let required = [
        MONTH,
        DAY,
        Column::PercentRenewable.header(),
        Column::GridEnergyUse.header(),
        Column::Pue.header(),
    ];
    let data = load_dataset(path, &required)?;
    let report = flag_threshold_days(&data)?;

    ensure_output_dir(output_dir)?;
    charts::highlighted_scatter(
        &output_dir.join(HIGH_GRID_FILE),
        "Grid Energy Use with High-Use Days Highlighted",
        "Day of Year",
        "Grid Energy Use (kWh)",
        &report.points(|d| d.grid_energy_use_kwh),
        &report.mask(|d| d.is_high_grid),
        ("High Grid Use", charts::RED),
    )?;
    charts::highlighted_scatter(
        &output_dir.join(RENEWABLE_FILE),
        "Days with 100% Renewable Energy Use",
        "Day of Year",
        "Percent Renewable",
        &report.points(|d| d.percent_renewable),
        &report.mask(|d| d.is_100pct_renewable),
        ("100% Renewable", charts::DARK_GREEN),
    )?;
    charts::highlighted_scatter(
        &output_dir.join(PUE_SPIKE_FILE),
        "PUE Over Time with Spike Days Highlighted",
        "Day of Year",
        "Power Usage Effectiveness (PUE)",
        &report.points(|d| d.pue),
        &report.mask(|d| d.is_pue_spike),
        ("PUE Spike", charts::PURPLE),
    )?;

    info!("Threshold highlight plots saved to: {}", output_dir.display());
    Ok(report.into_flagged())
}
