use std::fmt;
use std::path::Path;

use log::info;

use crate::calendar::{month_day, sort_chronologically};
use crate::charts;
use crate::config::ensure_output_dir;
use crate::error::{AnalysisError, Result};
use crate::read_csv::{load_dataset, Column, EnergyRecord, DAY, MONTH};

pub const INPUTS: [Column; 4] = [
    Column::TotalEnergyUse,
    Column::GridEnergyUse,
    Column::Co2EmissionsUs,
    Column::CostFromGrid,
];

pub const CUMULATIVE_FILE: &str = "cumulative_impact.png";

/// One day of avoided grid draw, emissions and cost, with running totals
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactRow {
    pub month: String,
    pub day: u32,
    pub grid_energy_avoided: f64,
    pub emissions_if_all_grid: f64,
    pub emissions_avoided: f64,
    pub cost_if_all_grid: f64,
    pub cost_savings: f64,
    pub cumulative_grid_avoided: f64,
    pub cumulative_emissions_avoided: f64,
    pub cumulative_cost_savings: f64,
}

/// Rows in calendar order
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeImpact {
    pub rows: Vec<ImpactRow>,
}

impl CumulativeImpact {
    pub fn cumulative_grid_avoided(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cumulative_grid_avoided).collect()
    }

    pub fn cumulative_emissions_avoided(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cumulative_emissions_avoided).collect()
    }

    pub fn cumulative_cost_savings(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cumulative_cost_savings).collect()
    }

    pub fn tail(&self, n: usize) -> &[ImpactRow] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }
}

impl fmt::Display for CumulativeImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:>4}  {:>24}  {:>28}  {:>23}",
            "Month", "Day", "Cumulative_Grid_Avoided", "Cumulative_Emissions_Avoided", "Cumulative_Cost_Savings"
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<10} {:>4}  {:>24.4}  {:>28.4}  {:>23.4}",
                r.month, r.day, r.cumulative_grid_avoided, r.cumulative_emissions_avoided, r.cumulative_cost_savings
            )?;
        }
        Ok(())
    }
}

/// Derived savings per row and their running sums, in calendar order
pub fn cumulative_series(records: &[EnergyRecord]) -> Result<CumulativeImpact> {
    let sorted = sort_chronologically(records)?;

    let mut rows = Vec::with_capacity(sorted.len());
    let (mut grid_sum, mut emissions_sum, mut cost_sum) = (0.0, 0.0, 0.0);

    for (row, record) in &sorted {
        let (_, day) = month_day(record, *row)?;
        let month = record.month.clone().unwrap_or_default();
        let total = record.require(Column::TotalEnergyUse, *row)?;
        let grid = record.require(Column::GridEnergyUse, *row)?;
        let co2 = record.require(Column::Co2EmissionsUs, *row)?;
        let cost = record.require(Column::CostFromGrid, *row)?;

        if grid == 0.0 {
            return Err(AnalysisError::DivisionByZero { month, day });
        }
        let all_grid_factor = total / grid;

        let grid_energy_avoided = total - grid;
        let emissions_if_all_grid = all_grid_factor * co2;
        let emissions_avoided = emissions_if_all_grid - co2;
        let cost_if_all_grid = all_grid_factor * cost;
        let cost_savings = cost_if_all_grid - cost;

        grid_sum += grid_energy_avoided;
        emissions_sum += emissions_avoided;
        cost_sum += cost_savings;

        rows.push(ImpactRow {
            month,
            day,
            grid_energy_avoided,
            emissions_if_all_grid,
            emissions_avoided,
            cost_if_all_grid,
            cost_savings,
            cumulative_grid_avoided: grid_sum,
            cumulative_emissions_avoided: emissions_sum,
            cumulative_cost_savings: cost_sum,
        });
    }

    Ok(CumulativeImpact { rows })
}

pub fn calculate_cumulative_impact(path: &Path, output_dir: &Path) -> Result<CumulativeImpact> {
    let mut required = vec![MONTH, DAY];
    required.extend(INPUTS.iter().map(|c| c.header()));
    let data = load_dataset(path, &required)?;
    let impact = cumulative_series(&data.records)?;

    ensure_output_dir(output_dir)?;
    let grid = impact.cumulative_grid_avoided();
    let emissions = impact.cumulative_emissions_avoided();
    let cost = impact.cumulative_cost_savings();
    charts::line_chart(
        &output_dir.join(CUMULATIVE_FILE),
        "Cumulative Impact Over the Year",
        "Day of Year",
        "Cumulative Value",
        &[
            ("Grid Energy Avoided (kWh)", charts::STEEL_BLUE, grid.as_slice()),
            ("Emissions Avoided (kg CO2)", charts::DARK_GREEN, emissions.as_slice()),
            ("Cost Savings ($)", charts::PURPLE, cost.as_slice()),
        ],
    )?;

    info!("Cumulative impact plot saved.");
    Ok(impact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, write_csv, write_records};
    use approx::assert_relative_eq;

    fn day(month: &str, d: u32, grid: f64, total: f64, co2: f64, cost: f64) -> EnergyRecord {
        let mut r = record(month, d, 0.0);
        r.set(Column::GridEnergyUse, Some(grid));
        r.set(Column::TotalEnergyUse, Some(total));
        r.set(Column::Co2EmissionsUs, Some(co2));
        r.set(Column::CostFromGrid, Some(cost));
        r
    }

    #[test]
    fn march_example_accumulates_avoided_grid_energy() {
        let records = vec![
            day("March", 1, 10.0, 15.0, 1.0, 1.0),
            day("March", 2, 20.0, 25.0, 1.0, 1.0),
            day("March", 3, 30.0, 35.0, 1.0, 1.0),
        ];
        let impact = cumulative_series(&records).unwrap();
        let avoided: Vec<f64> = impact.rows.iter().map(|r| r.grid_energy_avoided).collect();
        assert_eq!(avoided, vec![5.0, 5.0, 5.0]);
        assert_eq!(impact.cumulative_grid_avoided(), vec![5.0, 10.0, 15.0]);
    }

    #[test]
    fn emissions_and_cost_scale_to_an_all_grid_baseline() {
        let records = vec![day("July", 4, 50.0, 200.0, 10.0, 8.0)];
        let row = &cumulative_series(&records).unwrap().rows[0];
        assert_relative_eq!(row.emissions_if_all_grid, 40.0);
        assert_relative_eq!(row.emissions_avoided, 30.0);
        assert_relative_eq!(row.cost_if_all_grid, 32.0);
        assert_relative_eq!(row.cost_savings, 24.0);
    }

    #[test]
    fn running_sums_follow_calendar_order_and_prefix_law() {
        let records = vec![
            day("December", 1, 10.0, 11.0, 2.0, 3.0),
            day("January", 2, 10.0, 30.0, 1.0, 1.0),
            day("January", 1, 5.0, 4.0, 1.0, 2.0),
            day("June", 15, 8.0, 16.0, 3.0, 0.5),
        ];
        let impact = cumulative_series(&records).unwrap();
        let order: Vec<(&str, u32)> = impact.rows.iter().map(|r| (r.month.as_str(), r.day)).collect();
        assert_eq!(order, vec![("January", 1), ("January", 2), ("June", 15), ("December", 1)]);

        let rows = &impact.rows;
        assert_relative_eq!(rows[0].cumulative_emissions_avoided, rows[0].emissions_avoided);
        for n in 1..rows.len() {
            assert_relative_eq!(rows[n].cumulative_grid_avoided, rows[n - 1].cumulative_grid_avoided + rows[n].grid_energy_avoided);
            assert_relative_eq!(
                rows[n].cumulative_emissions_avoided,
                rows[n - 1].cumulative_emissions_avoided + rows[n].emissions_avoided
            );
            assert_relative_eq!(rows[n].cumulative_cost_savings, rows[n - 1].cumulative_cost_savings + rows[n].cost_savings);
        }
        // a negative day makes the series dip
        assert!(rows[1].cumulative_grid_avoided > rows[0].cumulative_grid_avoided);
        assert!(rows[0].cumulative_grid_avoided < 0.0);
    }

    #[test]
    fn zero_grid_use_is_a_division_error() {
        let records = vec![day("March", 1, 10.0, 15.0, 1.0, 1.0), day("March", 2, 0.0, 15.0, 1.0, 1.0)];
        match cumulative_series(&records) {
            Err(AnalysisError::DivisionByZero { month, day }) => {
                assert_eq!(month, "March");
                assert_eq!(day, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_cell_is_reported_at_its_file_row() {
        let mut january = day("January", 1, 10.0, 15.0, 1.0, 1.0);
        january.set(Column::CostFromGrid, None);
        let records = vec![
            day("March", 1, 10.0, 15.0, 1.0, 1.0),
            day("February", 1, 10.0, 15.0, 1.0, 1.0),
            january,
        ];
        match cumulative_series(&records) {
            Err(AnalysisError::MissingValue { column, row }) => {
                assert_eq!(column, "Cost_from_Grid_$");
                assert_eq!(row, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn tail_returns_last_rows() {
        let records: Vec<EnergyRecord> = (1..=8).map(|d| day("May", d, 1.0, 2.0, 1.0, 1.0)).collect();
        let impact = cumulative_series(&records).unwrap();
        let tail = impact.tail(5);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0].day, 4);
        assert_eq!(impact.tail(50).len(), 8);
    }

    #[test]
    fn zero_division_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "Month,Day,Total_Energy_Use_kWh,Grid_Energy_Use_kWh,CO2_Emissions_US_avg,Cost_from_Grid_$\n\
             April,1,10,0,1,1\n",
        );
        let out = dir.path().join("out");
        assert!(matches!(
            calculate_cumulative_impact(&path, &out),
            Err(AnalysisError::DivisionByZero { .. })
        ));
        assert!(!out.exists());
    }

    #[test]
    #[ignore = "needs a system sans-serif font for chart text"]
    fn writes_cumulative_chart_into_a_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<EnergyRecord> = (1..=20).map(|d| day("August", d, 10.0, 12.0 + d as f64, 2.0, 1.5)).collect();
        let path = write_records(dir.path(), &records);
        let out = dir.path().join("charts").join("impact");
        let impact = calculate_cumulative_impact(&path, &out).unwrap();
        assert_eq!(impact.rows.len(), 20);
        assert!(out.join(CUMULATIVE_FILE).is_file());
    }
}
