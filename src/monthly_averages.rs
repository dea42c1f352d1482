use std::fmt;
use std::path::Path;

use chrono::Month;
use log::{info, warn};

use crate::calendar::{month_position, record_month, CALENDAR};
use crate::charts::{self, ColorScale};
use crate::config::ensure_output_dir;
use crate::error::Result;
use crate::read_csv::{load_dataset, Column, Dataset, MONTH};
use crate::stats::{mean, pearson_pairwise};

pub const METRICS: [Column; 4] = [
    Column::GridEnergyUse,
    Column::DedicatedSolarOutput,
    Column::Co2EmissionsUs,
    Column::Co2EmissionsVt,
];

pub const HEATMAP_FILE: &str = "monthly_variable_comparison_heatmap.png";
pub const CORRELATION_FILE: &str = "correlation_heatmap.png";

fn chart_title(column: Column) -> &'static str {
    match column {
        Column::GridEnergyUse => "Average Grid Energy Use per Month (kWh)",
        Column::DedicatedSolarOutput => "Average Solar Output per Month (kWh)",
        Column::Co2EmissionsUs => "Average CO2 Emissions per Month (US Avg)",
        Column::Co2EmissionsVt => "Average CO2 Emissions per Month (VT Avg)",
        _ => "Monthly Average",
    }
}

pub fn metric_file(column: Column) -> String {
    format!("{}.png", column.header())
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    pub month: Month,
    pub days: usize,
    /// Means of `METRICS`, None when the month has no value for the metric
    pub means: [Option<f64>; 4],
}

/// Twelve rows, January first
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    pub rows: Vec<MonthlyRow>,
}

impl MonthlyAggregate {
    /// The monthly series of one metric, in calendar order
    pub fn series(&self, metric: Column) -> Vec<Option<f64>> {
        match METRICS.iter().position(|m| *m == metric) {
            Some(i) => self.rows.iter().map(|r| r.means[i]).collect(),
            None => vec![None; self.rows.len()],
        }
    }

    /// Pearson correlation between every pair of metric series
    pub fn correlation(&self) -> Vec<Vec<Option<f64>>> {
        let series: Vec<Vec<Option<f64>>> = METRICS.iter().map(|m| self.series(*m)).collect();
        series
            .iter()
            .map(|a| series.iter().map(|b| pearson_pairwise(a, b)).collect())
            .collect()
    }
}

impl fmt::Display for MonthlyAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10}", "Month")?;
        for m in METRICS {
            write!(f, "  {:>26}", m.header())?;
        }
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "{:<10}", row.month.name())?;
            for value in row.means {
                match value {
                    Some(v) => write!(f, "  {:>26.6}", v)?,
                    None => write!(f, "  {:>26}", "NaN")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Means of the monthly metrics per calendar month. Empty cells are skipped.
pub fn monthly_means(data: &Dataset) -> Result<MonthlyAggregate> {
    let mut buckets: Vec<[Vec<f64>; 4]> = (0..12).map(|_| Default::default()).collect();
    let mut days = [0usize; 12];

    for (i, record) in data.records.iter().enumerate() {
        let slot = month_position(record_month(record, i + 1)?);
        days[slot] += 1;
        for (k, metric) in METRICS.iter().enumerate() {
            if let Some(v) = record.get(*metric) {
                buckets[slot][k].push(v);
            }
        }
    }

    let rows = CALENDAR
        .iter()
        .zip(buckets.iter().zip(days))
        .map(|(month, (values, days))| {
            if days == 0 {
                warn!("no rows for {}", month.name());
            }
            MonthlyRow {
                month: *month,
                days,
                means: [mean(&values[0]), mean(&values[1]), mean(&values[2]), mean(&values[3])],
            }
        })
        .collect();

    Ok(MonthlyAggregate { rows })
}

/// Aggregates by month and saves the per-metric bar charts and both heatmaps
pub fn analyze_monthly_averages(path: &Path, output_dir: &Path) -> Result<MonthlyAggregate> {
    let mut required = vec![MONTH];
    required.extend(METRICS.iter().map(|c| c.header()));
    let data = load_dataset(path, &required)?;
    let aggregate = monthly_means(&data)?;
    let correlation = aggregate.correlation();

    ensure_output_dir(output_dir)?;

    let months: Vec<String> = aggregate.rows.iter().map(|r| r.month.name().to_string()).collect();
    let colors = charts::palette(charts::VIRIDIS, months.len());
    for metric in METRICS {
        charts::bar_chart(
            &output_dir.join(metric_file(metric)),
            chart_title(metric),
            &months,
            &aggregate.series(metric),
            &metric.label(),
            &colors,
            true,
        )?;
    }

    let metric_names: Vec<String> = METRICS.iter().map(|m| m.header().to_string()).collect();
    let cells: Vec<Vec<Option<f64>>> = METRICS.iter().map(|m| aggregate.series(*m)).collect();
    let scale = ColorScale::sequential(charts::YL_GN_BU, cells.iter().flatten().flatten().copied());
    charts::heatmap(
        &output_dir.join(HEATMAP_FILE),
        "Monthly Comparison of Key Energy Metrics",
        &months,
        &metric_names,
        &cells,
        1,
        &scale,
    )?;

    let scale = ColorScale::centered(charts::COOLWARM, correlation.iter().flatten().flatten().copied());
    charts::heatmap(
        &output_dir.join(CORRELATION_FILE),
        "Correlation Between Monthly Averages",
        &metric_names,
        &metric_names,
        &correlation,
        2,
        &scale,
    )?;

    info!("Plots saved to: {}", output_dir.display());
    Ok(aggregate)
}
