use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::Month;
use log::{info, warn};

use crate::calendar::{is_calendar_date, month_position, parse_month, CALENDAR};
use crate::charts;
use crate::config::ensure_output_dir;
use crate::error::Result;
use crate::read_csv::{load_dataset, Column, Dataset, EnergyRecord};
use crate::stats::{boxplot_stats, describe, BoxplotStats, Summary};

pub const KEY_COLUMNS: [Column; 5] = [
    Column::GridEnergyUse,
    Column::DedicatedSolarOutput,
    Column::TotalEnergyUse,
    Column::BatteryStorageUsed,
    Column::Pue,
];

pub const BOXPLOT_FILE: &str = "outlier_boxplots.png";

#[derive(Debug, Clone)]
pub struct ColumnQuality {
    pub column: Column,
    pub summary: Summary,
    pub missing: usize,
    pub boxplot: Option<BoxplotStats>,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub rows: usize,
    pub columns: Vec<ColumnQuality>,
    pub duplicate_days: Vec<(Month, u32)>,
    /// Month and Day cells that do not name a real date, as written in the file
    pub invalid_dates: Vec<(String, u32)>,
}

impl QualityReport {
    pub fn column(&self, column: Column) -> Option<&ColumnQuality> {
        self.columns.iter().find(|c| c.column == column)
    }
}

/// Prints like a describe() frame: one column per metric, one line per statistic
impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self.columns.iter().map(|c| c.column.header().len().max(12)).collect();

        write!(f, "{:<6}", "")?;
        for (c, w) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>w$}", c.column.header(), w = *w)?;
        }
        writeln!(f)?;

        write!(f, "{:<6}", "count")?;
        for (c, w) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>w$.1}", c.summary.count as f64, w = *w)?;
        }
        writeln!(f)?;

        let lines: [(&str, fn(&Summary) -> f64); 7] = [
            ("mean", |s| s.mean),
            ("std", |s| s.std),
            ("min", |s| s.min),
            ("25%", |s| s.q25),
            ("50%", |s| s.median),
            ("75%", |s| s.q75),
            ("max", |s| s.max),
        ];
        for (name, pick) in lines {
            write!(f, "{:<6}", name)?;
            for (c, w) in self.columns.iter().zip(&widths) {
                write!(f, "  {:>w$.6}", pick(&c.summary), w = *w)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// (Month, Day) keys that appear more than once, in order of their second appearance
pub fn find_duplicate_days(records: &[EnergyRecord]) -> Vec<(Month, u32)> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for record in records {
        let (Some(name), Some(day)) = (record.month.as_deref(), record.day) else {
            continue;
        };
        let Ok(month) = parse_month(name) else {
            continue;
        };
        if !seen.insert((month_position(month), day)) {
            duplicates.push((CALENDAR[month_position(month)], day));
        }
    }

    duplicates
}

// Find rows whose month is unknown or whose day does not exist in that month
pub fn find_invalid_dates(records: &[EnergyRecord]) -> Vec<(String, u32)> {
    records
        .iter()
        .filter_map(|r| Some((r.month.clone()?, r.day?)))
        .filter(|(name, day)| match parse_month(name) {
            Ok(month) => !is_calendar_date(month, *day),
            Err(_) => true,
        })
        .collect()
}

/// Summary statistics, missing counts and box geometry for the key columns
pub fn summarize(data: &Dataset) -> QualityReport {
    let columns = KEY_COLUMNS
        .iter()
        .map(|column| {
            let values = data.present(*column);
            ColumnQuality {
                column: *column,
                summary: describe(&values),
                missing: data.len() - values.len(),
                boxplot: boxplot_stats(&values),
            }
        })
        .collect();

    QualityReport {
        rows: data.len(),
        columns,
        duplicate_days: find_duplicate_days(&data.records),
        invalid_dates: find_invalid_dates(&data.records),
    }
}

/// Loads the dataset, prints summary statistics and optionally renders outlier boxplots
pub fn check_data_quality(path: &Path, plot_dir: Option<&Path>) -> Result<QualityReport> {
    let headers: Vec<&str> = KEY_COLUMNS.iter().map(|c| c.header()).collect();
    let data = load_dataset(path, &headers)?;
    let report = summarize(&data);

    println!("Summary Statistics:");
    print!("{}", report);
    println!("\n{}\n", "-".repeat(50));

    for c in &report.columns {
        if c.missing > 0 {
            warn!("{} has {} missing value(s)", c.column, c.missing);
        }
    }
    for (month, day) in &report.duplicate_days {
        warn!("duplicate row for {} {}", month.name(), day);
    }
    for (month, day) in &report.invalid_dates {
        warn!("row for {} {} is not a calendar date", month, day);
    }

    if let Some(dir) = plot_dir {
        let panels: Vec<(String, BoxplotStats)> = report
            .columns
            .iter()
            .filter_map(|c| Some((c.column.header().to_string(), c.boxplot.clone()?)))
            .collect();
        ensure_output_dir(dir)?;
        let out = dir.join(BOXPLOT_FILE);
        charts::boxplots(&out, "Outlier Detection via Boxplots", &panels)?;
        info!("boxplots saved to: {}", out.display());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::test_support::{dataset, record, write_csv, write_records};
    use approx::assert_relative_eq;

    #[test]
    fn summarizes_each_key_column() {
        let mut records: Vec<EnergyRecord> = (1..=4).map(|d| record("January", d, d as f64)).collect();
        records[3].set(Column::Pue, None);
        let report = summarize(&dataset(records));

        assert_eq!(report.rows, 4);
        assert_eq!(report.columns.len(), 5);

        let grid = report.column(Column::GridEnergyUse).unwrap();
        assert_eq!(grid.summary.count, 4);
        assert_eq!(grid.missing, 0);
        assert_relative_eq!(grid.summary.mean, 2.5);
        assert_relative_eq!(grid.summary.median, 2.5);

        let pue = report.column(Column::Pue).unwrap();
        assert_eq!(pue.summary.count, 3);
        assert_eq!(pue.missing, 1);
        assert_relative_eq!(pue.summary.max, 3.0);
    }

    #[test]
    fn reports_duplicate_and_impossible_days() {
        let records = vec![
            record("January", 1, 0.0),
            record("February", 30, 0.0),
            record("january", 1, 0.0),
            record("Febtober", 3, 0.0),
            record("February", 29, 0.0),
        ];
        assert_eq!(find_duplicate_days(&records), vec![(Month::January, 1)]);
        assert_eq!(
            find_invalid_dates(&records),
            vec![("February".to_string(), 30), ("Febtober".to_string(), 3)]
        );
    }

    #[test]
    fn table_lists_every_statistic() {
        let records: Vec<EnergyRecord> = (1..=3).map(|d| record("March", d, d as f64)).collect();
        let text = summarize(&dataset(records)).to_string();
        for label in ["count", "mean", "std", "min", "25%", "50%", "75%", "max", "Grid_Energy_Use_kWh", "PUE"] {
            assert!(text.contains(label), "missing {} in\n{}", label, text);
        }
    }

    #[test]
    fn missing_pue_column_fails_before_plotting() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "Month,Day,Grid_Energy_Use_kWh,Dedicated_Solar_Output_kWh,Total_Energy_Use_kWh,Battery_Storage_Used_kWh\n\
             January,1,1,2,3,4\n",
        );
        let plots = dir.path().join("plots");
        match check_data_quality(&path, Some(&plots)) {
            Err(AnalysisError::Schema { missing, .. }) => assert_eq!(missing, vec!["PUE".to_string()]),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!plots.exists());
    }

    #[test]
    fn runs_without_plots() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<EnergyRecord> = (1..=5).map(|d| record("April", d, d as f64)).collect();
        let path = write_records(dir.path(), &records);
        let report = check_data_quality(&path, None).unwrap();
        assert_eq!(report.rows, 5);
        assert!(report.duplicate_days.is_empty());
    }

    #[test]
    #[ignore = "needs a system sans-serif font for chart text"]
    fn writes_boxplot_figure() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<EnergyRecord> = (1..=20).map(|d| record("April", d, (d * d) as f64)).collect();
        let path = write_records(dir.path(), &records);
        let plots = dir.path().join("plots");
        check_data_quality(&path, Some(&plots)).unwrap();
        assert!(plots.join(BOXPLOT_FILE).is_file());
    }
}
