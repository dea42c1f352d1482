use std::fs::write;
use std::path::{Path, PathBuf};

use crate::read_csv::{Column, Dataset, EnergyRecord, DAY, MONTH};

pub(crate) fn write_csv(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("Data.csv");
    write(&path, contents).unwrap();
    path
}

/// A row with every numeric column set to `fill`
pub(crate) fn record(month: &str, day: u32, fill: f64) -> EnergyRecord {
    let mut r = EnergyRecord { month: Some(month.to_string()), day: Some(day), ..Default::default() };
    for column in Column::ALL {
        r.set(column, Some(fill));
    }
    r
}

pub(crate) fn dataset(records: Vec<EnergyRecord>) -> Dataset {
    Dataset::from_records("memory.csv", records)
}

/// Serialises records with the full header set
pub(crate) fn write_records(dir: &Path, records: &[EnergyRecord]) -> PathBuf {
    let mut out = format!("{},{}", MONTH, DAY);
    for column in Column::ALL {
        out.push(',');
        out.push_str(column.header());
    }
    out.push('\n');

    for r in records {
        out.push_str(r.month.as_deref().unwrap_or(""));
        out.push(',');
        out.push_str(&r.day.map(|d| d.to_string()).unwrap_or_default());
        for column in Column::ALL {
            out.push(',');
            out.push_str(&r.get(column).map(|v| v.to_string()).unwrap_or_default());
        }
        out.push('\n');
    }
    write_csv(dir, &out)
}
