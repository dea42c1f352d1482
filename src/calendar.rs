use chrono::{Month, NaiveDate};

use crate::error::{AnalysisError, Result};
use crate::read_csv::{EnergyRecord, DAY, MONTH};

/// Fixed calendar order used for every monthly table and chronological sort
pub const CALENDAR: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

// Leap year so that February 29 counts as a real day
const REFERENCE_YEAR: i32 = 2024;

pub fn parse_month(name: &str) -> Result<Month> {
    name.trim().parse::<Month>().map_err(|_| AnalysisError::UnknownMonth(name.to_string()))
}

/// Zero-based position of the month in `CALENDAR`
pub fn month_position(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

/// Month of a record, failing on an empty cell or an unknown name
pub fn record_month(record: &EnergyRecord, row: usize) -> Result<Month> {
    let name = record
        .month
        .as_deref()
        .ok_or_else(|| AnalysisError::MissingValue { column: MONTH.to_string(), row })?;
    parse_month(name)
}

/// Month and day of a record, see `record_month`
pub fn month_day(record: &EnergyRecord, row: usize) -> Result<(Month, u32)> {
    let month = record_month(record, row)?;
    let day = record.day.ok_or_else(|| AnalysisError::MissingValue { column: DAY.to_string(), row })?;
    Ok((month, day))
}

/// Records ordered by (calendar month, day), each paired with its 1-based file row.
/// Ties keep file order.
pub fn sort_chronologically(records: &[EnergyRecord]) -> Result<Vec<(usize, EnergyRecord)>> {
    let mut keyed = records
        .iter()
        .enumerate()
        .map(|(i, r)| month_day(r, i + 1).map(|(m, d)| ((month_position(m), d), i + 1, r)))
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by_key(|(key, _, _)| *key);

    Ok(keyed.into_iter().map(|(_, row, r)| (row, r.clone())).collect())
}

/// Whether the pair names a real day of the year
pub fn is_calendar_date(month: Month, day: u32) -> bool {
    NaiveDate::from_ymd_opt(REFERENCE_YEAR, month.number_from_month(), day).is_some()
}
