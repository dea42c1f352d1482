//! Analysis of a daily data center energy dataset: quality checks, a grid
//! dependence regression and trend charts, all read from one CSV file.

pub mod calendar;
pub mod charts;
pub mod config;
pub mod cumulative_impact;
pub mod error;
pub mod monthly_averages;
pub mod quality_check;
pub mod read_csv;
pub mod regression;
pub mod stats;
pub mod threshold_days;

#[cfg(test)]
mod test_support;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
