use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot read {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is missing required column(s): {}", missing.join(", "))]
    Schema { path: PathBuf, missing: Vec<String> },

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("empty value in column {column} at data row {row}")]
    MissingValue { column: String, row: usize },

    #[error("unknown month name: {0:?}")]
    UnknownMonth(String),

    #[error("Grid_Energy_Use_kWh is zero on {month} {day}, cannot scale to an all-grid baseline")]
    DivisionByZero { month: String, day: u32 },

    #[error("output directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("{0} contains no data rows")]
    EmptyDataset(PathBuf),

    #[error("regression failed: {0}")]
    Regression(String),

    #[error("cannot prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {path}: {message}")]
    Render { path: PathBuf, message: String },
}
