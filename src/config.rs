use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};

pub const DEFAULT_DATA_PATH: &str = "Data/Data.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "visualizations";

/// Where to read the dataset from and where to write charts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl AnalysisConfig {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(data_path: P, output_dir: Q) -> Self {
        AnalysisConfig { data_path: data_path.into(), output_dir: output_dir.into() }
    }
}

// Create the output directory and its parents when absent
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    create_dir_all(dir).map_err(|source| AnalysisError::Io { path: dir.to_path_buf(), source })
}

// Fail unless the output directory already exists
pub fn require_output_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(AnalysisError::DirectoryNotFound(dir.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_conventional_layout() {
        let config = AnalysisConfig::default();
        assert_eq!(config.data_path, PathBuf::from("Data/Data.csv"));
        assert_eq!(config.output_dir, PathBuf::from("visualizations"));
    }

    #[test]
    fn ensure_creates_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // idempotent
        ensure_output_dir(&nested).unwrap();
    }

    #[test]
    fn require_rejects_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        match require_output_dir(&missing) {
            Err(AnalysisError::DirectoryNotFound(p)) => assert_eq!(p, missing),
            other => panic!("unexpected result: {:?}", other),
        }
        require_output_dir(tmp.path()).unwrap();
    }
}
