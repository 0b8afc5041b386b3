//! Configuration for analysis runs

use crate::{AnalyzerError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

// Main config structure, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    // keep only the last N raw lines (0 = all)
    pub max_lines: Option<usize>,

    // leave ingestion-time stamps out of the time buckets
    pub exclude_fallback_timestamps: bool,

    // where default-named exports go
    pub output_dir: Option<PathBuf>,
}

impl AnalyzerConfig {
    pub fn options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            max_lines: self.max_lines,
            exclude_fallback_timestamps: self.exclude_fallback_timestamps,
        }
    }
}

/// Engine knobs for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzeOptions {
    pub max_lines: Option<usize>,
    pub exclude_fallback_timestamps: bool,
}

// Load configuration from a TOML file

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalyzerConfig> {
    let path = path.as_ref();
    let config_err = |message: String| AnalyzerError::Config {
        path: path.to_path_buf(),
        message,
    };

    let content = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
    toml::from_str(&content).map_err(|e| config_err(e.to_string()))
}
