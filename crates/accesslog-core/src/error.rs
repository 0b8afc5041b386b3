// Errors surfaced to callers. Per-line problems never end up here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Log source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to read log source {}: {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write export {}: {source}", .path.display())]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
