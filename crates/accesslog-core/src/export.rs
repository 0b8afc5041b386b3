// Report export to JSON

use crate::{AnalyzerError, Report, Result};
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// `access_log_analysis_<YYYYMMDD_HHMMSS>.json`
pub fn default_file_name() -> String {
    format!("access_log_analysis_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write `report` as pretty JSON and return the path written.
/// Without an explicit path a timestamped name in the current directory is used.
pub fn export(report: &Report, output_path: Option<&Path>) -> Result<PathBuf> {
    let path = match output_path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(default_file_name()),
    };
    write_atomic(report, &path)?;

    info!(path = %path.display(), "Exported report");
    Ok(path)
}

/// Same as `export`, but default names land in `dir`
pub fn export_to_dir(report: &Report, dir: &Path) -> Result<PathBuf> {
    export(report, Some(&dir.join(default_file_name())))
}

// serialize fully first, then write to a sibling temp file and rename over the target
fn write_atomic(report: &Report, path: &Path) -> Result<()> {
    let body = serde_json::to_vec_pretty(report)?;

    let write_err = |source: std::io::Error| AnalyzerError::ExportWrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&body).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
