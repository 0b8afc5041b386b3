// Source reading. The only input I/O in the engine.

use crate::{AnalyzerError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Read all physical lines of `path`, keeping only the last `max_lines` when set.
/// Truncation happens here, before any parsing. `Some(0)` means no limit.
pub fn read_lines(path: &Path, max_lines: Option<usize>) -> Result<Vec<String>> {
    let read_err = |source: std::io::Error| match source.kind() {
        ErrorKind::NotFound => AnalyzerError::SourceNotFound(path.to_path_buf()),
        _ => AnalyzerError::SourceRead {
            path: path.to_path_buf(),
            source,
        },
    };

    // metadata errors (e.g. permission denied on a parent) are read errors, not "missing"
    if !path.try_exists().map_err(read_err)? {
        return Err(AnalyzerError::SourceNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(read_err)?;

    // undecodable bytes are replaced, never fatal
    let text = String::from_utf8_lossy(&bytes);
    Ok(tail_lines(&text, max_lines))
}

pub fn tail_lines(text: &str, max_lines: Option<usize>) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = match max_lines {
        Some(n) if n > 0 => lines.len().saturating_sub(n),
        _ => 0,
    };
    lines[start..].iter().map(|l| l.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_last_lines() {
        let text = "a\nb\nc\nd\n";
        assert_eq!(tail_lines(text, Some(2)), vec!["c", "d"]);
        assert_eq!(tail_lines(text, Some(10)).len(), 4);
        assert_eq!(tail_lines(text, None).len(), 4);
        assert_eq!(tail_lines(text, Some(0)).len(), 4);
    }

    #[test]
    fn test_tail_counts_blank_lines() {
        assert_eq!(tail_lines("a\n\nb", Some(2)), vec!["", "b"]);
    }

    #[test]
    fn test_missing_source() {
        let err = read_lines(Path::new("/definitely/not/here.log"), None).unwrap_err();
        assert!(matches!(err, AnalyzerError::SourceNotFound(_)));
    }

    #[test]
    fn test_existing_but_unreadable_source() {
        // a directory exists, so this must not be reported as missing
        let dir = std::env::temp_dir();
        let err = read_lines(&dir, None).unwrap_err();
        assert!(matches!(err, AnalyzerError::SourceRead { .. }));
    }
}
