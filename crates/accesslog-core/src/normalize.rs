//! Field normalization: timestamps and request paths

use chrono::{DateTime, Local, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::debug;
use url::{form_urlencoded, Url};

/// `10/Oct/2000:13:55:36 -0700`
pub const CLF_TIMESTAMP: &str = "%d/%b/%Y:%H:%M:%S %z";

/// `2024-01-15 10:30:45` (milliseconds cut off before parsing)
pub const APPLOG_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Parse a CLF timestamp and drop the offset, keeping the wall-clock time as written.
pub fn parse_clf_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    DateTime::parse_from_str(raw, CLF_TIMESTAMP).map(|dt| dt.naive_local())
}

pub fn parse_applog_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let head = raw.split(',').next().unwrap_or(raw);
    NaiveDateTime::parse_from_str(head, APPLOG_TIMESTAMP)
}

// substitute for unparsable timestamps
pub fn ingestion_time() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Split a request target into (path without query, query parameters).
/// On failure the raw path comes back unchanged with no parameters.
pub fn split_path(raw: &str) -> (String, QueryParams) {
    match try_split_path(raw) {
        Ok(split) => split,
        Err(e) => {
            debug!(path = raw, error = %e, "Path split failed, keeping raw path");
            (raw.to_string(), QueryParams::new())
        }
    }
}

fn try_split_path(raw: &str) -> Result<(String, QueryParams), url::ParseError> {
    // absolute-form request target (proxies)
    if !raw.starts_with('/') && raw.contains("://") {
        let url = Url::parse(raw)?;
        let params = url.query().map(parse_query).unwrap_or_default();
        return Ok((url.path().to_string(), params));
    }

    let without_fragment = raw.split('#').next().unwrap_or(raw);
    Ok(match without_fragment.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (without_fragment.to_string(), QueryParams::new()),
    })
}

/// Decode a query string into key -> values, in order of appearance. Blank values are dropped.
pub fn parse_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}
