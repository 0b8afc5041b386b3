// Fallback extractor: independent token search for ip / method / status

use crate::{normalize, Grammar, LogEntry, UNKNOWN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static IP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("ip pattern"));

static METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:GET|POST|PUT|DELETE|HEAD|OPTIONS|PATCH)\b").expect("method pattern")
});

static STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:200|201|204|301|302|400|401|403|404|500|502|503)\b").expect("status pattern")
});

fn find_or_unknown(pattern: &Regex, line: &str) -> String {
    pattern
        .find(line)
        .map(|m| m.as_str())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Never fails; anything not found is "unknown" and the timestamp is the ingestion time.
pub fn extract(line: &str) -> LogEntry {
    LogEntry {
        raw: line.to_string(),
        grammar: Grammar::Fallback,
        ip: find_or_unknown(&IP, line),
        method: find_or_unknown(&METHOD, line),
        path: UNKNOWN.to_string(),
        path_clean: UNKNOWN.to_string(),
        query_params: BTreeMap::new(),
        status: find_or_unknown(&STATUS, line),
        protocol: None,
        size: None,
        referer: None,
        user_agent: None,
        level: None,
        module: None,
        timestamp: normalize::ingestion_time(),
        timestamp_is_fallback: true,
    }
}
