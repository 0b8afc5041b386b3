// Application logger format: a log-record prefix wrapped around a werkzeug-style access line
// 2024-01-15 10:30:45,123 INFO in app: 127.0.0.1 - - [15/Jan/2024 10:30:45] "GET / HTTP/1.1" 200 -

use super::{LineGrammar, RawFields};
use crate::{normalize, Grammar};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static APPLOG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(?P<datetime>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}) "#,
        r#"(?P<level>\w+) in (?P<module>\w+): (?P<ip>\S+) - - "#,
        r#"\[(?P<timestamp>[^\]]+)\] "(?P<method>\S+) (?P<path>\S+) (?P<protocol>\S+)" "#,
        r#"(?P<status>\d+) -$"#,
    ))
    .expect("application logger grammar is a valid regex")
});

pub struct AppLoggerParser;

impl LineGrammar for AppLoggerParser {
    fn grammar(&self) -> Grammar {
        Grammar::AppLogger
    }

    fn captures<'a>(&self, line: &'a str) -> Option<RawFields<'a>> {
        APPLOG
            .captures(line)
            .and_then(|caps| RawFields::from_captures(&caps))
    }

    // the record prefix carries the timestamp, the bracketed one is ignored
    fn parse_timestamp(&self, raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        normalize::parse_applog_timestamp(raw)
    }
}
