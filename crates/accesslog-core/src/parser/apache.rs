// Apache access log grammars (Combined and Common)

use super::{LineGrammar, RawFields};
use crate::{normalize, Grammar};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

// 127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /a.gif HTTP/1.0" 200 2326 "http://x/" "Mozilla/4.08"
static COMBINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(?P<ip>\S+) \S+ \S+ \[(?P<datetime>[^\]]+)\] "#,
        r#""(?P<method>\S+) (?P<path>\S+) (?P<protocol>\S+)" "#,
        r#"(?P<status>\d+) (?P<size>\S+) "(?P<referer>[^"]*)" "(?P<user_agent>[^"]*)"$"#,
    ))
    .expect("combined grammar is a valid regex")
});

// 127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /a.gif HTTP/1.0" 200 2326
static COMMON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(?P<ip>\S+) \S+ \S+ \[(?P<datetime>[^\]]+)\] "#,
        r#""(?P<method>\S+) (?P<path>\S+) (?P<protocol>\S+)" "#,
        r#"(?P<status>\d+) (?P<size>\S+)$"#,
    ))
    .expect("common grammar is a valid regex")
});

pub struct CombinedParser;

impl LineGrammar for CombinedParser {
    fn grammar(&self) -> Grammar {
        Grammar::Combined
    }

    fn captures<'a>(&self, line: &'a str) -> Option<RawFields<'a>> {
        COMBINED
            .captures(line)
            .and_then(|caps| RawFields::from_captures(&caps))
    }

    fn parse_timestamp(&self, raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        normalize::parse_clf_timestamp(raw)
    }
}

pub struct CommonParser;

impl LineGrammar for CommonParser {
    fn grammar(&self) -> Grammar {
        Grammar::Common
    }

    fn captures<'a>(&self, line: &'a str) -> Option<RawFields<'a>> {
        COMMON
            .captures(line)
            .and_then(|caps| RawFields::from_captures(&caps))
    }

    fn parse_timestamp(&self, raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        normalize::parse_clf_timestamp(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_fields() {
        let line = r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)""#;
        let fields = CombinedParser.captures(line).unwrap();
        assert_eq!(fields.ip, "127.0.0.1");
        assert_eq!(fields.datetime, "10/Oct/2000:13:55:36 -0700");
        assert_eq!(fields.method, "GET");
        assert_eq!(fields.path, "/apache_pb.gif");
        assert_eq!(fields.protocol, "HTTP/1.0");
        assert_eq!(fields.status, "200");
        assert_eq!(fields.size, Some("2326"));
        assert_eq!(fields.referer, Some("http://www.example.com/start.html"));
        assert_eq!(fields.user_agent, Some("Mozilla/4.08 [en] (Win98; I ;Nav)"));
    }

    #[test]
    fn test_common_is_full_line() {
        let line = r#"127.0.0.1 - - [10/Oct/2000:13:55:36 -0700] "GET / HTTP/1.0" 200 -"#;
        assert!(CommonParser.captures(line).is_some());

        // trailing referer/agent belong to Combined
        let combined = format!(r#"{} "-" "curl/8.0""#, line);
        assert!(CommonParser.captures(&combined).is_none());
        assert!(CombinedParser.captures(&combined).is_some());
    }

    #[test]
    fn test_non_numeric_status_rejected() {
        let line = r#"127.0.0.1 - - [10/Oct/2000:13:55:36 -0700] "GET / HTTP/1.0" OK 10"#;
        assert!(CommonParser.captures(line).is_none());
    }
}
