// Nginx access log parser (default `combined` log_format, strictly numeric body size)

use super::{LineGrammar, RawFields};
use crate::{normalize, Grammar};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static NGINX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(?P<ip>\S+) - \S+ \[(?P<datetime>[^\]]+)\] "#,
        r#""(?P<method>\S+) (?P<path>\S+) (?P<protocol>\S+)" "#,
        r#"(?P<status>\d+) (?P<size>\d+) "(?P<referer>[^"]*)" "(?P<user_agent>[^"]*)"$"#,
    ))
    .expect("nginx grammar is a valid regex")
});

pub struct NginxParser;

impl LineGrammar for NginxParser {
    fn grammar(&self) -> Grammar {
        Grammar::Nginx
    }

    fn captures<'a>(&self, line: &'a str) -> Option<RawFields<'a>> {
        NGINX
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
    fn test_nginx_access_log() {
        let line = r#"192.168.1.1 - - [08/Feb/2024:10:30:00 +0000] "GET /api/users HTTP/1.1" 200 1234 "-" "Mozilla/5.0""#;
        let fields = NginxParser.captures(line).unwrap();
        assert_eq!(fields.ip, "192.168.1.1");
        assert_eq!(fields.status, "200");
        assert_eq!(fields.size, Some("1234"));
        assert_eq!(fields.referer, Some("-"));
    }

    #[test]
    fn test_nginx_requires_numeric_size() {
        let line = r#"192.168.1.1 - - [08/Feb/2024:10:30:00 +0000] "GET / HTTP/1.1" 304 - "-" "Mozilla/5.0""#;
        assert!(NginxParser.captures(line).is_none());
    }
}
