//! line classifier - tries each grammar in a fixed order, first full-line match wins

pub mod apache;
pub mod applog;
pub mod fallback;
pub mod nginx;

pub use apache::{CombinedParser, CommonParser};
pub use applog::AppLoggerParser;
pub use nginx::NginxParser;

use crate::{normalize, Grammar, LogEntry};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use tracing::debug;

// Captured groups of one grammar match, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFields<'a> {
    pub ip: &'a str,
    pub datetime: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub protocol: &'a str,
    pub status: &'a str,
    pub size: Option<&'a str>,
    pub referer: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub level: Option<&'a str>,
    pub module: Option<&'a str>,
}

impl<'a> RawFields<'a> {
    /// Every grammar uses the same group names; optional groups are simply absent.
    pub(crate) fn from_captures(caps: &regex::Captures<'a>) -> Option<Self> {
        let opt = |name: &str| caps.name(name).map(|m| m.as_str());
        Some(Self {
            ip: opt("ip")?,
            datetime: opt("datetime")?,
            method: opt("method")?,
            path: opt("path")?,
            protocol: opt("protocol")?,
            status: opt("status")?,
            size: opt("size"),
            referer: opt("referer"),
            user_agent: opt("user_agent"),
            level: opt("level"),
            module: opt("module"),
        })
    }
}

// Grammar trait - every known line format implements this

pub trait LineGrammar: Send + Sync {
    fn grammar(&self) -> Grammar;

    /// Full-line match. `None` means "try the next grammar".
    fn captures<'a>(&self, line: &'a str) -> Option<RawFields<'a>>;

    /// Grammar-specific timestamp template
    fn parse_timestamp(&self, raw: &str) -> Result<NaiveDateTime, chrono::ParseError>;
}

/// Why a line ended up as a fallback entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    EmptyLine,
    NoGrammarMatched,
}

/// Per-line result. Classification itself never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Classified(LogEntry),
    Fallback { entry: LogEntry, reason: FallbackReason },
}

impl LineOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn entry(&self) -> &LogEntry {
        match self {
            Self::Classified(entry) | Self::Fallback { entry, .. } => entry,
        }
    }

    pub fn into_entry(self) -> LogEntry {
        match self {
            Self::Classified(entry) | Self::Fallback { entry, .. } => entry,
        }
    }
}

static STANDARD: Lazy<GrammarChain> = Lazy::new(|| {
    let mut chain = GrammarChain::new();
    chain.register(Box::new(CombinedParser));
    chain.register(Box::new(CommonParser));
    chain.register(Box::new(AppLoggerParser));
    chain.register(Box::new(NginxParser));
    chain
});

// Ordered list of grammars. Order is priority, so this is a Vec and never a map.

#[derive(Default)]
pub struct GrammarChain {
    grammars: Vec<Box<dyn LineGrammar>>,
}

impl GrammarChain {
    pub fn new() -> Self {
        Self { grammars: Vec::new() }
    }

    /// Combined, Common, application logger, Nginx
    pub fn standard() -> &'static GrammarChain {
        &STANDARD
    }

    // appends at lowest priority
    pub fn register(&mut self, grammar: Box<dyn LineGrammar>) {
        self.grammars.push(grammar);
    }

    pub fn tags(&self) -> Vec<Grammar> {
        self.grammars.iter().map(|g| g.grammar()).collect()
    }

    pub fn classify(&self, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Fallback {
                entry: fallback::extract(line),
                reason: FallbackReason::EmptyLine,
            };
        }

        for grammar in &self.grammars {
            if let Some(fields) = grammar.captures(line) {
                return LineOutcome::Classified(normalize_entry(grammar.as_ref(), line, fields));
            }
        }

        LineOutcome::Fallback {
            entry: fallback::extract(line),
            reason: FallbackReason::NoGrammarMatched,
        }
    }
}

fn normalize_entry(grammar: &dyn LineGrammar, line: &str, fields: RawFields<'_>) -> LogEntry {
    let (timestamp, timestamp_is_fallback) = match grammar.parse_timestamp(fields.datetime) {
        Ok(ts) => (ts, false),
        Err(e) => {
            debug!(
                grammar = grammar.grammar().as_str(),
                datetime = fields.datetime,
                error = %e,
                "Timestamp parse failed, using ingestion time"
            );
            (normalize::ingestion_time(), true)
        }
    };
    let (path_clean, query_params) = normalize::split_path(fields.path);

    LogEntry {
        raw: line.to_string(),
        grammar: grammar.grammar(),
        ip: fields.ip.to_string(),
        method: fields.method.to_string(),
        path: fields.path.to_string(),
        path_clean,
        query_params,
        status: fields.status.to_string(),
        protocol: Some(fields.protocol.to_string()),
        size: fields.size.map(str::to_string),
        referer: fields.referer.map(str::to_string),
        user_agent: fields.user_agent.map(str::to_string),
        level: fields.level.map(str::to_string),
        module: fields.module.map(str::to_string),
        timestamp,
        timestamp_is_fallback,
    }
}
