//! Core engine for HTTP access-log analysis
//! parses raw access-log text, aggregates traffic statistics and builds a rule-based report.
pub mod config;
pub mod error;
pub mod export;
pub mod heuristics;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod source;
pub mod stats;
pub mod useragent;

pub use config::{load_config, AnalyzeOptions, AnalyzerConfig};
pub use error::{AnalyzerError, Result};
pub use export::export;
pub use report::{build_report, Recommendation, RecommendationKind, Report};
pub use stats::{FrequencyTable, Stats};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Sentinel for fields a line did not carry
pub const UNKNOWN: &str = "unknown";

// GRAMMAR //

/// Line grammars, in the order they are tried. `Fallback` is never tried, it is what's left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    Combined,
    Common,
    #[serde(rename = "applog")]
    AppLogger,
    Nginx,
    Fallback,
}

impl Grammar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::Common => "common",
            Self::AppLogger => "applog",
            Self::Nginx => "nginx",
            Self::Fallback => "fallback",
        }
    }
}

// LOG ENTRY //

/// One normalized access-log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub raw: String, // original line, trimmed

    pub grammar: Grammar, // which grammar produced this entry

    pub ip: String,
    pub method: String,

    pub path: String,       // as captured, query string included
    pub path_clean: String, // path without query string

    #[serde(default)]
    pub query_params: BTreeMap<String, Vec<String>>,

    pub status: String, // kept as a token, "unknown" on fallback entries

    #[serde(default)]
    pub protocol: Option<String>,

    #[serde(default)]
    pub size: Option<String>,

    #[serde(default)]
    pub referer: Option<String>,

    #[serde(default)]
    pub user_agent: Option<String>,

    // application-logger only
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub module: Option<String>,

    pub timestamp: NaiveDateTime, // naive local time, offset stripped

    #[serde(default)]
    pub timestamp_is_fallback: bool, // true when `timestamp` is the ingestion time
}

impl LogEntry {
    pub fn is_error(&self) -> bool {
        is_error_status(&self.status)
    }

    pub fn user_agent_or_unknown(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(UNKNOWN)
    }
}

/// 4xx and 5xx status tokens
pub fn is_error_status(status: &str) -> bool {
    status.starts_with('4') || status.starts_with('5')
}

// ANALYSIS RUN //

/// Entries produced by one read of a source
#[derive(Debug, Clone, Default)]
pub struct AnalysisRun {
    pub source: String,
    pub entries: Vec<LogEntry>,
    pub fallback_lines: usize,
}

impl AnalysisRun {
    /// Classify every line in order. Lines never fail, unmatched ones become fallback entries.
    pub fn from_lines<I, S>(source: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let chain = parser::GrammarChain::standard();
        let mut run = AnalysisRun {
            source: source.into(),
            ..Default::default()
        };

        for line in lines {
            let outcome = chain.classify(line.as_ref());
            if outcome.is_fallback() {
                run.fallback_lines += 1;
            }
            run.entries.push(outcome.into_entry());
        }
        run
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ENTRY POINTS //

/// Read `source`, keep at most the last `max_lines` raw lines, and aggregate them.
pub fn analyze(source: impl AsRef<Path>, max_lines: Option<usize>) -> Result<Stats> {
    analyze_with(
        source,
        &AnalyzeOptions {
            max_lines,
            ..Default::default()
        },
    )
}

pub fn analyze_with(source: impl AsRef<Path>, options: &AnalyzeOptions) -> Result<Stats> {
    let source = source.as_ref();
    let lines = source::read_lines(source, options.max_lines)?;
    let line_count = lines.len();

    let run = AnalysisRun::from_lines(source.display().to_string(), lines);
    let stats = stats::aggregate(&run, options);

    info!(
        source = %source.display(),
        lines = line_count,
        entries = run.len(),
        fallback = run.fallback_lines,
        "Analyzed access log"
    );
    Ok(stats)
}
