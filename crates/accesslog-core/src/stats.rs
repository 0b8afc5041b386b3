//! Single-pass aggregation of an analysis run into ranked frequency tables and time buckets

use crate::heuristics::{is_admin_path, is_bot, is_static};
use crate::{is_error_status, AnalysisRun, AnalyzeOptions, Grammar, LogEntry, UNKNOWN};
use chrono::NaiveDateTime;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const TOP_PAGES_LIMIT: usize = 20;
pub const TOP_IPS_LIMIT: usize = 20;
pub const TOP_ERRORS_LIMIT: usize = 20;
pub const TOP_USER_AGENTS_LIMIT: usize = 10;
pub const TOP_REFERERS_LIMIT: usize = 10;

// FREQUENCY TABLES //

/// Counts keyed by string, remembering the order keys were first seen
#[derive(Debug, Clone, Default)]
pub struct FrequencyCounter {
    counts: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: &str, n: u64) {
        match self.index.get(key) {
            Some(&i) => self.counts[i].1 += n,
            None => {
                self.index.insert(key.to_string(), self.counts.len());
                self.counts.push((key.to_string(), n));
            }
        }
    }

    /// number of distinct keys
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Descending by count, ties by first-seen index, cut to `limit` entries.
    pub fn ranked(self, limit: Option<usize>) -> FrequencyTable {
        let mut indexed: Vec<(usize, (String, u64))> = self.counts.into_iter().enumerate().collect();
        indexed.sort_by_key(|(first_seen, (_, count))| (Reverse(*count), *first_seen));

        let mut ranked: Vec<(String, u64)> = indexed.into_iter().map(|(_, kv)| kv).collect();
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        FrequencyTable(ranked)
    }
}

/// Ranked, size-capped key -> count table. Serialized as a JSON object in rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable(Vec<(String, u64)>);

impl FrequencyTable {
    pub fn top(&self) -> Option<(&str, u64)> {
        self.0.first().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, c)| c).sum()
    }

    /// first `n` rows
    pub fn head(&self, n: usize) -> FrequencyTable {
        FrequencyTable(self.0.iter().take(n).cloned().collect())
    }
}

impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

struct FrequencyTableVisitor;

impl<'de> Visitor<'de> for FrequencyTableVisitor {
    type Value = FrequencyTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of key to count")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut rows = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, count)) = access.next_entry::<String, u64>()? {
            rows.push((key, count));
        }
        Ok(FrequencyTable(rows))
    }
}

impl<'de> Deserialize<'de> for FrequencyTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FrequencyTableVisitor)
    }
}

// STATS //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPeriod {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub duration_seconds: i64,
    pub duration: String, // H:MM:SS, "N days, " prefix past one day
}

impl AnalysisPeriod {
    pub fn empty() -> Self {
        Self {
            start: None,
            end: None,
            duration_seconds: 0,
            duration: format_duration(0),
        }
    }

    fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let seconds = (end - start).num_seconds();
        Self {
            start: Some(start),
            end: Some(end),
            duration_seconds: seconds,
            duration: format_duration(seconds),
        }
    }
}

pub fn format_duration(seconds: i64) -> String {
    let days = seconds / 86_400;
    let rem = seconds % 86_400;
    let clock = format!("{}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

/// Aggregate for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub source: String,

    pub total_requests: u64,
    pub unique_ips: u64,
    pub bot_requests: u64,
    pub admin_requests: u64,
    pub static_requests: u64,

    pub fallback_entries: u64,    // lines no grammar matched
    pub fallback_timestamps: u64, // entries stamped with ingestion time

    pub grammars: FrequencyTable,
    pub status_codes: FrequencyTable,
    pub methods: FrequencyTable,
    pub top_pages: FrequencyTable,
    pub top_ips: FrequencyTable,
    pub errors: FrequencyTable, // "<status> <path>"
    pub user_agents: FrequencyTable,
    pub referers: FrequencyTable,

    pub hourly_stats: BTreeMap<String, u64>, // "00".."23", always 24 slots
    pub daily_stats: BTreeMap<String, u64>,  // "YYYY-MM-DD"

    pub analysis_period: AnalysisPeriod,
}

impl Stats {
    pub fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            total_requests: 0,
            unique_ips: 0,
            bot_requests: 0,
            admin_requests: 0,
            static_requests: 0,
            fallback_entries: 0,
            fallback_timestamps: 0,
            grammars: FrequencyTable::default(),
            status_codes: FrequencyTable::default(),
            methods: FrequencyTable::default(),
            top_pages: FrequencyTable::default(),
            top_ips: FrequencyTable::default(),
            errors: FrequencyTable::default(),
            user_agents: FrequencyTable::default(),
            referers: FrequencyTable::default(),
            hourly_stats: hour_slots(),
            daily_stats: BTreeMap::new(),
            analysis_period: AnalysisPeriod::empty(),
        }
    }

    /// 4xx/5xx requests, from the uncapped status table
    pub fn error_requests(&self) -> u64 {
        self.status_codes
            .iter()
            .filter(|(status, _)| is_error_status(status))
            .map(|(_, count)| count)
            .sum()
    }
}

fn hour_slots() -> BTreeMap<String, u64> {
    (0..24).map(|h| (format!("{:02}", h), 0)).collect()
}

// AGGREGATOR //

pub struct Aggregator {
    exclude_fallback_timestamps: bool,

    total: u64,
    bot: u64,
    admin: u64,
    statics: u64,
    fallback_entries: u64,
    fallback_timestamps: u64,

    grammars: FrequencyCounter,
    status_codes: FrequencyCounter,
    methods: FrequencyCounter,
    pages: FrequencyCounter,
    ips: FrequencyCounter,
    errors: FrequencyCounter,
    user_agents: FrequencyCounter,
    referers: FrequencyCounter,

    hourly: BTreeMap<String, u64>,
    daily: BTreeMap<String, u64>,
    window: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl Aggregator {
    pub fn new(options: &AnalyzeOptions) -> Self {
        Self {
            exclude_fallback_timestamps: options.exclude_fallback_timestamps,
            total: 0,
            bot: 0,
            admin: 0,
            statics: 0,
            fallback_entries: 0,
            fallback_timestamps: 0,
            grammars: FrequencyCounter::new(),
            status_codes: FrequencyCounter::new(),
            methods: FrequencyCounter::new(),
            pages: FrequencyCounter::new(),
            ips: FrequencyCounter::new(),
            errors: FrequencyCounter::new(),
            user_agents: FrequencyCounter::new(),
            referers: FrequencyCounter::new(),
            hourly: hour_slots(),
            daily: BTreeMap::new(),
            window: None,
        }
    }

    pub fn observe(&mut self, entry: &LogEntry) {
        self.total += 1;
        self.grammars.add(entry.grammar.as_str());
        if entry.grammar == Grammar::Fallback {
            self.fallback_entries += 1;
        }

        self.status_codes.add(&entry.status);
        self.methods.add(&entry.method);
        self.ips.add(&entry.ip);

        let path = entry.path_clean.as_str();
        if is_static(path) {
            self.statics += 1;
        } else {
            self.pages.add(path);
        }
        if is_admin_path(path) {
            self.admin += 1;
        }
        if is_error_status(&entry.status) {
            self.errors.add(&format!("{} {}", entry.status, path));
        }

        let ua = entry.user_agent_or_unknown();
        if is_bot(ua) {
            self.bot += 1;
        }
        if is_present(ua) {
            self.user_agents.add(ua);
        }
        if let Some(referer) = entry.referer.as_deref().filter(|r| is_present(r)) {
            self.referers.add(referer);
        }

        self.observe_time(entry);
    }

    fn observe_time(&mut self, entry: &LogEntry) {
        if entry.timestamp_is_fallback {
            self.fallback_timestamps += 1;
            if self.exclude_fallback_timestamps {
                return;
            }
        }

        let ts = entry.timestamp;
        *self.hourly.entry(ts.format("%H").to_string()).or_insert(0) += 1;
        *self.daily.entry(ts.format("%Y-%m-%d").to_string()).or_insert(0) += 1;

        self.window = Some(match self.window {
            Some((start, end)) => (start.min(ts), end.max(ts)),
            None => (ts, ts),
        });
    }

    pub fn finish(self, source: &str) -> Stats {
        Stats {
            source: source.to_string(),
            total_requests: self.total,
            unique_ips: self.ips.distinct() as u64,
            bot_requests: self.bot,
            admin_requests: self.admin,
            static_requests: self.statics,
            fallback_entries: self.fallback_entries,
            fallback_timestamps: self.fallback_timestamps,
            grammars: self.grammars.ranked(None),
            status_codes: self.status_codes.ranked(None),
            methods: self.methods.ranked(None),
            top_pages: self.pages.ranked(Some(TOP_PAGES_LIMIT)),
            top_ips: self.ips.ranked(Some(TOP_IPS_LIMIT)),
            errors: self.errors.ranked(Some(TOP_ERRORS_LIMIT)),
            user_agents: self.user_agents.ranked(Some(TOP_USER_AGENTS_LIMIT)),
            referers: self.referers.ranked(Some(TOP_REFERERS_LIMIT)),
            hourly_stats: self.hourly,
            daily_stats: self.daily,
            analysis_period: match self.window {
                Some((start, end)) => AnalysisPeriod::between(start, end),
                None => AnalysisPeriod::empty(),
            },
        }
    }
}

// "-" is what servers write for a missing referer or agent
fn is_present(value: &str) -> bool {
    !value.is_empty() && value != "-" && value != UNKNOWN
}

/// One pass over the run, in line order
pub fn aggregate(run: &AnalysisRun, options: &AnalyzeOptions) -> Stats {
    let mut aggregator = Aggregator::new(options);
    for entry in &run.entries {
        aggregator.observe(entry);
    }
    aggregator.finish(&run.source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_of(lines: &[&str]) -> AnalysisRun {
        AnalysisRun::from_lines("test.log", lines.iter().copied())
    }

    fn combined(ip: &str, path: &str, status: &str, ua: &str) -> String {
        format!(
            r#"{} - - [08/Feb/2024:10:30:00 +0000] "GET {} HTTP/1.1" {} 100 "-" "{}""#,
            ip, path, status, ua
        )
    }

    #[test]
    fn test_ranking_ties_by_first_seen() {
        let mut counter = FrequencyCounter::new();
        for key in ["b", "a", "c", "a", "c", "d"] {
            counter.add(key);
        }
        let table = counter.ranked(None);
        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_ranking_cap() {
        let mut counter = FrequencyCounter::new();
        for i in 0..30 {
            counter.add(&format!("k{}", i));
        }
        let table = counter.ranked(Some(TOP_PAGES_LIMIT));
        assert_eq!(table.len(), 20);
        assert_eq!(table.top(), Some(("k0", 1)));
    }

    #[test]
    fn test_empty_run() {
        let stats = aggregate(&run_of(&[]), &AnalyzeOptions::default());
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.unique_ips, 0);
        assert!(stats.top_pages.is_empty());
        assert!(stats.user_agents.is_empty());
        assert_eq!(stats.analysis_period.start, None);
        assert_eq!(stats.analysis_period.end, None);
        assert_eq!(stats.analysis_period.duration_seconds, 0);
        assert_eq!(stats.hourly_stats.len(), 24);
    }

    #[test]
    fn test_static_excluded_from_pages() {
        let lines = [
            combined("1.1.1.1", "/static/app.js", "200", "Mozilla/5.0"),
            combined("1.1.1.1", "/index", "200", "Mozilla/5.0"),
            combined("1.1.1.1", "/style.css", "200", "Mozilla/5.0"),
        ];
        let run = AnalysisRun::from_lines("t", lines.iter());
        let stats = aggregate(&run, &AnalyzeOptions::default());
        assert_eq!(stats.static_requests, 2);
        assert_eq!(stats.top_pages.len(), 1);
        assert_eq!(stats.top_pages.get("/index"), Some(1));
    }

    #[test]
    fn test_error_keys_and_classification() {
        let lines = [
            combined("1.1.1.1", "/missing?x=1", "404", "Googlebot/2.1"),
            combined("2.2.2.2", "/missing", "404", "Mozilla/5.0"),
            combined("2.2.2.2", "/admin/panel", "500", "Mozilla/5.0"),
            combined("3.3.3.3", "/", "302", "Mozilla/5.0"),
        ];
        let run = AnalysisRun::from_lines("t", lines.iter());
        let stats = aggregate(&run, &AnalyzeOptions::default());

        assert_eq!(stats.errors.top(), Some(("404 /missing", 2)));
        assert_eq!(stats.errors.get("500 /admin/panel"), Some(1));
        assert_eq!(stats.errors.get("302 /"), None);
        assert_eq!(stats.bot_requests, 1);
        assert_eq!(stats.admin_requests, 1);
        assert_eq!(stats.unique_ips, 3);
        assert_eq!(stats.error_requests(), 3);
        assert_eq!(stats.top_ips.top(), Some(("2.2.2.2", 2)));
    }

    #[test]
    fn test_time_buckets_and_window() {
        let lines = [
            r#"1.1.1.1 - - [08/Feb/2024:09:15:00 +0000] "GET / HTTP/1.1" 200 1"#,
            r#"1.1.1.1 - - [09/Feb/2024:11:45:30 +0900] "GET / HTTP/1.1" 200 1"#,
        ];
        let stats = aggregate(&run_of(&lines), &AnalyzeOptions::default());
        assert_eq!(stats.hourly_stats["09"], 1);
        assert_eq!(stats.hourly_stats["11"], 1);
        assert_eq!(stats.hourly_stats["00"], 0);
        assert_eq!(stats.daily_stats["2024-02-08"], 1);
        assert_eq!(stats.daily_stats["2024-02-09"], 1);
        assert_eq!(stats.analysis_period.duration_seconds, 95_430);
        assert_eq!(stats.analysis_period.duration, "1 day, 2:30:30");
    }

    #[test]
    fn test_fallback_timestamps_can_be_excluded() {
        let lines = [
            r#"1.1.1.1 - - [08/Feb/2024:09:15:00 +0000] "GET / HTTP/1.1" 200 1"#,
            "garbage line from 5.5.5.5",
        ];
        let options = AnalyzeOptions {
            exclude_fallback_timestamps: true,
            ..Default::default()
        };
        let stats = aggregate(&run_of(&lines), &options);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.fallback_entries, 1);
        assert_eq!(stats.fallback_timestamps, 1);
        assert_eq!(stats.daily_stats.len(), 1);
        assert_eq!(stats.analysis_period.duration_seconds, 0);
        assert!(stats.analysis_period.start.is_some());
    }

    #[test]
    fn test_missing_agent_and_referer_not_counted() {
        let lines = [r#"1.1.1.1 - - [08/Feb/2024:09:15:00 +0000] "GET / HTTP/1.1" 200 1 "-" "-""#];
        let stats = aggregate(&run_of(&lines), &AnalyzeOptions::default());
        assert!(stats.user_agents.is_empty());
        assert!(stats.referers.is_empty());
    }

    #[test]
    fn test_table_serializes_in_rank_order() {
        let mut counter = FrequencyCounter::new();
        counter.add("zeta");
        counter.add("alpha");
        counter.add("alpha");
        let json = serde_json::to_string(&counter.ranked(None)).unwrap();
        assert_eq!(json, r#"{"alpha":2,"zeta":1}"#);

        let back: FrequencyTable = serde_json::from_str(r#"{"zeta":1,"alpha":2}"#).unwrap();
        assert_eq!(back.top(), Some(("zeta", 1)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00:00");
        assert_eq!(format_duration(3_725), "1:02:05");
        assert_eq!(format_duration(2 * 86_400 + 5), "2 days, 0:00:05");
    }
}
