//! Report builder: summary, highlights, recommendation rules and UA breakdowns

use crate::stats::{AnalysisPeriod, FrequencyTable, Stats};
use crate::useragent::{browser_breakdown, os_breakdown};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HIGH_ERROR_RATE_PERCENT: f64 = 10.0;
pub const NOT_FOUND_SHARE: f64 = 0.05;
pub const TOP_IP_SHARE: f64 = 0.3;
pub const BUSY_SITE_REQUESTS: u64 = 1000;
pub const POPULAR_PAGES_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub title: String,
    pub message: String,
}

impl Recommendation {
    fn new(kind: RecommendationKind, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_requests: u64,
    pub unique_visitors: u64,
    pub bot_requests: u64,
    pub admin_requests: u64,
    pub static_requests: u64,
    pub error_rate: f64, // percent, two decimals
    pub analysis_period: AnalysisPeriod,
    pub log_file: String,
}

/// (key, count) of the first row of a ranked table
pub type Highlight = Option<(String, u64)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    pub top_page: Highlight,
    pub top_ip: Highlight,
    pub top_error: Highlight,
}

/// Built once from a stats snapshot and never changed afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    pub highlights: Highlights,
    pub detailed_stats: Stats,
    pub recommendations: Vec<Recommendation>,
    pub hourly_traffic: BTreeMap<String, u64>,
    pub daily_traffic: BTreeMap<String, u64>,
    pub popular_pages: FrequencyTable,
    pub status_codes: FrequencyTable,
    pub browsers: FrequencyTable,
    pub operating_systems: FrequencyTable,
}

/// Percentage of 4xx/5xx requests, 0 for an empty run
pub fn error_rate(stats: &Stats) -> f64 {
    if stats.total_requests == 0 {
        return 0.0;
    }
    stats.error_requests() as f64 * 100.0 / stats.total_requests as f64
}

fn highlight(table: &FrequencyTable) -> Highlight {
    table.top().map(|(key, count)| (key.to_string(), count))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rules fire independently and in this order. The all-clear note only appears alone.
pub fn recommendations(stats: &Stats) -> Vec<Recommendation> {
    let total = stats.total_requests as f64;
    let mut out = Vec::new();

    let rate = error_rate(stats);
    if rate > HIGH_ERROR_RATE_PERCENT {
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "High error rate",
            format!(
                "Error rate is {:.1}%. Investigate the causes of the 404 and 500 responses.",
                rate
            ),
        ));
    }

    let not_found: u64 = stats
        .status_codes
        .iter()
        .filter(|(status, _)| status.starts_with("404"))
        .map(|(_, count)| count)
        .sum();
    if not_found as f64 > total * NOT_FOUND_SHARE {
        out.push(Recommendation::new(
            RecommendationKind::Info,
            "Many 404 errors",
            format!(
                "{} requests returned 404. Check for broken links or changed URLs.",
                not_found
            ),
        ));
    }

    if let Some((ip, count)) = stats.top_ips.top() {
        if count as f64 > total * TOP_IP_SHARE {
            out.push(Recommendation::new(
                RecommendationKind::Warning,
                "Traffic concentration",
                format!(
                    "IP {} accounts for {:.1}% of all requests. This may be automated or bot traffic.",
                    ip,
                    count as f64 / total * 100.0
                ),
            ));
        }
    }

    if stats.total_requests > BUSY_SITE_REQUESTS {
        out.push(Recommendation::new(
            RecommendationKind::Success,
            "Active site",
            "The site is receiving steady traffic. Consider tuning caching or adding a CDN to improve performance."
                .to_string(),
        ));
    }

    if out.is_empty() {
        out.push(Recommendation::new(
            RecommendationKind::Success,
            "Operating normally",
            "No issues were found in the access log. The site is running normally.".to_string(),
        ));
    }
    out
}

pub fn build_report(stats: Stats) -> Report {
    let summary = Summary {
        total_requests: stats.total_requests,
        unique_visitors: stats.unique_ips,
        bot_requests: stats.bot_requests,
        admin_requests: stats.admin_requests,
        static_requests: stats.static_requests,
        error_rate: round2(error_rate(&stats)),
        analysis_period: stats.analysis_period.clone(),
        log_file: stats.source.clone(),
    };
    let highlights = Highlights {
        top_page: highlight(&stats.top_pages),
        top_ip: highlight(&stats.top_ips),
        top_error: highlight(&stats.errors),
    };

    Report {
        summary,
        highlights,
        recommendations: recommendations(&stats),
        hourly_traffic: stats.hourly_stats.clone(),
        daily_traffic: stats.daily_stats.clone(),
        popular_pages: stats.top_pages.head(POPULAR_PAGES_LIMIT),
        status_codes: stats.status_codes.clone(),
        browsers: browser_breakdown(&stats.user_agents),
        operating_systems: os_breakdown(&stats.user_agents),
        detailed_stats: stats,
    }
}
