//! Traffic classification predicates shared by the aggregator.
//! All matching is case-insensitive; empty and "unknown" inputs are never classified.

use crate::UNKNOWN;

/// Crawler tokens, vendor bots and HTTP client libraries
pub const BOT_KEYWORDS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "scraper",
    "wget",
    "curl",
    "googlebot",
    "bingbot",
    "slurp",
    "facebookexternalhit",
    "twitterbot",
    "linkedinbot",
    "whatsapp",
    "telegram",
    "python-requests",
    "java/",
    "okhttp",
    "apache-httpclient",
];

pub const ADMIN_PATHS: &[&str] = &[
    "/admin",
    "/management-panel",
    "/wp-admin",
    "/administrator",
    "/login",
    "/auth",
    "/dashboard",
    "/panel",
];

pub const STATIC_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".woff", ".woff2", ".ttf",
    ".eot", ".pdf", ".zip", ".txt", ".xml", ".json", ".map", ".webp", ".mp3", ".mp4", ".avi",
];

fn classifiable(value: &str) -> Option<String> {
    if value.is_empty() || value == UNKNOWN {
        None
    } else {
        Some(value.to_lowercase())
    }
}

pub fn is_bot(user_agent: &str) -> bool {
    classifiable(user_agent)
        .map(|ua| BOT_KEYWORDS.iter().any(|kw| ua.contains(kw)))
        .unwrap_or(false)
}

// substring, so "/admin" also catches "/api/admin/..."
pub fn is_admin_path(path: &str) -> bool {
    classifiable(path)
        .map(|p| ADMIN_PATHS.iter().any(|prefix| p.contains(prefix)))
        .unwrap_or(false)
}

pub fn is_static(path: &str) -> bool {
    classifiable(path)
        .map(|p| STATIC_EXTENSIONS.iter().any(|ext| p.ends_with(ext)) || p.contains("/static/"))
        .unwrap_or(false)
}
