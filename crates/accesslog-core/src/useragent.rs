//! User-agent decomposition into browser and OS labels

use crate::stats::{FrequencyCounter, FrequencyTable};
use crate::UNKNOWN;
use once_cell::sync::Lazy;
use regex::Regex;

pub const BREAKDOWN_LIMIT: usize = 10;

static WINDOWS_NT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"windows nt (\d+\.\d+)").expect("windows version pattern"));
static MAC_OS_X: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"mac os x (\d+)[_.](\d+)(?:[_.](\d+))?").expect("macos version pattern")
});
static ANDROID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"android (\d+(?:\.\d+)?)").expect("android version pattern"));
// whole tokens only, "kiosk" or "studios" must not count
static IOS_PLATFORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:iphone|ipad|ipod)\b|\bcpu (?:iphone )?os \d|\bios\b")
        .expect("ios platform pattern")
});
static IOS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"os (\d+)_(\d+)(?:_(\d+))?").expect("ios version pattern"));

// Checked in order, first hit wins. Edge and Opera also say "Chrome", Chrome also says "Safari".
const BROWSERS: &[(&str, &[&str])] = &[
    ("Edge", &["edg/", "edge/"]),
    ("Opera", &["opr/", "opera"]),
    ("Firefox", &["firefox"]),
    ("Chrome", &["chrome"]),
    ("Safari", &["safari"]),
    ("Internet Explorer", &["msie", "trident"]),
];

fn is_blank(user_agent: &str) -> bool {
    user_agent.is_empty() || user_agent == UNKNOWN
}

pub fn parse_browser(user_agent: &str) -> &'static str {
    if is_blank(user_agent) {
        return "Unknown";
    }
    let ua = user_agent.to_lowercase();
    BROWSERS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| ua.contains(kw)))
        .map(|(name, _)| *name)
        .unwrap_or("Other")
}

/// OS label with version where one can be extracted.
/// Mobile platforms go first: Android agents also say "Linux", iOS agents say "like Mac OS X".
pub fn parse_os(user_agent: &str) -> String {
    if is_blank(user_agent) {
        return "Unknown".to_string();
    }
    let ua = user_agent.to_lowercase();

    if ua.contains("android") {
        android_label(&ua)
    } else if IOS_PLATFORM.is_match(&ua) {
        ios_label(&ua)
    } else if ua.contains("windows") {
        windows_label(&ua).to_string()
    } else if ua.contains("macintosh") || ua.contains("mac os") {
        macos_label(&ua)
    } else if ua.contains("linux") {
        linux_label(&ua).to_string()
    } else {
        "Other".to_string()
    }
}

fn windows_label(ua: &str) -> &'static str {
    let version = WINDOWS_NT
        .captures(ua)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    match version {
        Some("10.0") => "Windows 10/11",
        Some("6.3") => "Windows 8.1",
        Some("6.2") => "Windows 8",
        Some("6.1") => "Windows 7",
        Some("6.0") => "Windows Vista",
        Some("5.1") => "Windows XP",
        _ => "Windows (Other)",
    }
}

fn macos_label(ua: &str) -> String {
    let Some(caps) = MAC_OS_X.captures(ua) else {
        return "macOS (Version Unknown)".to_string();
    };
    let major: u32 = caps[1].parse().unwrap_or(0);
    let minor: u32 = caps[2].parse().unwrap_or(0);
    let version = match caps.get(3) {
        Some(patch) => format!("{}.{}.{}", major, minor, patch.as_str()),
        None => format!("{}.{}", major, minor),
    };

    if major != 10 {
        return format!("macOS {}", version);
    }
    let codename = match minor {
        m if m >= 15 => Some("Catalina"),
        14 => Some("Mojave"),
        13 => Some("High Sierra"),
        12 => Some("Sierra"),
        11 => Some("El Capitan"),
        _ => None,
    };
    match codename {
        Some(name) => format!("macOS {} ({})", name, version),
        None => format!("macOS ({})", version),
    }
}

fn linux_label(ua: &str) -> &'static str {
    const DISTROS: &[(&str, &str)] = &[
        ("ubuntu", "Ubuntu Linux"),
        ("fedora", "Fedora Linux"),
        ("centos", "CentOS Linux"),
        ("debian", "Debian Linux"),
    ];
    DISTROS
        .iter()
        .find(|(kw, _)| ua.contains(kw))
        .map(|(_, label)| *label)
        .unwrap_or("Linux")
}

fn android_label(ua: &str) -> String {
    match ANDROID.captures(ua) {
        Some(caps) => format!("Android {}", &caps[1]),
        None => "Android".to_string(),
    }
}

fn ios_label(ua: &str) -> String {
    let device = if ua.contains("ipad") { "iPad" } else { "iPhone" };
    match IOS.captures(ua) {
        Some(caps) => {
            let version = match caps.get(3) {
                Some(patch) => format!("{}.{}.{}", &caps[1], &caps[2], patch.as_str()),
                None => format!("{}.{}", &caps[1], &caps[2]),
            };
            format!("iOS {} ({})", version, device)
        }
        None => format!("iOS ({})", device),
    }
}

fn breakdown(user_agents: &FrequencyTable, label: impl Fn(&str) -> String) -> FrequencyTable {
    let mut counter = FrequencyCounter::new();
    for (ua, count) in user_agents.iter() {
        counter.add_n(&label(ua), count);
    }
    counter.ranked(Some(BREAKDOWN_LIMIT))
}

/// Browser counts over the (capped) user-agent table, reusing its request counts
pub fn browser_breakdown(user_agents: &FrequencyTable) -> FrequencyTable {
    breakdown(user_agents, |ua| parse_browser(ua).to_string())
}

pub fn os_breakdown(user_agents: &FrequencyTable) -> FrequencyTable {
    breakdown(user_agents, parse_os)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const FIREFOX_UBUNTU: &str = "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    #[test]
    fn test_browser_priority() {
        assert_eq!(parse_browser(EDGE_WIN), "Edge");
        assert_eq!(parse_browser(CHROME_WIN), "Chrome");
        assert_eq!(parse_browser(SAFARI_MAC), "Safari");
        assert_eq!(parse_browser(FIREFOX_UBUNTU), "Firefox");
        assert_eq!(
            parse_browser("Mozilla/5.0 (Windows NT 10.0) Chrome/119.0 Safari/537.36 OPR/105.0"),
            "Opera"
        );
        assert_eq!(
            parse_browser("Mozilla/5.0 (Windows NT 6.1; Trident/7.0; rv:11.0) like Gecko"),
            "Internet Explorer"
        );
        assert_eq!(parse_browser("curl/8.4.0"), "Other");
        assert_eq!(parse_browser(""), "Unknown");
        assert_eq!(parse_browser("unknown"), "Unknown");
    }

    #[test]
    fn test_os_labels() {
        assert_eq!(parse_os(CHROME_WIN), "Windows 10/11");
        assert_eq!(parse_os("Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1)"), "Windows 7");
        assert_eq!(parse_os("Mozilla/5.0 (Windows 98)"), "Windows (Other)");
        assert_eq!(
            parse_os("Mozilla/5.0 (Windows NT 10.0; Win64; x64; SiteKiosk 9.9 Build 5678) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
            "Windows 10/11"
        );
        assert_eq!(parse_os("Mozilla/5.0 (X11; Linux x86_64) Studios/2.0"), "Linux");
        assert_eq!(parse_os(SAFARI_MAC), "macOS Catalina (10.15.7)");
        assert_eq!(parse_os("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14)"), "macOS Mojave (10.14)");
        assert_eq!(parse_os("Mozilla/5.0 (Macintosh; PPC)"), "macOS (Version Unknown)");
        assert_eq!(parse_os(SAFARI_IPHONE), "iOS 17.2 (iPhone)");
        assert_eq!(parse_os(CHROME_ANDROID), "Android 13");
        assert_eq!(parse_os(FIREFOX_UBUNTU), "Ubuntu Linux");
        assert_eq!(parse_os("Mozilla/5.0 (X11; Linux x86_64)"), "Linux");
        assert_eq!(parse_os("curl/8.4.0"), "Other");
        assert_eq!(parse_os("unknown"), "Unknown");
    }

    #[test]
    fn test_ipad_device() {
        let ua = "Mozilla/5.0 (iPad; CPU OS 16_6_1 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(parse_os(ua), "iOS 16.6.1 (iPad)");
        assert_eq!(parse_os("MyApp/3.1 (iOS 17.0)"), "iOS (iPhone)");
    }

    #[test]
    fn test_breakdown_reuses_counts() {
        let mut counter = FrequencyCounter::new();
        counter.add_n(CHROME_WIN, 5);
        counter.add_n(EDGE_WIN, 3);
        counter.add_n(CHROME_ANDROID, 4);
        let agents = counter.ranked(None);

        let browsers = browser_breakdown(&agents);
        assert_eq!(browsers.get("Chrome"), Some(9));
        assert_eq!(browsers.get("Edge"), Some(3));
        assert_eq!(browsers.total(), agents.total());

        let systems = os_breakdown(&agents);
        assert_eq!(systems.top(), Some(("Windows 10/11", 8)));
        assert_eq!(systems.get("Android 13"), Some(4));
    }
}
