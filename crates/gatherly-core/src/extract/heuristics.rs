//! Best-effort field extraction from free text
//!
//! NLP-by-regex: keyword tables and pattern cascades that guess a title, a
//! date, and ticket types out of a user message or a rambling model reply.
//! Low-confidence by contract - callers must treat every result as a guess
//! the user can correct. Kept isolated here so it can be swapped for a real
//! structured-output model call without touching the orchestrators.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fallback title when nothing better can be inferred
pub const DEFAULT_TITLE: &str = "Special Event";

/// Domain keyword -> suggested title category.
///
/// Order matters: earlier entries win when several keywords appear.
const TITLE_KEYWORDS: &[(&str, &str)] = &[
    ("wedding", "Wedding Celebration"),
    ("birthday", "Birthday Party"),
    ("workshop", "Community Workshop"),
    ("conference", "Conference"),
    ("festival", "Festival"),
    ("fundraiser", "Fundraiser"),
    ("concert", "Concert"),
    ("picnic", "Community Picnic"),
    ("meetup", "Meetup"),
    ("fair", "Fair"),
    ("party", "Party"),
    ("class", "Class"),
];

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]([^'"]{2,80})['"]"#).expect("valid regex"));

static DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\b").expect("valid regex"));

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid regex"));

static TICKET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]+)\s+tickets?\s*(?:for|at|:|-)?\s*\$\s*(\d+(?:\.\d{1,2})?)")
        .expect("valid regex")
});

/// Does the text mention any event-domain keyword at all?
pub fn mentions_event_domain(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("event") || TITLE_KEYWORDS.iter().any(|(kw, _)| lower.contains(kw))
}

/// Infer an event title.
///
/// A quoted phrase wins; otherwise the first matching domain keyword's
/// category; otherwise [`DEFAULT_TITLE`].
pub fn infer_title(text: &str) -> String {
    if let Some(capture) = QUOTED_RE.captures(text) {
        let quoted = capture[1].trim();
        if !quoted.is_empty() {
            return quoted.to_string();
        }
    }

    let lower = text.to_lowercase();
    for (keyword, title) in TITLE_KEYWORDS {
        if lower.contains(keyword) {
            return (*title).to_string();
        }
    }

    DEFAULT_TITLE.to_string()
}

/// Infer an ISO-8601 date (`YYYY-MM-DD`) from month-name and day-ordinal
/// patterns. Returns None when no month name is present.
pub fn infer_date(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let (month_pos, month) = MONTHS
        .iter()
        .filter_map(|(name, number)| lower.find(name).map(|pos| (pos, *number)))
        .min_by_key(|(pos, _)| *pos)?;

    // Prefer a day number after the month mention ("march 3rd"), then fall
    // back to anywhere in the text ("the 3rd of march")
    let find_day = |haystack: &str| {
        DAY_RE
            .captures_iter(haystack)
            .filter_map(|c| c[1].parse::<u32>().ok())
            .find(|d| (1..=31).contains(d))
    };
    let day = find_day(&lower[month_pos..]).or_else(|| find_day(&lower))?;

    let year = YEAR_RE
        .captures(&lower)
        .and_then(|c| c[1].parse::<i32>().ok())
        .unwrap_or_else(|| {
            use chrono::Datelike;
            chrono::Utc::now().year()
        });

    chrono::NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Infer ticket types and prices, e.g. "child tickets for $15".
///
/// Deduplicates by case-insensitive name, first mention wins.
pub fn infer_tickets(text: &str) -> Vec<(String, f64)> {
    let mut tickets: Vec<(String, f64)> = Vec::new();
    for capture in TICKET_RE.captures_iter(text) {
        let name = capture[1].to_lowercase();
        let Ok(price) = capture[2].parse::<f64>() else {
            continue;
        };
        if !tickets.iter().any(|(existing, _)| *existing == name) {
            tickets.push((name, price));
        }
    }
    tickets
}
