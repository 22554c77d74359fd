//! Normalization primitives
//!
//! Pure functions that turn raw extracted strings into comparable keys.
//! None of them fail: unparseable input degrades to an empty key or `None`.

use chrono::NaiveDate;

/// Words that carry no identity in an attachment name
const STOP_WORDS: &[&str] = &[
    "with", "kit", "mounted", "system", "style", "type", "series", "and", "for", "the", "a", "an",
];

/// Lowercase and strip everything that is not alphanumeric
///
/// `None` and blank input give the empty string.
pub fn normalize_serial(s: Option<&str>) -> String {
    s.map(|s| {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    })
    .unwrap_or_default()
}

/// Make/model key, same transform as serials
pub fn normalize_key(s: &str) -> String {
    normalize_serial(Some(s))
}

/// Parse `YYYY-MM-DD...` (ISO, anything after the date ignored) or `M/D/YYYY`
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(date) = parse_iso_prefix(s) {
        return Some(date);
    }

    parse_us_slash(s)
}

fn parse_iso_prefix(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10)?;
    let bytes = head.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_us_slash(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split('/');
    let month = parts.next()?;
    let day = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let valid = |p: &str, min: usize, max: usize| {
        (min..=max).contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit())
    };
    if !valid(month, 1, 2) || !valid(day, 1, 2) || !valid(year, 4, 4) {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Absolute number of days between two dates
pub fn days_difference(d1: NaiveDate, d2: NaiveDate) -> i64 {
    (d1 - d2).num_days().abs()
}

/// Parse both inputs and return their distance in days, `None` if either fails
pub fn days_between(a: Option<&str>, b: Option<&str>) -> Option<i64> {
    let a = parse_date(a?)?;
    let b = parse_date(b?)?;
    Some(days_difference(a, b))
}

/// Split an attachment name into identity-bearing tokens
///
/// Lowercases, splits on whitespace, `-`, `_`, `/` and `,`, then drops
/// one-character tokens and stop words. Order is kept, duplicates are not removed.
pub fn tokenize_name(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '/' | ','))
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}
