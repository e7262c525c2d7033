//! Column cleaning functions.
//!
//! Every function here is total: malformed input yields `None` (or a fallback
//! bucket), never a panic.

use super::Sentiment;
use once_cell::sync::Lazy;
use regex::Regex;

/// Currency glyph stripped from price columns
pub const CURRENCY_GLYPH: char = '₹';

const GROUPING_SEPARATOR: char = ',';
const CATEGORY_SEPARATOR: char = '|';

static RATING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(\.\d+)?").expect("rating pattern is valid"));

/// Parse a finite float, rejecting `inf`/`NaN` spellings that `str::parse` accepts.
fn parse_finite(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `"₹1,099.00"` → `1099.0`
pub fn parse_currency(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| *c != CURRENCY_GLYPH && *c != GROUPING_SEPARATOR)
        .collect();
    parse_finite(&cleaned)
}

/// `"64%"` → `64.0`
pub fn parse_percent(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    parse_finite(trimmed.strip_suffix('%').unwrap_or(trimmed))
}

/// First number embedded in free text: `"4.2 out of 5 stars"` → `4.2`
pub fn parse_rating(s: &str) -> Option<f64> {
    RATING_PATTERN
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// `"24,269"` → `24269`
pub fn parse_count(s: &str) -> Option<i64> {
    let cleaned: String = s.chars().filter(|c| *c != GROUPING_SEPARATOR).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// `"Electronics|Mobiles|Smartphones"` → `"Electronics"`
pub fn top_level_category(s: &str) -> String {
    s.split(CATEGORY_SEPARATOR).next().unwrap_or(s).trim().to_string()
}

/// Bucket a rating; ties at 4.0 and 3.0 go to the higher bucket.
pub fn classify_sentiment(rating: Option<f64>) -> Sentiment {
    match rating {
        None => Sentiment::Unrated,
        Some(r) if r.is_nan() => Sentiment::Unrated,
        Some(r) if r >= 4.0 => Sentiment::Positive,
        Some(r) if r >= 3.0 => Sentiment::Neutral,
        Some(_) => Sentiment::Negative,
    }
}
