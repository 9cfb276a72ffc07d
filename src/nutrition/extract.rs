use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"[-+]?(?:\d+(?:[.,]\d+)?|[.,]\d+)").unwrap();
}

/// Best-effort magnitude of the first numeral in `text`.
///
/// `"250 kcal"` gives `250.0`, `"12,5 g"` gives `12.5`, anything without
/// digits gives `0.0`. Negative values pass through unchanged and numerals
/// too large for an `f64` saturate to `f64::MAX`.
pub fn extract_number(text: &str) -> f64 {
    NUMBER_RE
        .find(text)
        .map(|m| m.as_str().replace(',', "."))
        .and_then(|s| s.parse::<f64>().ok())
        .map(|v| if v.is_infinite() { f64::MAX.copysign(v) } else { v })
        .unwrap_or(0.0)
}

/// Nutrient amounts are never negative.
pub fn extract_magnitude(text: &str) -> f64 {
    extract_number(text).max(0.0)
}
