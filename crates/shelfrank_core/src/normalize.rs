//! Field coercion for messy reading-history exports.
//!
//! # Responsibility
//! - Coerce raw CSV cell text into typed nullable values.
//! - Absorb locale noise: thousands separators, floats-as-integers, blank
//!   and "nan" markers from spreadsheet round-trips.
//!
//! # Invariants
//! - Every function is total: parse failure yields `None`, never an error.
//! - A coerced integer of exactly 0 means "unknown", not a real zero.

use chrono::NaiveDate;

/// Date patterns accepted for `Date Read`, tried in order; first match wins.
const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%m/%d/%Y"];

/// Coerces raw text into a nullable integer.
///
/// Accepts plain integers, floats with a fractional part ("384.0"), and
/// thousands-separated values ("1,024"). Blank, "nan", unparsable, and
/// exactly-zero inputs all coerce to `None`.
pub fn to_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }

    let cleaned = trimmed.replace(',', "");
    let value = cleaned.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }

    // Truncate toward zero, matching how spreadsheet exports round-trip
    // integer columns through floats.
    let value = value.trunc() as i64;
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

/// Coerces raw text into a nullable star rating.
///
/// Importer convention: 0 means "not rated" and becomes `None`. Values that
/// parse as a number but fall outside 1..=5 are treated as invalid and also
/// become `None`.
pub fn to_rating(raw: &str) -> Option<i64> {
    to_int(raw).filter(|value| (1..=5).contains(value))
}

/// Coerces raw text into a nullable calendar date.
///
/// Tries `YYYY/MM/DD`, `YYYY-MM-DD`, then `MM/DD/YYYY`; returns `None` when
/// no pattern matches or the source is blank.
pub fn to_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Trims raw text; empty after trim is treated as absent.
pub fn clean_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
