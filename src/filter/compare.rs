//! Type-aware value comparison for filter evaluation.
//!
//! Coercion rules:
//!
//! - a numeric-looking string compares numerically against a number,
//! - two date-like values (a `DateTime`, or a string in RFC 3339,
//!   `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` form) compare as timestamps,
//! - anything else uses exact equality.
//!
//! Ordering is only defined for numbers and dates. [`order`] returns `None`
//! for any other pair and the evaluator turns that into a filter error.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::data::DataValue;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a date-like string into a UTC timestamp.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    // Every supported form starts with YYYY-MM-DD.
    if s.len() < 10 || s.as_bytes()[4] != b'-' {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn as_timestamp(value: &DataValue) -> Option<DateTime<Utc>> {
    match value {
        DataValue::DateTime(dt) => Some(*dt),
        DataValue::String(s) => parse_datetime(s),
        _ => None,
    }
}

fn as_number(value: &DataValue) -> Option<f64> {
    match value {
        DataValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        other => other.as_f64(),
    }
}

/// Both sides as numbers, provided at least one of them is a real number.
fn numeric_pair(a: &DataValue, b: &DataValue) -> Option<(f64, f64)> {
    if !(a.is_number() || b.is_number()) {
        return None;
    }
    Some((as_number(a)?, as_number(b)?))
}

/// Equality with numeric and date coercion.
pub fn values_equal(a: &DataValue, b: &DataValue) -> bool {
    if let (DataValue::Int64(x), DataValue::Int64(y)) = (a, b) {
        return x == y;
    }
    if let Some((x, y)) = numeric_pair(a, b) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (as_timestamp(a), as_timestamp(b)) {
        return x == y;
    }
    if let (DataValue::List(xs), DataValue::List(ys)) = (a, b) {
        return xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y));
    }
    a == b
}

/// Order two values, or `None` if they are not both numeric or both dates.
pub fn order(a: &DataValue, b: &DataValue) -> Option<Ordering> {
    if let (DataValue::Int64(x), DataValue::Int64(y)) = (a, b) {
        return Some(x.cmp(y));
    }
    if let Some((x, y)) = numeric_pair(a, b) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (as_timestamp(a), as_timestamp(b)) {
        return Some(x.cmp(&y));
    }
    None
}

/// Short type name used in error messages.
pub fn type_name(value: &DataValue) -> &'static str {
    match value {
        DataValue::Null => "null",
        DataValue::Bool(_) => "bool",
        DataValue::Int64(_) => "integer",
        DataValue::Float64(_) => "float",
        DataValue::String(_) => "string",
        DataValue::DateTime(_) => "datetime",
        DataValue::List(_) => "list",
    }
}
