//! Value coercion from raw cells to typed values
//!
//! Every function maps a [`RawValue`] to `Ok(None)` for an empty cell,
//! `Ok(Some(_))` on success and `Err(Rejected)` when the cell carries a token
//! that cannot be read as the target type.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::ops::RangeInclusive;
use std::fmt;

use crate::core::source::RawValue;
use crate::domain::Geocode;

/// Raw token that failed coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected(pub String);

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.0)
    }
}

pub type Coerced<T> = Result<Option<T>, Rejected>;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];
/// Legacy exports write day first; month-first is never attempted
const LEGACY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Years accepted in any date field
const DATE_YEARS: RangeInclusive<i32> = 1900..=2100;

fn reject(value: &RawValue) -> Rejected {
    Rejected(value.to_string())
}

pub fn date(value: &RawValue) -> Coerced<NaiveDate> {
    let parsed = match value {
        RawValue::Null => return Ok(None),
        RawValue::Date(d) => Some(*d),
        RawValue::Int(i) => parse_date(&i.to_string()),
        RawValue::Text(s) => parse_date(s),
        RawValue::Float(_) | RawValue::Bool(_) => None,
    };
    parsed
        .filter(|d| DATE_YEARS.contains(&d.year()))
        .map(Some)
        .ok_or_else(|| reject(value))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(text, LEGACY_DATE_FORMAT).ok())
}

/// Integer, accepting floats and numeric text without a fractional part
pub fn integer(value: &RawValue) -> Coerced<i64> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Int(i) => Ok(Some(*i)),
        RawValue::Float(f) => integral(*f).map(Some).ok_or_else(|| reject(value)),
        RawValue::Text(s) => parse_integer(s).map(Some).ok_or_else(|| reject(value)),
        RawValue::Date(_) | RawValue::Bool(_) => Err(reject(value)),
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(integral))
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn int32(value: &RawValue) -> Coerced<i32> {
    match integer(value)? {
        None => Ok(None),
        Some(v) => i32::try_from(v).map(Some).map_err(|_| reject(value)),
    }
}

/// Notification number; legacy tokens carry `,` `'` or `.` separators
pub fn notification_number(value: &RawValue) -> Coerced<i64> {
    match value {
        RawValue::Text(s) => {
            if let Some(v) = parse_integer(s) {
                return Ok(Some(v));
            }
            let cleaned: String = s.chars().filter(|c| !matches!(c, ',' | '\'' | '.')).collect();
            cleaned
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| reject(value))
        }
        other => integer(other),
    }
}

/// IBGE geocode, completing six digit codes with their verifier
pub fn geocode(value: &RawValue) -> Coerced<Geocode> {
    match integer(value)? {
        None => Ok(None),
        Some(v) => Geocode::parse(&v.to_string())
            .map(Some)
            .map_err(|_| reject(value)),
    }
}

/// Epidemiological week: the last two digits (`202405` is week 5)
pub fn epiweek(value: &RawValue) -> Coerced<i32> {
    match integer(value)? {
        None => Ok(None),
        Some(v) => {
            let week = (v.unsigned_abs() % 100) as i32;
            if (1..=53).contains(&week) {
                Ok(Some(week))
            } else {
                Err(reject(value))
            }
        }
    }
}

/// `M` or `F`, anything else is `I` (ignored)
pub fn sex(value: &RawValue) -> String {
    match value {
        RawValue::Text(s) => match s.trim().to_uppercase().as_str() {
            "M" => "M".to_string(),
            "F" => "F".to_string(),
            _ => "I".to_string(),
        },
        _ => "I".to_string(),
    }
}

pub fn text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => None,
        other => {
            let s = other.to_string();
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}
