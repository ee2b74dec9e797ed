//! Column classification.
//!
//! Attribute tables exported by GeoServer are loosely typed: numbers often
//! arrive as strings and dates as ISO strings. Values are therefore judged
//! the way a browser would, with a lenient leading-number parse.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Date,
    Categorical,
    Unknown,
}

/// Classify a column from its first non-null value.
///
/// ISO dates (`YYYY-MM-DD...`) are recognised before numbers, since their
/// leading year would otherwise parse as a number.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Value>,
{
    let Some(sample) = values.into_iter().find(|v| !v.is_null()) else {
        return ColumnType::Unknown;
    };

    match sample {
        Value::Number(_) => ColumnType::Numeric,
        Value::String(s) if is_iso_date(s) => ColumnType::Date,
        Value::String(s) if parse_float_prefix(s).is_some() => ColumnType::Numeric,
        _ => ColumnType::Categorical,
    }
}

/// Numeric reading of a cell, if any.
///
/// Numbers are taken as is; strings yield their leading decimal number
/// (`"12.5 ha"` is 12.5). Everything else is not a number.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

/// Longest leading decimal number of `s`, after leading whitespace.
///
/// Accepts an optional sign, digits with an optional fraction and an
/// optional exponent. Returns `None` when no digit is found.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();

    let digits_while = |mut pos: usize| {
        while pos < len && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        pos
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_while(end);
    let mut digits = int_end - end;
    end = int_end;

    if end < len && bytes[end] == b'.' {
        let frac_end = digits_while(end + 1);
        if frac_end > end + 1 {
            digits += frac_end - end - 1;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < len && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        let exp_end = digits_while(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether `s` starts with a valid `YYYY-MM-DD` calendar date.
pub fn is_iso_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 10 {
        return false;
    }

    let shape_ok = bytes[..10].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });

    shape_ok && NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").is_ok()
}

/// Identifier and geometry columns carry no information worth charting.
pub fn is_technical_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("geom")
        || lower.contains("id")
        || lower.contains("_uid")
        || lower.contains("shape")
        || lower == "fid"
}

/// `snake_case` to `Title Case`: every `_`-separated word gets an
/// uppercase first letter, the rest is kept.
pub fn format_column_name(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
