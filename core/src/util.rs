use chrono::{DateTime, NaiveDate};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Trim `value` and reject it if nothing is left.
pub(crate) fn require_non_blank<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{what} cannot be empty")));
    }
    Ok(trimmed)
}

/// Join the parts that are present and non-blank.
pub(crate) fn join_non_empty<'a, I>(parts: I, separator: &str) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Parse the date formats the service is known to emit.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}

/// Accept a string, number or boolean where the service is inconsistent
/// about which one it sends. `null` becomes `None`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(de::Error::custom(format!("expected a string, found {other}"))),
    }
}

/// Accept a number or a numeric string. `null` and `""` become `None`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a number, found {s:?}"))),
        other => Err(de::Error::custom(format!("expected a number, found {other}"))),
    }
}

/// Like [`lenient_f64`] for counts.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a count, found {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a count, found {s:?}"))),
        other => Err(de::Error::custom(format!("expected a count, found {other}"))),
    }
}

/// Dates in any of the formats [`parse_date`] understands.
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.as_deref().and_then(parse_date))
}

/// Deserialize a record out of a decoded JSON value.
pub(crate) fn decode<'a, T: Deserialize<'a>>(value: &'a Value, what: &str) -> Result<T> {
    T::deserialize(value).map_err(|e| ApiError::DecodeError(format!("malformed {what}: {e}")))
}

/// Render an amount with two decimals and thousands separators.
pub(crate) fn format_price(amount: f64, include_currency: bool) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    let currency = if include_currency { "£" } else { "" };
    format!("{sign}{currency}{grouped}.{fraction}")
}
