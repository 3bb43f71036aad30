//! Value-level parsers for loosely-typed source fields: ids, quantities,
//! prices, timestamps, and physical measurements.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

/// Epoch values above this are taken as milliseconds (≈ year 5138 in seconds).
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Reads a string or number as a trimmed, non-empty string.
#[must_use]
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a whole-number quantity from a number or numeric string.
///
/// Fractional values are rejected rather than rounded.
#[must_use]
pub fn parse_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .and_then(f64_to_i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Parses a monetary amount.
///
/// Accepts JSON numbers and strings such as `"1,299.99"`, `"$12.50"`, or
/// `"12.50 EUR"`. Text around the number is ignored and `,` is read as a
/// thousands separator. Ambiguous forms (`"1.299,99"`, `"1e3"`, `"1.2.3"`)
/// are rejected rather than guessed at.
#[must_use]
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => decimal_from_str(&n.to_string()),
        Value::String(s) => amount_from_text(s),
        _ => None,
    }
}

fn amount_from_text(text: &str) -> Option<Decimal> {
    let start = text.find(|c: char| c.is_ascii_digit() || c == '.' || c == '-')?;
    let end = text.rfind(|c: char| c.is_ascii_digit())? + 1;
    if end <= start {
        return None;
    }

    let core = &text[start..end];
    let (sign, digits) = match core.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", core),
    };
    if !digits
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }
    if digits.matches('.').count() > 1 {
        return None;
    }
    // "1.299,99" style decimal commas
    if digits.find('.').is_some_and(|dot| digits[dot..].contains(',')) {
        return None;
    }

    let cleaned: String = sign
        .chars()
        .chain(digits.chars().filter(|c| *c != ','))
        .collect();
    Decimal::from_str(&cleaned).ok().map(|d| d.normalize())
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
        .map(|d| d.normalize())
}

/// Extracts a trailing or leading three-letter currency code from a price
/// string such as `"12.50 EUR"` or `"USD 12.50"`.
#[must_use]
pub fn currency_in_text(text: &str) -> Option<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_digit() || c == '.' || c == ',')
        .find(|token| token.len() == 3 && token.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_ascii_uppercase)
}

/// Parses a source timestamp into UTC, truncated to whole seconds.
///
/// Accepted inputs:
/// - RFC 3339 (`2024-10-12T08:30:15Z`, `2024-10-12T10:30:15+02:00`)
/// - naive date-times with `T` or space separator, optional fraction (taken as UTC)
/// - date only (`2024-10-12`, midnight UTC)
/// - Unix epoch seconds or milliseconds, as number or numeric string
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(f64_to_i64))
            .and_then(from_epoch),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }?;
    parsed.with_nanosecond(0)
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    s.parse::<i64>().ok().and_then(from_epoch)
}

/// Truncating conversion; `None` for non-finite values and values outside
/// the `i64` range instead of saturating.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn f64_to_i64(f: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, hence the exclusive upper bound.
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw.unsigned_abs() >= EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

/// Parses a single measurement such as `"350 g"` or `"1.5kg"` into
/// `{"value": .., "unit": ..}`.
#[must_use]
pub fn parse_measurement(text: &str) -> Option<Map<String, Value>> {
    let (number, unit) = split_unit(text.trim());
    let value = number_value(number.trim())?;
    let mut out = Map::new();
    out.insert("value".to_owned(), value);
    if !unit.is_empty() {
        out.insert("unit".to_owned(), Value::String(unit.to_owned()));
    }
    Some(out)
}

/// Parses a dimension string such as `"100x50x25 mm"` or `"10 × 5 × 2cm"`
/// into `{"length", "width", "height", "unit"}`.
///
/// Returns `None` unless exactly three numeric components are present.
#[must_use]
pub fn parse_dimensions(text: &str) -> Option<Map<String, Value>> {
    let (numbers, unit) = split_unit(text.trim());
    let parts: Vec<&str> = numbers
        .split(['x', 'X', '×', '*'])
        .map(str::trim)
        .collect();
    if parts.len() != 3 {
        return None;
    }

    let mut out = Map::new();
    for (key, part) in ["length", "width", "height"].into_iter().zip(parts) {
        out.insert(key.to_owned(), number_value(part)?);
    }
    if !unit.is_empty() {
        out.insert("unit".to_owned(), Value::String(unit.to_owned()));
    }
    Some(out)
}

/// Splits a trailing alphabetic unit from a measurement string.
fn split_unit(text: &str) -> (&str, &str) {
    let unit_start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphabetic() && *c != 'x' && *c != 'X' && *c != '×')
        .last()
        .map_or(text.len(), |(i, _)| i);
    let (numbers, unit) = text.split_at(unit_start);
    (numbers.trim_end(), unit)
}

/// Emits integral values as JSON integers and everything else as floats.
fn number_value(text: &str) -> Option<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    let f = text.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn value_as_string_accepts_numbers_and_trims() {
        assert_eq!(value_as_string(&json!(42)).as_deref(), Some("42"));
        assert_eq!(value_as_string(&json!("  A1 ")).as_deref(), Some("A1"));
        assert!(value_as_string(&json!("   ")).is_none());
        assert!(value_as_string(&json!(null)).is_none());
    }

    #[test]
    fn parse_quantity_variants() {
        assert_eq!(parse_quantity(&json!(5)), Some(5));
        assert_eq!(parse_quantity(&json!(5.0)), Some(5));
        assert_eq!(parse_quantity(&json!("12")), Some(12));
        assert_eq!(parse_quantity(&json!(-3)), Some(-3));
        assert!(parse_quantity(&json!(2.5)).is_none());
        assert!(parse_quantity(&json!(true)).is_none());
    }

    #[test]
    fn parse_amount_from_number() {
        assert_eq!(parse_amount(&json!(99.99)), Some(Decimal::new(9999, 2)));
        assert_eq!(parse_amount(&json!(10)), Some(Decimal::new(10, 0)));
    }

    #[test]
    fn parse_amount_strips_symbols_and_separators() {
        assert_eq!(parse_amount(&json!("$1,299.99")), Some(Decimal::new(129_999, 2)));
        assert_eq!(parse_amount(&json!("12.50 EUR")), Some(Decimal::new(125, 1)));
    }

    #[test]
    fn parse_amount_rejects_ambiguous_text() {
        assert!(parse_amount(&json!("1.299,99")).is_none());
        assert!(parse_amount(&json!("1e3")).is_none());
        assert!(parse_amount(&json!("1.2.3")).is_none());
        assert!(parse_amount(&json!("12 - 15")).is_none());
    }

    #[test]
    fn parse_amount_keeps_leading_sign() {
        assert_eq!(parse_amount(&json!("-4.50")), Some(Decimal::new(-45, 1)));
    }

    #[test]
    fn parse_amount_rejects_non_numeric() {
        assert!(parse_amount(&json!("free")).is_none());
        assert!(parse_amount(&json!(null)).is_none());
    }

    #[test]
    fn currency_in_text_finds_code() {
        assert_eq!(currency_in_text("12.50 eur").as_deref(), Some("EUR"));
        assert_eq!(currency_in_text("USD 9.99").as_deref(), Some("USD"));
        assert!(currency_in_text("$9.99").is_none());
    }

    #[test]
    fn parse_timestamp_rfc3339_with_offset() {
        let ts = parse_timestamp(&json!("2024-10-12T10:30:15+02:00")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 10, 12, 8, 30, 15).unwrap());
    }

    #[test]
    fn parse_timestamp_naive_forms_are_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 10, 12, 8, 30, 15).unwrap();
        assert_eq!(parse_timestamp(&json!("2024-10-12T08:30:15")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-10-12 08:30:15.250")), Some(expected));
    }

    #[test]
    fn parse_timestamp_date_only_is_midnight() {
        let ts = parse_timestamp(&json!("2024-10-12")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 10, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_timestamp_epoch_seconds_and_millis() {
        let expected = Utc.with_ymd_and_hms(2024, 10, 12, 8, 30, 15).unwrap();
        assert_eq!(parse_timestamp(&json!(1_728_721_815)), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_728_721_815_123_i64)), Some(expected));
        assert_eq!(parse_timestamp(&json!("1728721815")), Some(expected));
    }

    #[test]
    fn parse_timestamp_out_of_range_epochs_are_none() {
        assert!(parse_timestamp(&json!(i64::MIN)).is_none());
        assert!(parse_timestamp(&json!("-9223372036854775808")).is_none());
        assert!(parse_timestamp(&json!(-1.0e19)).is_none());
        assert!(parse_timestamp(&json!(1.0e300)).is_none());
        assert!(parse_timestamp(&json!(i64::MAX)).is_none());
    }

    #[test]
    fn parse_quantity_rejects_out_of_range_floats() {
        assert!(parse_quantity(&json!(-1.0e19)).is_none());
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp(&json!("last tuesday")).is_none());
        assert!(parse_timestamp(&json!("")).is_none());
    }

    #[test]
    fn parse_measurement_with_unit() {
        let m = parse_measurement("350 g").unwrap();
        assert_eq!(Value::Object(m), json!({"value": 350, "unit": "g"}));
        let m = parse_measurement("1.5kg").unwrap();
        assert_eq!(Value::Object(m), json!({"value": 1.5, "unit": "kg"}));
    }

    #[test]
    fn parse_dimensions_with_unit() {
        let d = parse_dimensions("100x50x25 mm").unwrap();
        assert_eq!(
            Value::Object(d),
            json!({"length": 100, "width": 50, "height": 25, "unit": "mm"})
        );
    }

    #[test]
    fn parse_dimensions_with_spaces_and_multiplication_sign() {
        let d = parse_dimensions("10.5 × 5 × 2cm").unwrap();
        assert_eq!(
            Value::Object(d),
            json!({"length": 10.5, "width": 5, "height": 2, "unit": "cm"})
        );
    }

    #[test]
    fn parse_dimensions_requires_three_parts() {
        assert!(parse_dimensions("100x50 mm").is_none());
        assert!(parse_dimensions("large").is_none());
    }
}
