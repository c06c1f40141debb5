//! Bounded ranges of ordered scalars (`int4range`, `tstzrange`, ...).
//!
//! Wire tokens look like `[20,51)` or `["2021-01-01 00:00:00+00","2021-02-01 00:00:00+00"]`.
//! Natively a range is an inclusive `start..=end` pair. Discrete ranges are
//! written back in the canonical form Postgres returns (`[start,end+1)`), so
//! server tokens survive a decode/encode cycle unchanged.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::temporal;
use crate::error::CoercionError;
use crate::value::{Value, ValueKind};

/// Inclusive range with structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RangeValue<T> {
    pub start: T,
    pub end: T,
}

impl<T> RangeValue<T> {
    pub const fn new(start: T, end: T) -> Self {
        Self { start, end }
    }
}

pub type IntRange = RangeValue<i32>;
pub type BigIntRange = RangeValue<i64>;
pub type NumericRange = RangeValue<Decimal>;
pub type TimestampRange = RangeValue<DateTime<Utc>>;
pub type DateRange = RangeValue<NaiveDate>;

static RANGE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([\[(])\s*("(?:[^"\\]|\\.)*"|[^,]*?)\s*,\s*("(?:[^"\\]|\\.)*"|[^,]*?)\s*([\])])$"#)
        .expect("range token pattern is valid")
});

/// Split a range token into two components and parse them as `element`.
pub fn parse_range(token: &str, element: &ValueKind) -> Result<RangeValue<Value>, CoercionError> {
    let kind = ValueKind::Range(Box::new(element.clone()));
    let mismatch = || CoercionError::new(&kind, token);

    let captures = RANGE_TOKEN.captures(token.trim()).ok_or_else(mismatch)?;
    let lower_inclusive = &captures[1] == "[";
    let upper_inclusive = &captures[4] == "]";

    let lower = unquote(&captures[2]);
    let upper = unquote(&captures[3]);
    if lower.is_empty() || upper.is_empty() {
        // unbounded side
        return Err(mismatch());
    }

    let mut start = parse_component(&lower, element).ok_or_else(mismatch)?;
    let mut end = parse_component(&upper, element).ok_or_else(mismatch)?;

    if !lower_inclusive {
        start = step(&start, 1).ok_or_else(mismatch)?;
    }
    if !upper_inclusive {
        end = step(&end, -1).ok_or_else(mismatch)?;
    }

    Ok(RangeValue::new(start, end))
}

/// Render a range as a wire token.
pub fn render_range(range: &RangeValue<Value>, element: &ValueKind) -> Result<String, CoercionError> {
    let start = render_component(&range.start, element).map_err(|e| e.at("start"))?;

    if element.is_discrete() {
        if let Some(next) = step(&range.end, 1) {
            let end = render_component(&next, element).map_err(|e| e.at("end"))?;
            return Ok(format!("[{start},{end})"));
        }
    }

    let end = render_component(&range.end, element).map_err(|e| e.at("end"))?;
    Ok(format!("[{start},{end}]"))
}

fn unquote(component: &str) -> String {
    let component = component.trim();
    match component
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => component.to_string(),
    }
}

fn parse_component(token: &str, element: &ValueKind) -> Option<Value> {
    match element {
        ValueKind::Int => token.parse().ok().map(Value::Int),
        ValueKind::BigInt => token.parse().ok().map(Value::BigInt),
        ValueKind::Numeric => Decimal::from_str(token)
            .or_else(|_| Decimal::from_scientific(token))
            .ok()
            .map(Value::Numeric),
        ValueKind::Timestamp => temporal::decode_timestamp(token).map(Value::Timestamp),
        ValueKind::Date => temporal::decode_date(token).map(Value::Date),
        _ => None,
    }
}

fn render_component(value: &Value, element: &ValueKind) -> Result<String, CoercionError> {
    match (value, element) {
        (Value::Int(v), ValueKind::Int | ValueKind::BigInt | ValueKind::Numeric) => Ok(v.to_string()),
        (Value::BigInt(v), ValueKind::BigInt | ValueKind::Numeric) => Ok(v.to_string()),
        (Value::Numeric(v), ValueKind::Numeric) => Ok(v.to_string()),
        (Value::Timestamp(v), ValueKind::Timestamp) => {
            Ok(format!("\"{}\"", temporal::encode_timestamp(v)))
        }
        (Value::Date(v), ValueKind::Date) => Ok(temporal::encode_date(v)),
        (other, kind) => Err(CoercionError::new(kind, format!("{other:?}"))),
    }
}

/// Successor (`delta = 1`) or predecessor (`delta = -1`) of a discrete value.
/// `None` for continuous values or on overflow.
fn step(value: &Value, delta: i32) -> Option<Value> {
    match value {
        Value::Int(v) => v.checked_add(delta).map(Value::Int),
        Value::BigInt(v) => v.checked_add(i64::from(delta)).map(Value::BigInt),
        Value::Date(v) if delta > 0 => v.succ_opt().map(Value::Date),
        Value::Date(v) => v.pred_opt().map(Value::Date),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_structural_equality() {
        assert_eq!(IntRange::new(0, 1), IntRange::new(0, 1));
        assert_ne!(IntRange::new(0, 1), IntRange::new(0, 2));
    }

    #[test]
    fn test_parse_discrete_bounds_are_normalised() {
        let range = parse_range("[20,51)", &ValueKind::Int).unwrap();
        assert_eq!(range, RangeValue::new(Value::Int(20), Value::Int(50)));

        let range = parse_range("(19,50]", &ValueKind::Int).unwrap();
        assert_eq!(range, RangeValue::new(Value::Int(20), Value::Int(50)));
    }

    #[test]
    fn test_parse_quoted_timestamps() {
        let range = parse_range(
            r#"["2021-01-01 00:00:00+00","2021-02-01 00:00:00+00"]"#,
            &ValueKind::Timestamp,
        )
        .unwrap();
        assert_eq!(
            range.start,
            Value::Timestamp(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            range.end,
            Value::Timestamp(Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_rejects_tokens_without_two_components() {
        for token in ["empty", "[1,)", "(,5]", "[1,2,3]", "1,2", "[a,b]"] {
            assert!(parse_range(token, &ValueKind::Int).is_err(), "{token}");
        }
    }

    #[test]
    fn test_rejects_exclusive_continuous_bounds() {
        let err = parse_range("[1.5,2.5)", &ValueKind::Numeric).unwrap_err();
        assert_eq!(err.expected, "numrange");
    }

    #[test]
    fn test_render_uses_canonical_discrete_form() {
        let range = RangeValue::new(Value::Int(0), Value::Int(1));
        assert_eq!(render_range(&range, &ValueKind::Int).unwrap(), "[0,2)");

        let range = RangeValue::new(Value::Int(0), Value::Int(i32::MAX));
        assert_eq!(render_range(&range, &ValueKind::Int).unwrap(), "[0,2147483647]");
    }

    #[test]
    fn test_render_rejects_uncoercible_components() {
        let range = RangeValue::new(Value::Text("a".into()), Value::Int(1));
        let err = render_range(&range, &ValueKind::Int).unwrap_err();
        assert_eq!(err.field, "start");
    }
}
