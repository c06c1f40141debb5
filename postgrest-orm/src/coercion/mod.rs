//! Coercion engine: bidirectional conversion between native [`Value`]s and
//! the JSON tokens PostgREST sends and accepts.
//!
//! `decode` is strict: every mismatch is a [`CoercionError`] carrying the
//! expected kind and the offending token; nothing is silently defaulted.
//! `null` decodes to [`Value::Null`] for every kind; whether that is allowed
//! is the caller's decision (see the materializer).

mod range;
pub mod temporal;
pub mod token;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Number, Value as Json};
use uuid::Uuid;

pub use range::{
    BigIntRange, DateRange, IntRange, NumericRange, RangeValue, TimestampRange, parse_range,
    render_range,
};

use crate::error::CoercionError;
use crate::value::{Value, ValueKind};

const FLOAT_INFINITY: &str = "Infinity";
const FLOAT_NEG_INFINITY: &str = "-Infinity";
const FLOAT_NAN: &str = "NaN";

/// Decode a wire token as `kind`.
pub fn decode(wire: &Json, kind: &ValueKind) -> Result<Value, CoercionError> {
    if wire.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = || CoercionError::new(kind, wire.to_string());

    match kind {
        ValueKind::Int => wire
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(mismatch),
        ValueKind::BigInt => wire.as_i64().map(Value::BigInt).ok_or_else(mismatch),
        ValueKind::Float => {
            let wide = decode_float(wire).ok_or_else(mismatch)?;
            let narrow = wide as f32;
            // a finite double outside the f32 range would silently become infinity
            if wide.is_finite() && !narrow.is_finite() {
                return Err(mismatch());
            }
            Ok(Value::Float(narrow))
        }
        ValueKind::Double => decode_float(wire).map(Value::Double).ok_or_else(mismatch),
        ValueKind::Numeric => {
            let text = match wire {
                Json::Number(n) => n.to_string(),
                Json::String(s) => s.clone(),
                _ => return Err(mismatch()),
            };
            parse_decimal(&text).map(Value::Numeric).ok_or_else(mismatch)
        }
        ValueKind::Text => wire
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(mismatch),
        ValueKind::Bool => wire.as_bool().map(Value::Bool).ok_or_else(mismatch),
        ValueKind::Timestamp => wire
            .as_str()
            .and_then(temporal::decode_timestamp)
            .map(Value::Timestamp)
            .ok_or_else(mismatch),
        ValueKind::Date => wire
            .as_str()
            .and_then(temporal::decode_date)
            .map(Value::Date)
            .ok_or_else(mismatch),
        ValueKind::Uuid => wire
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(Value::Uuid)
            .ok_or_else(mismatch),
        ValueKind::Json => Ok(Value::Json(wire.clone())),
        ValueKind::Array(inner) => {
            let items = wire.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode(item, inner).map_err(|e| e.at(&format!("[{i}]"))))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        ValueKind::Range(inner) => {
            let token = wire.as_str().ok_or_else(mismatch)?;
            parse_range(token, inner).map(|r| Value::Range(Box::new(r)))
        }
    }
}

/// Encode a native value as `kind`.
///
/// Widening is allowed (`Int` into `BigInt`, `Float` into `Double`, integers
/// into `Numeric`); anything else that disagrees with `kind` fails, including
/// collection items and range bounds.
pub fn encode(value: &Value, kind: &ValueKind) -> Result<Json, CoercionError> {
    let encoded = match (value, kind) {
        (Value::Null, _) => Json::Null,
        (Value::Int(v), ValueKind::Int | ValueKind::BigInt) => Json::from(*v),
        (Value::BigInt(v), ValueKind::BigInt) => Json::from(*v),
        (Value::Int(v), ValueKind::Numeric) => Json::from(*v),
        (Value::BigInt(v), ValueKind::Numeric) => Json::from(*v),
        // shortest decimal representation, so 1.1f32 is sent as 1.1
        (Value::Float(v), ValueKind::Float | ValueKind::Double) => encode_float(f64::from(*v), v.to_string()),
        (Value::Double(v), ValueKind::Double) => encode_float(*v, v.to_string()),
        (Value::Numeric(v), ValueKind::Numeric) => {
            let text = v.normalize().to_string();
            Number::from_str(&text)
                .map(Json::Number)
                .unwrap_or(Json::String(text))
        }
        (Value::Text(v), ValueKind::Text) => Json::String(v.clone()),
        (Value::Bool(v), ValueKind::Bool) => Json::Bool(*v),
        (Value::Timestamp(v), ValueKind::Timestamp) => Json::String(temporal::encode_timestamp(v)),
        (Value::Date(v), ValueKind::Date) => Json::String(temporal::encode_date(v)),
        (Value::Uuid(v), ValueKind::Uuid) => Json::String(v.hyphenated().to_string()),
        (Value::Json(v), ValueKind::Json) => v.clone(),
        (Value::Array(items), ValueKind::Array(inner)) => Json::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| encode(item, inner).map_err(|e| e.at(&format!("[{i}]"))))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        (Value::Range(range), ValueKind::Range(inner)) => Json::String(render_range(range, inner)?),
        (other, kind) => return Err(CoercionError::new(kind, format!("{other:?}"))),
    };
    Ok(encoded)
}

/// Encode a value using the kind it carries itself.
pub fn encode_inferred(value: &Value) -> Result<Json, CoercionError> {
    match value.kind() {
        Some(kind) => encode(value, &kind),
        None => Ok(Json::Null),
    }
}

fn decode_float(wire: &Json) -> Option<f64> {
    match wire {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            FLOAT_INFINITY => Some(f64::INFINITY),
            FLOAT_NEG_INFINITY => Some(f64::NEG_INFINITY),
            FLOAT_NAN => Some(f64::NAN),
            _ => None,
        },
        _ => None,
    }
}

fn encode_float(value: f64, repr: String) -> Json {
    if value.is_nan() {
        Json::String(FLOAT_NAN.to_string())
    } else if value.is_infinite() {
        let token = if value > 0.0 { FLOAT_INFINITY } else { FLOAT_NEG_INFINITY };
        Json::String(token.to_string())
    } else {
        let shortest = repr.parse::<f64>().unwrap_or(value);
        Number::from_f64(shortest).map_or(Json::Null, Json::Number)
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
