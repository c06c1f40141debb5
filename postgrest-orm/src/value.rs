//! Native value model shared by the coercion engine, the query builder and
//! the materializer.
//!
//! `ValueKind` is the declared kind of a column (what the registry records),
//! `Value` is a decoded native value. Typed model fields reach these through
//! [`FieldValue`](crate::FieldValue).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::coercion::RangeValue;

/// Declared wire kind of a column or operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 32-bit integer (`int4`)
    Int,
    /// 64-bit integer (`int8`)
    BigInt,
    /// Single precision float (`float4`)
    Float,
    /// Double precision float (`float8`)
    Double,
    /// Arbitrary precision decimal (`numeric`)
    Numeric,
    Text,
    Bool,
    /// Timestamp with time zone, normalised to UTC
    Timestamp,
    Date,
    Uuid,
    /// Opaque JSON document (`json` / `jsonb`)
    Json,
    /// Homogeneous ordered collection
    Array(Box<ValueKind>),
    /// Bounded range of an ordered scalar
    Range(Box<ValueKind>),
}

impl ValueKind {
    /// Whether ranges over this kind are supported.
    pub fn is_range_element(&self) -> bool {
        matches!(
            self,
            ValueKind::Int
                | ValueKind::BigInt
                | ValueKind::Numeric
                | ValueKind::Timestamp
                | ValueKind::Date
        )
    }

    /// Discrete range elements have a successor, so exclusive bounds can be
    /// normalised to inclusive ones.
    pub fn is_discrete(&self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::BigInt | ValueKind::Date)
    }

    /// Whether a column may be declared with this kind.
    pub fn is_supported(&self) -> bool {
        match self {
            ValueKind::Array(inner) => {
                !matches!(**inner, ValueKind::Array(_)) && inner.is_supported()
            }
            ValueKind::Range(inner) => inner.is_range_element(),
            _ => true,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int => f.write_str("int4"),
            ValueKind::BigInt => f.write_str("int8"),
            ValueKind::Float => f.write_str("float4"),
            ValueKind::Double => f.write_str("float8"),
            ValueKind::Numeric => f.write_str("numeric"),
            ValueKind::Text => f.write_str("text"),
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::Timestamp => f.write_str("timestamptz"),
            ValueKind::Date => f.write_str("date"),
            ValueKind::Uuid => f.write_str("uuid"),
            ValueKind::Json => f.write_str("jsonb"),
            ValueKind::Array(inner) => write!(f, "{inner}[]"),
            ValueKind::Range(inner) => match **inner {
                ValueKind::Int => f.write_str("int4range"),
                ValueKind::BigInt => f.write_str("int8range"),
                ValueKind::Numeric => f.write_str("numrange"),
                ValueKind::Timestamp => f.write_str("tstzrange"),
                ValueKind::Date => f.write_str("daterange"),
                ref other => write!(f, "range<{other}>"),
            },
        }
    }
}

/// A decoded native value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Numeric(Decimal),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(Uuid),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Range(Box<RangeValue<Value>>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind implied by the value itself. `None` for `Null`; an empty array is
    /// reported as a text array.
    pub fn kind(&self) -> Option<ValueKind> {
        let kind = match self {
            Value::Null => return None,
            Value::Int(_) => ValueKind::Int,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Numeric(_) => ValueKind::Numeric,
            Value::Text(_) => ValueKind::Text,
            Value::Bool(_) => ValueKind::Bool,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Date(_) => ValueKind::Date,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Json(_) => ValueKind::Json,
            Value::Array(items) => {
                let inner = items
                    .iter()
                    .find_map(Value::kind)
                    .unwrap_or(ValueKind::Text);
                ValueKind::Array(Box::new(inner))
            }
            Value::Range(range) => {
                let inner = range.start.kind().or_else(|| range.end.kind())?;
                ValueKind::Range(Box::new(inner))
            }
        };
        Some(kind)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Numeric(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<RangeValue<T>> for Value {
    fn from(range: RangeValue<T>) -> Self {
        Value::Range(Box::new(RangeValue::new(
            range.start.into(),
            range.end.into(),
        )))
    }
}
