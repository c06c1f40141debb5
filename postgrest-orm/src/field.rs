//! Bridges between native field types and the tagged [`Value`] model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::coercion::RangeValue;
use crate::error::CoercionError;
use crate::materialize::{Edge, Record};
use crate::schema::{Cardinality, Model};
use crate::value::{Value, ValueKind};

/// A native type that can back a column.
pub trait FieldValue: Sized {
    /// Whether the native type can hold "absent" (`Option<T>`).
    const NULLABLE: bool = false;

    fn kind() -> ValueKind;

    fn to_value(&self) -> Value;

    /// Convert a decoded value. Hands the value back when the variant doesn't fit.
    fn from_value(value: Value) -> Result<Self, Value>;
}

macro_rules! field_value {
    ($ty:ty, $kind:ident) => {
        impl FieldValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::$kind
            }

            fn to_value(&self) -> Value {
                Value::$kind(self.clone())
            }

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$kind(v) => Ok(v),
                    other => Err(other),
                }
            }
        }
    };
}

field_value!(i32, Int);
field_value!(f32, Float);
field_value!(String, Text);
field_value!(bool, Bool);
field_value!(DateTime<Utc>, Timestamp);
field_value!(NaiveDate, Date);
field_value!(Uuid, Uuid);
field_value!(serde_json::Value, Json);

impl FieldValue for i64 {
    fn kind() -> ValueKind {
        ValueKind::BigInt
    }

    fn to_value(&self) -> Value {
        Value::BigInt(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::BigInt(v) => Ok(v),
            Value::Int(v) => Ok(i64::from(v)),
            other => Err(other),
        }
    }
}

impl FieldValue for f64 {
    fn kind() -> ValueKind {
        ValueKind::Double
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(f64::from(v)),
            other => Err(other),
        }
    }
}

impl FieldValue for Decimal {
    fn kind() -> ValueKind {
        ValueKind::Numeric
    }

    fn to_value(&self) -> Value {
        Value::Numeric(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Numeric(v) => Ok(v),
            Value::Int(v) => Ok(Decimal::from(v)),
            Value::BigInt(v) => Ok(Decimal::from(v)),
            other => Err(other),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const NULLABLE: bool = true;

    fn kind() -> ValueKind {
        T::kind()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::Array(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        let Value::Array(items) = value else {
            return Err(value);
        };

        let mut out = Vec::with_capacity(items.len());
        let mut items = items.into_iter();
        while let Some(item) = items.next() {
            match T::from_value(item) {
                Ok(v) => out.push(v),
                Err(rejected) => {
                    // hand back the whole array, the rejected item in place
                    let mut original: Vec<Value> = out.iter().map(T::to_value).collect();
                    original.push(rejected);
                    original.extend(items);
                    return Err(Value::Array(original));
                }
            }
        }
        Ok(out)
    }
}

impl<T: FieldValue> FieldValue for RangeValue<T> {
    fn kind() -> ValueKind {
        ValueKind::Range(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Range(Box::new(RangeValue::new(
            self.start.to_value(),
            self.end.to_value(),
        )))
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        let Value::Range(range) = value else {
            return Err(value);
        };
        let RangeValue { start, end } = *range;
        match (T::from_value(start), T::from_value(end)) {
            (Ok(start), Ok(end)) => Ok(RangeValue::new(start, end)),
            (start, end) => Err(Value::Range(Box::new(RangeValue::new(
                start.map_or_else(|v| v, |v| v.to_value()),
                end.map_or_else(|v| v, |v| v.to_value()),
            )))),
        }
    }
}

/// A native type that can back a reference edge.
///
/// `Vec<M>` is a to-many edge; `Option<M>` is a to-one edge. Use
/// `Option<Box<M>>` when the two types refer to each other.
pub trait Reference: Sized {
    type Target: Model;

    const CARDINALITY: Cardinality;

    fn from_edge(edge: Edge) -> Result<Self, CoercionError>;
}

impl<M: Model> Reference for Vec<M> {
    type Target = M;

    const CARDINALITY: Cardinality = Cardinality::Many;

    fn from_edge(edge: Edge) -> Result<Self, CoercionError> {
        match edge {
            Edge::Many(records) => records.into_iter().map(M::from_record).collect(),
            Edge::One(Some(record)) => Ok(vec![M::from_record(*record)?]),
            Edge::One(None) | Edge::NotTraversed => Ok(Vec::new()),
        }
    }
}

impl<M: Model> Reference for Option<M> {
    type Target = M;

    const CARDINALITY: Cardinality = Cardinality::One;

    fn from_edge(edge: Edge) -> Result<Self, CoercionError> {
        match edge {
            Edge::One(record) => record.map(|r| M::from_record(*r)).transpose(),
            Edge::Many(records) => first_of(records).map(M::from_record).transpose(),
            Edge::NotTraversed => Ok(None),
        }
    }
}

fn first_of(records: Vec<Record>) -> Option<Record> {
    records.into_iter().next()
}
