//! postgrest-orm - typed record access for PostgREST tables
//!
//! Record types describe their table, columns and foreign-key edges once
//! (`#[derive(Model)]`). From that description the crate builds PostgREST
//! requests (selections with embedded relationships, filters, ordering,
//! paging, writes) and decodes responses back into record graphs, cutting
//! reference cycles one hop after a type repeats.

extern crate self as postgrest_orm;

pub mod client;
pub mod coercion;
pub mod config;
pub mod error;
pub mod materialize;
pub mod query;
pub mod schema;
pub mod transport;
pub mod value;

mod field;

#[cfg(test)]
mod fixtures;

pub use client::{Client, ModeledResponse, Table};
pub use coercion::{BigIntRange, DateRange, IntRange, NumericRange, RangeValue, TimestampRange};
pub use config::ClientConfig;
pub use error::{CoercionError, Error, RequestBuildError, Result, SchemaError};
pub use field::{FieldValue, Reference};
pub use materialize::{Edge, Record};
pub use query::{Filter, Method, NullPosition, Operator, Ordering, QueryBuilder, RequestDescriptor};
pub use schema::Model;
pub use transport::{HttpTransport, RawResponse, Transport};
pub use value::{Value, ValueKind};

pub use postgrest_orm_macros::{Model, WireEnum};
