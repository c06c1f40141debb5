//! Error taxonomy for the client core.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A record type's registration is invalid. Surfaced on first use, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{model}: table name must not be empty")]
    EmptyTableName { model: String },

    #[error("{model} (table `{table}`) declares no primary key column")]
    MissingPrimaryKey { model: String, table: String },

    #[error("table `{table}`: column `{column}` is declared more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("table `{table}`: reference edge `{edge}` is declared more than once")]
    DuplicateEdge { table: String, edge: String },

    #[error("table `{table}`: reference edge `{edge}` has the same name as a column")]
    EdgeShadowsColumn { table: String, edge: String },

    #[error("table `{table}`: column `{column}` has unsupported kind {kind}")]
    UnsupportedKind {
        table: String,
        column: String,
        kind: String,
    },

    #[error("table `{table}`: cardinality-many edge `{edge}` cannot own the foreign key")]
    OwningManyEdge { table: String, edge: String },

    #[error("table `{table}`: reference edge `{edge}` targets an invalid type: {reason}")]
    InvalidTarget {
        table: String,
        edge: String,
        reason: Box<SchemaError>,
    },
}

/// A wire token and a native value disagree on a specific field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce `{field}`: expected {expected}, found {actual}")]
pub struct CoercionError {
    /// Dotted path of the offending field (`table.column`, `column[2]`, ...)
    pub field: String,
    /// Expected kind, using Postgres type names
    pub expected: String,
    /// The offending token as received
    pub actual: String,
}

impl CoercionError {
    pub fn new(expected: impl fmt::Display, actual: impl Into<String>) -> Self {
        Self {
            field: String::new(),
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }

    /// Prefix the field path with `field`.
    pub fn at(mut self, field: &str) -> Self {
        self.field = if self.field.is_empty() {
            field.to_string()
        } else if self.field.starts_with('[') {
            format!("{field}{}", self.field)
        } else {
            format!("{field}.{}", self.field)
        };
        self
    }
}

/// A filter, select or write composition is invalid for the target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestBuildError {
    #[error("table `{table}` has no reference edge named `{edge}`")]
    UnknownEdge { table: String, edge: String },

    #[error("table `{table}` has no column named `{column}`")]
    UnknownColumn { table: String, column: String },

    #[error(
        "table `{table}`: edge `{edge}` targets `{target}`, which is referenced more than once; \
         a foreign key hint is required"
    )]
    AmbiguousEmbed {
        table: String,
        edge: String,
        target: String,
    },

    #[error("invalid select entry `{entry}`: {reason}")]
    InvalidSelect { entry: String, reason: String },

    #[error("operator `{operator}` on `{path}` does not accept {reason}")]
    InvalidOperand {
        path: String,
        operator: String,
        reason: String,
    },

    #[error("operand for `{path}` cannot be encoded: {source}")]
    Operand {
        path: String,
        #[source]
        source: CoercionError,
    },

    #[error("table `{table}`: primary key column `{column}` has no value")]
    MissingKeyValue { table: String, column: String },

    #[error("write to `{table}` carries no rows")]
    EmptyPayload { table: String },
}

/// Error returned by client operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    RequestBuild(#[from] RequestBuildError),

    /// The server answered with a non-success status.
    #[error("request to `{path}` failed with status {status}: {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
        code: Option<String>,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported by the transport collaborator, passed through unchanged.
    #[error(transparent)]
    Transport(anyhow::Error),
}
