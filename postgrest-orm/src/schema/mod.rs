//! Type descriptors: what a record type looks like on the wire.
//!
//! A record type registers itself through [`Model::definition`], usually via
//! `#[derive(Model)]`:
//!
//! ```rust,ignore
//! #[derive(Model)]
//! #[model(table = "movie")]
//! pub struct Movie {
//!     #[primary_key]
//!     #[column(skip_insert)]
//!     pub id: i32,
//!     pub name: Option<String>,
//!     #[reference]
//!     pub person: Vec<Person>,
//! }
//! ```
//!
//! The registry validates the definition once and caches the resulting
//! [`TypeDescriptor`] for the lifetime of the process.

pub mod registry;

use std::any::{self, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{CoercionError, SchemaError};
use crate::field::{FieldValue, Reference};
use crate::materialize::Record;
use crate::value::{Value, ValueKind};

pub use registry::describe;

/// A record type backed by a PostgREST table.
pub trait Model: Sized + Send + Sync + 'static {
    /// Declarative registration: table name, columns and reference edges.
    fn definition() -> TableDefinition;

    /// Build the typed record from a materialized node.
    fn from_record(record: Record) -> Result<Self, CoercionError>;

    /// Column values for writes, keyed by wire name. Reference edges are
    /// never part of a write.
    fn column_values(&self) -> Vec<(&'static str, Value)>;

    /// Identity used by the registry. Wrappers delegate to the wrapped type.
    fn model_key() -> ModelKey {
        ModelKey::new::<Self>()
    }
}

impl<M: Model> Model for Box<M> {
    fn definition() -> TableDefinition {
        M::definition()
    }

    fn from_record(record: Record) -> Result<Self, CoercionError> {
        M::from_record(record).map(Box::new)
    }

    fn column_values(&self) -> Vec<(&'static str, Value)> {
        (**self).column_values()
    }

    fn model_key() -> ModelKey {
        M::model_key()
    }
}

/// Type identity plus the registration function, so descriptors can be built
/// for targets discovered while walking reference edges.
#[derive(Clone, Copy)]
pub struct ModelKey {
    type_id: TypeId,
    type_name: &'static str,
    definition: fn() -> TableDefinition,
}

impl ModelKey {
    fn new<M: Model>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            type_name: any::type_name::<M>(),
            definition: M::definition,
        }
    }

    pub fn of<M: Model>() -> Self {
        M::model_key()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn definition(&self) -> TableDefinition {
        (self.definition)()
    }
}

impl fmt::Debug for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl PartialEq for ModelKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ModelKey {}

/// Unvalidated registration produced by [`Model::definition`].
#[derive(Debug, Clone)]
pub struct TableDefinition {
    table: String,
    columns: Vec<ColumnDescriptor>,
    references: Vec<ReferenceDescriptor>,
}

impl TableDefinition {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn reference(mut self, reference: ReferenceDescriptor) -> Self {
        self.references.push(reference);
        self
    }
}

/// A column of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name on the wire
    pub name: String,
    /// Native field the column maps to
    pub field: &'static str,
    pub kind: ValueKind,
    /// Whether `null` (or an absent value) is acceptable
    pub nullable: bool,
    pub primary_key: bool,
    /// Left out of insert payloads (server generated)
    pub skip_insert: bool,
    /// Left out of update payloads
    pub skip_update: bool,
}

impl ColumnDescriptor {
    /// Column whose kind and nullability follow the native field type.
    pub fn new<T: FieldValue>(name: impl Into<String>, field: &'static str) -> Self {
        Self::with_kind(name, field, T::kind(), T::NULLABLE)
    }

    pub fn with_kind(
        name: impl Into<String>,
        field: &'static str,
        kind: ValueKind,
        nullable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            field,
            kind,
            nullable,
            primary_key: false,
            skip_insert: false,
            skip_update: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn skip_insert(mut self) -> Self {
        self.skip_insert = true;
        self
    }

    pub fn skip_update(mut self) -> Self {
        self.skip_update = true;
        self
    }
}

/// How many related records an edge carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Many,
}

/// A named foreign-key edge to another record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDescriptor {
    /// Edge name, unique per type; also the key of the embed in responses
    pub name: String,
    pub field: &'static str,
    pub target: ModelKey,
    pub cardinality: Cardinality,
    /// Whether this side holds the foreign key column
    pub owning: bool,
    /// Foreign key (constraint or column) used to disambiguate the embed
    pub foreign_key: Option<String>,
    /// Embed as an inner join, dropping parent rows without a match
    pub inner: bool,
}

impl ReferenceDescriptor {
    /// Edge whose target and cardinality follow the native field type
    /// (`Vec<M>`, `Option<M>`, `Option<Box<M>>`).
    pub fn new<F: Reference>(name: impl Into<String>, field: &'static str) -> Self {
        Self::to(ModelKey::of::<F::Target>(), F::CARDINALITY, name, field)
    }

    pub fn to(
        target: ModelKey,
        cardinality: Cardinality,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self {
            name: name.into(),
            field,
            target,
            cardinality,
            owning: cardinality == Cardinality::One,
            foreign_key: None,
            inner: false,
        }
    }

    pub fn foreign_key(mut self, hint: impl Into<String>) -> Self {
        self.foreign_key = Some(hint.into());
        self
    }

    pub fn inner(mut self) -> Self {
        self.inner = true;
        self
    }

    /// The foreign key lives on the target table (one-to-one back edge).
    pub fn inverse(mut self) -> Self {
        self.owning = false;
        self
    }

    /// Descriptor of the edge's target type.
    pub fn target(&self) -> Result<Arc<TypeDescriptor>, SchemaError> {
        registry::describe_key(&self.target)
    }
}

/// Validated, immutable description of a record type.
#[derive(Debug)]
pub struct TypeDescriptor {
    key: ModelKey,
    table: String,
    columns: Vec<ColumnDescriptor>,
    references: Vec<ReferenceDescriptor>,
    primary_key: Vec<usize>,
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl TypeDescriptor {
    pub fn key(&self) -> ModelKey {
        self.key
    }

    pub fn type_id(&self) -> TypeId {
        self.key.type_id
    }

    pub fn model_name(&self) -> &'static str {
        self.key.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn references(&self) -> &[ReferenceDescriptor] {
        &self.references
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceDescriptor> {
        self.references.iter().find(|r| r.name == name)
    }

    /// Primary key columns in declaration order.
    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.primary_key.iter().map(|&i| &self.columns[i])
    }

    /// Validate a definition.
    pub(crate) fn from_definition(
        key: ModelKey,
        definition: TableDefinition,
    ) -> Result<Self, SchemaError> {
        let TableDefinition {
            table,
            columns,
            references,
        } = definition;

        if table.trim().is_empty() {
            return Err(SchemaError::EmptyTableName {
                model: key.type_name.to_string(),
            });
        }

        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SchemaError::DuplicateColumn {
                    table,
                    column: column.name.clone(),
                });
            }
            if !column.kind.is_supported() {
                return Err(SchemaError::UnsupportedKind {
                    table,
                    column: column.name.clone(),
                    kind: column.kind.to_string(),
                });
            }
        }

        let primary_key: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();
        if primary_key.is_empty() {
            return Err(SchemaError::MissingPrimaryKey {
                model: key.type_name.to_string(),
                table,
            });
        }

        for (i, reference) in references.iter().enumerate() {
            if references[..i].iter().any(|r| r.name == reference.name) {
                return Err(SchemaError::DuplicateEdge {
                    table,
                    edge: reference.name.clone(),
                });
            }
            if columns.iter().any(|c| c.name == reference.name) {
                return Err(SchemaError::EdgeShadowsColumn {
                    table,
                    edge: reference.name.clone(),
                });
            }
            if reference.cardinality == Cardinality::Many && reference.owning {
                return Err(SchemaError::OwningManyEdge {
                    table,
                    edge: reference.name.clone(),
                });
            }
        }

        Ok(Self {
            key,
            table,
            columns,
            references,
            primary_key,
        })
    }
}
