//! Turning response JSON into record graphs.
//!
//! Decoding follows a [`SelectTree`]: only planned columns are read, and only
//! planned embeds are followed. Edges outside the plan are
//! [`Edge::NotTraversed`]. Any failure fails the whole call; there are no
//! partially built records.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::trace;

use crate::coercion;
use crate::error::{CoercionError, Result};
use crate::field::{FieldValue, Reference};
use crate::query::SelectTree;
use crate::schema::{Cardinality, TypeDescriptor};
use crate::value::Value;

/// State of a reference edge on a materialized record.
#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    /// To-one edge; `None` when the related row is absent
    One(Option<Box<Record>>),
    Many(Vec<Record>),
    /// Not part of the selection, or cut at a cycle
    NotTraversed,
}

/// One decoded row plus its traversed edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    descriptor: Arc<TypeDescriptor>,
    depth: usize,
    values: BTreeMap<String, Value>,
    edges: BTreeMap<String, Edge>,
}

impl Record {
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Distance from the root record.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Decoded column value, if the column was selected.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn edge(&self, name: &str) -> Option<&Edge> {
        self.edges.get(name)
    }

    /// Take a column as a native value. Unselected nullable columns read as
    /// absent.
    pub fn column<T: FieldValue>(&mut self, name: &str) -> Result<T, CoercionError> {
        let table = self.descriptor.table().to_string();
        match self.values.remove(name) {
            Some(value) => T::from_value(value).map_err(|rejected| {
                CoercionError::new(T::kind(), format!("{rejected:?}"))
                    .at(name)
                    .at(&table)
            }),
            None if T::NULLABLE => {
                T::from_value(Value::Null).map_err(|_| {
                    CoercionError::new(T::kind(), "null").at(name).at(&table)
                })
            }
            None => Err(CoercionError::new(T::kind(), "column not selected")
                .at(name)
                .at(&table)),
        }
    }

    /// Take an edge as a native reference field.
    pub fn reference<F: Reference>(&mut self, name: &str) -> Result<F, CoercionError> {
        let edge = self.edges.remove(name).unwrap_or(Edge::NotTraversed);
        F::from_edge(edge)
    }
}

/// Materialize a response body against the full selection of `root`.
pub fn materialize(raw: &Json, root: &Arc<TypeDescriptor>) -> Result<Vec<Record>> {
    let shape = SelectTree::full(root)?;
    Ok(materialize_with(raw, &shape)?)
}

/// Materialize a response body (a row array, or a single row object) against
/// a planned selection.
pub fn materialize_with(raw: &Json, shape: &SelectTree) -> Result<Vec<Record>, CoercionError> {
    let records = match raw {
        Json::Array(rows) => rows
            .iter()
            .map(|row| materialize_row(row, shape, 0))
            .collect::<Result<Vec<_>, _>>()?,
        Json::Object(_) => vec![materialize_row(raw, shape, 0)?],
        Json::Null => Vec::new(),
        other => {
            return Err(CoercionError::new("row or array of rows", other.to_string())
                .at(shape.descriptor().table()));
        }
    };
    trace!(
        table = %shape.descriptor().table(),
        rows = records.len(),
        "Materialized response"
    );
    Ok(records)
}

fn materialize_row(row: &Json, shape: &SelectTree, depth: usize) -> Result<Record, CoercionError> {
    let descriptor = shape.descriptor();
    let table = descriptor.table();
    let object = row
        .as_object()
        .ok_or_else(|| CoercionError::new("row object", row.to_string()).at(table))?;

    let mut values = BTreeMap::new();
    for name in shape.columns() {
        let Some(column) = descriptor.column(name) else {
            continue;
        };
        let value = match object.get(name) {
            Some(wire) => coercion::decode(wire, &column.kind).map_err(|e| e.at(name).at(table))?,
            None => Value::Null,
        };
        if value.is_null() && !column.nullable {
            let actual = if object.contains_key(name) { "null" } else { "absent" };
            return Err(CoercionError::new(&column.kind, actual).at(name).at(table));
        }
        values.insert(name.clone(), value);
    }

    let mut edges: BTreeMap<String, Edge> = descriptor
        .references()
        .iter()
        .map(|r| (r.name.clone(), Edge::NotTraversed))
        .collect();

    for embed in shape.embeds() {
        let child = embed.tree();
        let edge = match (object.get(embed.edge()), embed.cardinality()) {
            (None, _) => Edge::NotTraversed,
            (Some(Json::Null), Cardinality::One) => Edge::One(None),
            (Some(Json::Null), Cardinality::Many) => Edge::Many(Vec::new()),
            (Some(item @ Json::Object(_)), Cardinality::One) => {
                Edge::One(Some(Box::new(materialize_row(item, child, depth + 1)?)))
            }
            (Some(item @ Json::Object(_)), Cardinality::Many) => {
                Edge::Many(vec![materialize_row(item, child, depth + 1)?])
            }
            (Some(Json::Array(items)), Cardinality::Many) => Edge::Many(
                items
                    .iter()
                    .map(|item| materialize_row(item, child, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            (Some(Json::Array(items)), Cardinality::One) => match items.as_slice() {
                [] => Edge::One(None),
                [item] => Edge::One(Some(Box::new(materialize_row(item, child, depth + 1)?))),
                _ => {
                    return Err(CoercionError::new(
                        "at most one embedded row",
                        format!("{} rows", items.len()),
                    )
                    .at(embed.edge())
                    .at(table));
                }
            },
            (Some(other), _) => {
                return Err(CoercionError::new("embedded rows", other.to_string())
                    .at(embed.edge())
                    .at(table));
            }
        };
        edges.insert(embed.edge().to_string(), edge);
    }

    Ok(Record {
        descriptor: descriptor.clone(),
        depth,
        values,
        edges,
    })
}
