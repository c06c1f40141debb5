//! Fluent request building.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value as Json};

use super::filter::{Filter, Operator};
use super::select::SelectTree;
use crate::coercion;
use crate::error::{Error, RequestBuildError, Result};
use crate::schema::{Model, TypeDescriptor, describe};
use crate::value::Value;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the request writes rows.
    pub fn is_write(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPosition {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ordering: Ordering,
    pub nulls: Option<NullPosition>,
}

impl Order {
    fn render(&self) -> String {
        let mut out = format!(
            "{}.{}",
            self.column,
            match self.ordering {
                Ordering::Ascending => "asc",
                Ordering::Descending => "desc",
            }
        );
        match self.nulls {
            Some(NullPosition::First) => out.push_str(".nullsfirst"),
            Some(NullPosition::Last) => out.push_str(".nullslast"),
            None => {}
        }
        out
    }
}

/// Immutable description of one HTTP request against a table.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    table: String,
    shape: SelectTree,
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<usize>,
    offset: Option<usize>,
    query: Vec<(String, String)>,
    body: Option<Json>,
}

impl RequestDescriptor {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Path relative to the REST endpoint (`/movie`).
    pub fn path(&self) -> String {
        format!("/{}", self.table)
    }

    /// Planned selection; the response is materialized against it.
    pub fn shape(&self) -> &SelectTree {
        &self.shape
    }

    pub fn select_clause(&self) -> String {
        self.shape.render()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Query parameters in order: `select`, filters, `order`, `limit`, `offset`.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Value of the first query parameter named `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> Option<&Json> {
        self.body.as_ref()
    }

    pub fn to_query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Builder for requests against the table backing `M`.
#[derive(Debug)]
pub struct QueryBuilder<M: Model> {
    select: Vec<String>,
    filters: Vec<Filter>,
    order: Option<Order>,
    limit: Option<usize>,
    offset: Option<usize>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Default for QueryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            select: self.select.clone(),
            filters: self.filters.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
            _model: PhantomData,
        }
    }
}

impl<M: Model> QueryBuilder<M> {
    pub fn new() -> Self {
        Self {
            select: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: None,
            _model: PhantomData,
        }
    }

    /// Explicit selection (`["id", "people.first_name"]`). Defaults to every
    /// column and every edge.
    pub fn select<S: AsRef<str>>(mut self, entries: &[S]) -> Self {
        self.select = entries.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    pub fn filter(self, path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.matching(Filter::new(path, operator, value))
    }

    /// Shorthand for an equality filter.
    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(path, Operator::Equals, value)
    }

    pub fn not(self, path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.matching(Filter::not(Filter::new(path, operator, value)))
    }

    pub fn or(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.matching(Filter::or(filters))
    }

    pub fn and(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.matching(Filter::and(filters))
    }

    /// Add a prebuilt filter.
    pub fn matching(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, column: impl Into<String>, ordering: Ordering) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ordering,
            nulls: None,
        });
        self
    }

    pub fn order_nulls(
        mut self,
        column: impl Into<String>,
        ordering: Ordering,
        nulls: NullPosition,
    ) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ordering,
            nulls: Some(nulls),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Rows `from..=to`, zero based. An inverted range (`to < from`) selects
    /// no rows.
    pub fn range(self, from: usize, to: usize) -> Self {
        let count = if to < from { 0 } else { to - from + 1 };
        self.offset(from).limit(count)
    }

    /// Read request.
    pub fn build(&self) -> Result<RequestDescriptor> {
        self.compose(Method::Get, self.filters.clone(), None)
    }

    /// Create one row. The response carries the stored representation.
    pub fn build_insert(&self, model: &M) -> Result<RequestDescriptor> {
        let descriptor = describe::<M>()?;
        let body = write_payload(&descriptor, model, Write::Insert)?;
        self.compose(Method::Post, Vec::new(), Some(body))
    }

    /// Create several rows in one request.
    pub fn build_insert_many(&self, models: &[M]) -> Result<RequestDescriptor> {
        let descriptor = describe::<M>()?;
        if models.is_empty() {
            return Err(RequestBuildError::EmptyPayload {
                table: descriptor.table().to_string(),
            }
            .into());
        }
        let rows = models
            .iter()
            .map(|m| write_payload(&descriptor, m, Write::Insert))
            .collect::<Result<Vec<_>>>()?;
        self.compose(Method::Post, Vec::new(), Some(Json::Array(rows)))
    }

    /// Update the row identified by the model's primary key.
    pub fn build_update(&self, model: &M) -> Result<RequestDescriptor> {
        let descriptor = describe::<M>()?;
        let body = write_payload(&descriptor, model, Write::Update)?;
        let filters = key_filters(&descriptor, model)?;
        self.compose(Method::Patch, filters, Some(body))
    }

    /// Delete every row matching the builder's filters.
    pub fn build_delete(&self) -> Result<RequestDescriptor> {
        self.compose(Method::Delete, self.filters.clone(), None)
    }

    /// Delete the row identified by the model's primary key.
    pub fn build_delete_model(&self, model: &M) -> Result<RequestDescriptor> {
        let descriptor = describe::<M>()?;
        let filters = key_filters(&descriptor, model)?;
        self.compose(Method::Delete, filters, None)
    }

    fn compose(
        &self,
        method: Method,
        filters: Vec<Filter>,
        body: Option<Json>,
    ) -> Result<RequestDescriptor> {
        let descriptor = describe::<M>()?;
        let shape = SelectTree::parse(&descriptor, &self.select)?;

        let mut query = vec![("select".to_string(), shape.render())];
        for filter in &filters {
            filter.validate(&descriptor)?;
            query.push(filter.to_query_pair()?);
        }

        if let Some(order) = &self.order {
            if descriptor.column(&order.column).is_none() {
                return Err(RequestBuildError::UnknownColumn {
                    table: descriptor.table().to_string(),
                    column: order.column.clone(),
                }
                .into());
            }
            query.push(("order".to_string(), order.render()));
        }

        let (limit, offset) = match method {
            Method::Get => (self.limit, self.offset),
            _ => (None, None),
        };
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset".to_string(), offset.to_string()));
        }

        Ok(RequestDescriptor {
            method,
            table: descriptor.table().to_string(),
            shape,
            filters,
            order: self.order.clone(),
            limit,
            offset,
            query,
            body,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Write {
    Insert,
    Update,
}

/// Encode a model's columns as a JSON object. Edges are never written.
fn write_payload<M: Model>(descriptor: &TypeDescriptor, model: &M, write: Write) -> Result<Json> {
    let mut row = Map::new();
    for (name, value) in model.column_values() {
        let column = descriptor
            .column(name)
            .ok_or_else(|| RequestBuildError::UnknownColumn {
                table: descriptor.table().to_string(),
                column: name.to_string(),
            })?;
        let skipped = match write {
            Write::Insert => column.skip_insert,
            Write::Update => column.skip_update || column.primary_key,
        };
        if skipped {
            continue;
        }
        let json = coercion::encode(&value, &column.kind)
            .map_err(|e| e.at(&column.name).at(descriptor.table()))?;
        row.insert(column.name.clone(), json);
    }
    Ok(Json::Object(row))
}

/// Equality filters on every primary key column.
fn key_filters<M: Model>(descriptor: &Arc<TypeDescriptor>, model: &M) -> Result<Vec<Filter>> {
    let values = model.column_values();
    descriptor
        .primary_key()
        .map(|column| {
            let value = values
                .iter()
                .find(|(name, _)| *name == column.name)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_null())
                .ok_or_else(|| {
                    Error::from(RequestBuildError::MissingKeyValue {
                        table: descriptor.table().to_string(),
                        column: column.name.clone(),
                    })
                })?;
            Ok(Filter::new(column.name.clone(), Operator::Equals, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Ambiguous, AmbiguousUnhinted, Movie, MovieStatus, Person, Profile};
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn movie() -> Movie {
        Movie {
            id: 7,
            name: Some("The Empire Strikes Back".into()),
            status: Some(MovieStatus::OnDisplay),
            created_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            people: vec![Person {
                id: 1,
                first_name: "Mark".into(),
                last_name: "Hamill".into(),
                created_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
                movies: Vec::new(),
                profile: None,
            }],
        }
    }

    #[test]
    fn test_read_request() {
        let request = QueryBuilder::<Person>::new()
            .select(&["first_name", "profile.email"])
            .filter("profile.email", Operator::Equals, "x@y.io")
            .order("first_name", Ordering::Descending)
            .range(10, 19)
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/person");
        assert_eq!(request.select_clause(), "first_name,profile(email)");
        assert_eq!(request.query_param("profile.email"), Some("eq.x@y.io"));
        assert_eq!(request.query_param("order"), Some("first_name.desc"));
        assert_eq!(request.limit(), Some(10));
        assert_eq!(request.offset(), Some(10));
        assert_eq!(
            request.to_query_string(),
            "select=first_name%2Cprofile%28email%29&profile.email=eq.x%40y.io&order=first_name.desc&limit=10&offset=10"
        );
    }

    #[test]
    fn test_inverted_range_selects_nothing() {
        let request = QueryBuilder::<Movie>::new().range(10, 5).build().unwrap();
        assert_eq!(request.query_param("limit"), Some("0"));
        assert_eq!(request.query_param("offset"), Some("10"));

        let request = QueryBuilder::<Movie>::new().range(3, 3).build().unwrap();
        assert_eq!(request.limit(), Some(1));
    }

    #[test]
    fn test_nulls_ordering() {
        let request = QueryBuilder::<Movie>::new()
            .order_nulls("name", Ordering::Ascending, NullPosition::Last)
            .build()
            .unwrap();
        assert_eq!(request.query_param("order"), Some("name.asc.nullslast"));
    }

    #[test]
    fn test_unknown_order_column() {
        let result = QueryBuilder::<Movie>::new().order("nope", Ordering::Ascending).build();
        assert_matches!(
            result,
            Err(Error::RequestBuild(RequestBuildError::UnknownColumn { column, .. })) if column == "nope"
        );
    }

    #[test]
    fn test_insert_payload_has_no_edges() {
        let request = QueryBuilder::<Movie>::new().build_insert(&movie()).unwrap();
        let body = request.body().unwrap().as_object().unwrap();

        assert_eq!(request.method(), Method::Post);
        assert!(!body.contains_key("person"));
        // server generated
        assert!(!body.contains_key("id"));
        assert_eq!(body["status"], Json::from("OnDisplay"));
        assert_eq!(body["created_at"], Json::from("2021-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_update_targets_primary_key() {
        let request = QueryBuilder::<Movie>::new().build_update(&movie()).unwrap();
        let body = request.body().unwrap().as_object().unwrap();

        assert_eq!(request.method(), Method::Patch);
        assert_eq!(request.query_param("id"), Some("eq.7"));
        assert!(!body.contains_key("id"));
        assert_eq!(body["name"], Json::from("The Empire Strikes Back"));
    }

    #[test]
    fn test_composite_key_filters() {
        let profile = Profile {
            person_id: 3,
            email: "a@b.io".into(),
            created_at: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            person: None,
        };
        let request = QueryBuilder::<Profile>::new().build_delete_model(&profile).unwrap();
        assert_eq!(request.method(), Method::Delete);
        assert_eq!(request.query_param("person_id"), Some("eq.3"));
    }

    #[test]
    fn test_insert_many_requires_rows() {
        let result = QueryBuilder::<Movie>::new().build_insert_many(&[]);
        assert_matches!(result, Err(Error::RequestBuild(RequestBuildError::EmptyPayload { .. })));
    }

    #[test]
    fn test_ambiguous_embed_requires_hint() {
        assert!(QueryBuilder::<Ambiguous>::new().build().is_ok());
        assert_matches!(
            QueryBuilder::<AmbiguousUnhinted>::new().build(),
            Err(Error::RequestBuild(RequestBuildError::AmbiguousEmbed { target, .. })) if target == "movie"
        );
    }
}
