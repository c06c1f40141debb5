//! Typed table access on top of a [`Transport`].
//!
//! ```rust,ignore
//! let client = Client::from_env()?;
//! let movies = client
//!     .table::<Movie>()
//!     .filter("name", Operator::Equals, "Top Gun")
//!     .get()
//!     .await?;
//! ```

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::materialize::materialize_with;
use crate::query::{Filter, NullPosition, Operator, Ordering, QueryBuilder, RequestDescriptor};
use crate::schema::Model;
use crate::transport::{HttpTransport, RawResponse, Transport};
use crate::value::Value;

/// Entry point for typed requests.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config).map_err(Error::Transport)?;
        Ok(Self::new(transport))
    }

    /// Client configured from `SUPABASE_URL`, `SUPABASE_PUBLIC_KEY` and
    /// `POSTGREST_SCHEMA`.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env().map_err(Error::Transport)?;
        Self::from_config(&config)
    }

    pub fn table<M: Model>(&self) -> Table<'_, M> {
        Table {
            client: self,
            query: QueryBuilder::new(),
        }
    }

    /// Send a prepared request and materialize the response as `M`.
    pub async fn execute<M: Model>(&self, request: &RequestDescriptor) -> Result<ModeledResponse<M>> {
        let path = request.path();
        debug!(
            method = %request.method(),
            path = %path,
            query = %request.to_query_string(),
            "Executing request"
        );

        let response = self
            .transport
            .send(request.method(), &path, request.query(), request.body())
            .await
            .map_err(Error::Transport)?;

        if !response.is_success() {
            return Err(api_error(path, response));
        }

        let raw: Json = if response.body.trim().is_empty() {
            Json::Null
        } else {
            serde_json::from_str(&response.body)?
        };

        let records = materialize_with(&raw, request.shape())?;
        let models = records
            .into_iter()
            .map(M::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ModeledResponse {
            status: response.status,
            content: response.body,
            models,
        })
    }
}

/// Decoded records of a successful response, with the raw body.
#[derive(Debug, Clone)]
pub struct ModeledResponse<M> {
    pub status: u16,
    pub content: String,
    pub models: Vec<M>,
}

impl<M> ModeledResponse<M> {
    /// First record, if any.
    pub fn model(&self) -> Option<&M> {
        self.models.first()
    }

    pub fn into_model(self) -> Option<M> {
        self.models.into_iter().next()
    }
}

/// Requests against the table backing `M`.
pub struct Table<'c, M: Model> {
    client: &'c Client,
    query: QueryBuilder<M>,
}

impl<'c, M: Model> Table<'c, M> {
    pub fn select<S: AsRef<str>>(mut self, entries: &[S]) -> Self {
        self.query = self.query.select(entries);
        self
    }

    pub fn filter(mut self, path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.query = self.query.filter(path, operator, value);
        self
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query = self.query.eq(path, value);
        self
    }

    pub fn not(mut self, path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.query = self.query.not(path, operator, value);
        self
    }

    pub fn or(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.query = self.query.or(filters);
        self
    }

    pub fn and(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.query = self.query.and(filters);
        self
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.query = self.query.matching(filter);
        self
    }

    pub fn order(mut self, column: impl Into<String>, ordering: Ordering) -> Self {
        self.query = self.query.order(column, ordering);
        self
    }

    pub fn order_nulls(mut self, column: impl Into<String>, ordering: Ordering, nulls: NullPosition) -> Self {
        self.query = self.query.order_nulls(column, ordering, nulls);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.query = self.query.range(from, to);
        self
    }

    /// The request `get` would send.
    pub fn request(&self) -> Result<RequestDescriptor> {
        self.query.build()
    }

    pub async fn get(self) -> Result<ModeledResponse<M>> {
        let request = self.query.build()?;
        self.client.execute(&request).await
    }

    /// At most one record.
    pub async fn single(self) -> Result<Option<M>> {
        let request = self.query.limit(1).build()?;
        Ok(self.client.execute(&request).await?.into_model())
    }

    pub async fn insert(self, model: &M) -> Result<ModeledResponse<M>> {
        let request = self.query.build_insert(model)?;
        self.client.execute(&request).await
    }

    pub async fn insert_many(self, models: &[M]) -> Result<ModeledResponse<M>> {
        let request = self.query.build_insert_many(models)?;
        self.client.execute(&request).await
    }

    /// Update the row with the model's primary key.
    pub async fn update(self, model: &M) -> Result<ModeledResponse<M>> {
        let request = self.query.build_update(model)?;
        self.client.execute(&request).await
    }

    /// Delete every row matching the filters.
    pub async fn delete(self) -> Result<ModeledResponse<M>> {
        let request = self.query.build_delete()?;
        self.client.execute(&request).await
    }

    /// Delete the row with the model's primary key.
    pub async fn delete_model(self, model: &M) -> Result<ModeledResponse<M>> {
        let request = self.query.build_delete_model(model)?;
        self.client.execute(&request).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Map a non-success response onto [`Error::Api`], keeping PostgREST's
/// error fields when the body carries them.
fn api_error(path: String, response: RawResponse) -> Error {
    let parsed: ApiErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
    warn!(
        status = response.status,
        path = %path,
        code = ?parsed.code,
        "Request rejected by server"
    );
    Error::Api {
        status: response.status,
        path,
        message: parsed.message.unwrap_or(response.body),
        code: parsed.code,
        details: parsed.details,
        hint: parsed.hint,
    }
}
