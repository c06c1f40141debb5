//! HTTP transport for PostgREST requests

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::query::Method;

/// Status and raw body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the raw response. Non-2xx statuses are
/// responses, not errors; only failures to talk to the server are.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Json>,
    ) -> Result<RawResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Json>,
    ) -> Result<RawResponse> {
        (**self).send(method, path, query, body).await
    }
}

/// Transport backed by `reqwest`
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    api_key: Option<String>,
    schema: Option<String>,
    headers: HashMap<String, String>,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            schema: config.schema.clone(),
            headers: config.headers.clone(),
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Json>,
    ) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        let verb = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self.client.request(verb, &url).query(query);

        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }
        if let Some(schema) = &self.schema {
            let profile = if method.is_write() {
                "Content-Profile"
            } else {
                "Accept-Profile"
            };
            request = request.header(profile, schema);
        }
        if method.is_write() {
            request = request.header("Prefer", "return=representation");
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(method = %method, url = %url, "Sending PostgREST request");

        let resp = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} {}", method, url))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("Failed to read PostgREST response body")?;

        if !status.is_success() {
            warn!(status = %status, url = %url, body = %body, "PostgREST request failed");
        }

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}
