//! Shared helpers for integration tests: a recording transport with canned
//! PostgREST responses, and the fixture schema.

#![allow(dead_code)]

pub mod models;

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use postgrest_orm::{Client, Method, RawResponse, Transport};
use serde_json::Value as Json;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; `RUST_LOG=postgrest_orm=trace` to see events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Json>,
}

impl SentRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Replays queued responses in order and records every request.
/// With nothing queued it answers `200 []`.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: Json) {
        self.responses.lock().push_back(RawResponse {
            status,
            body: body.to_string(),
        });
    }

    pub fn respond_raw(&self, status: u16, body: &str) {
        self.responses.lock().push_back(RawResponse {
            status,
            body: body.to_string(),
        });
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SentRequest> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Json>,
    ) -> anyhow::Result<RawResponse> {
        self.sent.lock().push(SentRequest {
            method,
            path: path.to_string(),
            query: query.to_vec(),
            body: body.cloned(),
        });
        Ok(self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| RawResponse {
                status: 200,
                body: "[]".to_string(),
            }))
    }
}

/// A client over a fresh mock, plus the mock for inspection.
pub fn mock_client() -> (Client, Arc<MockTransport>) {
    init_tracing();
    let mock = MockTransport::new();
    (Client::new(mock.clone()), mock)
}
