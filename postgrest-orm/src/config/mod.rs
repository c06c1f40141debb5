//! Client configuration management

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use url::Url;

/// Default local Supabase API URL
pub const DEFAULT_SUPABASE_URL: &str = "http://localhost:54321";

/// PostgREST endpoint below the Supabase API URL
const REST_PATH: &str = "/rest/v1";

/// Connection settings for a PostgREST endpoint
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST endpoint, e.g. `http://localhost:54321/rest/v1`
    pub base_url: String,

    /// API key, sent as `apikey` and as a bearer token
    pub api_key: Option<String>,

    /// Non-default schema (`Accept-Profile` / `Content-Profile`)
    pub schema: Option<String>,

    /// Extra headers sent with every request
    pub headers: HashMap<String, String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            schema: None,
            headers: HashMap::new(),
        }
    }

    /// Load configuration from environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        // An explicit PostgREST URL wins over the Supabase API URL
        let base_url = match env::var("POSTGREST_URL") {
            Ok(url) => url,
            Err(_) => {
                let supabase_url = env::var("SUPABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_SUPABASE_URL.to_string());
                format!("{}{}", supabase_url.trim_end_matches('/'), REST_PATH)
            }
        };

        let config = Self {
            base_url,
            api_key: env::var("SUPABASE_PUBLIC_KEY").ok(),
            schema: env::var("POSTGREST_SCHEMA").ok(),
            headers: HashMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check the endpoint is an absolute http(s) URL
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid PostgREST URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Unsupported URL scheme for PostgREST: {}", url.scheme());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = ClientConfig::new("http://localhost:3000")
            .with_api_key("anon")
            .with_schema("personal")
            .with_header("x-client-info", "tests");

        assert_eq!(config.api_key.as_deref(), Some("anon"));
        assert_eq!(config.schema.as_deref(), Some("personal"));
        assert_eq!(config.headers.get("x-client-info").map(String::as_str), Some("tests"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        assert!(ClientConfig::new("not a url").validate().is_err());
        assert!(ClientConfig::new("ftp://example.com/rest/v1").validate().is_err());
    }
}
