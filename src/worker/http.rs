//! HTTP transport for job fetches

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::jobs::{HeadersMap, RequestBody};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Response with its body decoded to text, whatever the status
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Transport capability used by the executor
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// One GET request, no retries
    async fn fetch(
        &self,
        url: &str,
        headers: &HeadersMap,
        body: Option<&RequestBody>,
        timeout: Duration,
    ) -> Result<FetchResponse>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("slowmo/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
        }
    }
}

/// reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HTTP client
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        Ok(Self { client })
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_builder() {
        FetchError::InvalidRequest(error.to_string())
    } else {
        FetchError::Network(error.to_string())
    }
}

/// Flatten a JSON form into urlencoded pairs.
///
/// Strings go as-is, other scalars as their JSON text, arrays repeat the
/// key once per element and nulls are left out.
pub fn form_pairs(fields: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = form_value(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = form_value(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn form_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &HeadersMap,
        body: Option<&RequestBody>,
        timeout: Duration,
    ) -> Result<FetchResponse> {
        debug!(url, "Starting fetch");

        let mut request = self.client.get(url).timeout(timeout);

        for (name, value) in headers {
            request = request.header(name, value);
        }

        request = match body {
            Some(RequestBody::Raw(raw)) => request.body(raw.clone()),
            Some(RequestBody::Form(fields)) => request.form(&form_pairs(fields)),
            None => request,
        };

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();

        // Honours the Content-Type charset, UTF-8 otherwise
        let body = response.text().await.map_err(classify)?;

        debug!(url, status, size = body.len(), "Fetch completed");

        Ok(FetchResponse { status, body })
    }
}
