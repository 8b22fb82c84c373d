//! HTTP transport used by [`TuyaClient`](crate::TuyaClient).
//!
//! The client only needs "send these headers and this JSON body to this path
//! and hand me back the decoded JSON", so the seam is the small [`Transport`]
//! trait. [`HttpTransport`] is the `reqwest` implementation; tests substitute
//! their own.

use crate::error::{Result, TuyaError};
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;

/// Fixed per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A fully signed call, ready to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute API path including the canonical query, e.g. `/v1.0/devices/x`.
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
    /// Serialized JSON body, `None` for the token handshake.
    pub body: Option<String>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the decoded JSON body, or `None` when the
    /// server answered with an empty body or JSON `null`.
    async fn send(&self, request: HttpRequest) -> Result<Option<Value>>;
}

/// `reqwest`-backed transport bound to a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Uses a caller-configured `reqwest::Client` (proxies, custom TLS, ...).
    pub fn with_client<S: Into<String>>(base_url: S, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method, url);

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| TuyaError::Request(format!("invalid header {}: {}", name, e)))?;
            headers.insert(HeaderName::from_static(*name), value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = self.client.request(request.method, &url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}
