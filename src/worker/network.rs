//! # Network Seam
//!
//! Everything that leaves the process goes through the [`Network`] trait:
//! fragment fetches on the page, strategy fetches and offline replays in
//! the worker. [`HttpNetwork`] is the reqwest-backed implementation.
//!
//! A transport failure (connection refused, DNS, timeout) is reported as
//! `SharedError::NetworkError`, which callers treat as "offline". A request
//! reqwest refuses to build (bad header value, bad URL) is a
//! `SharedError::ValidationError` and is never queued for replay. A server
//! that answers with a non-2xx status is *not* an error at this layer.

use crate::shared::{Method, Request, Response, SharedError};
use async_trait::async_trait;
use std::time::Duration;

/// Fetch abstraction shared by the page and the worker
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request
    async fn fetch(&self, request: &Request) -> Result<Response, SharedError>;
}

/// reqwest-backed network
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNetwork {
    /// Create a network rooted at `base_url` (used for site-relative paths)
    pub fn new(base_url: impl Into<String>) -> Result<Self, SharedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SharedError::network("", format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Absolute URL for a request target
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), url)
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), url)
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Only transport failures count as offline
///
/// A request reqwest refuses to build (bad header value, bad URL) can never
/// succeed on replay, so it is a `ValidationError`.
fn send_error(url: &str, e: reqwest::Error) -> SharedError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        SharedError::network(url, e.to_string())
    } else if e.is_builder() {
        SharedError::validation("request", format!("Invalid request to {}: {}", url, e))
    } else {
        SharedError::validation("request", format!("Request to {} failed: {}", url, e))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, SharedError> {
        let url = self.resolve(&request.url);
        tracing::debug!("[Network] {} {}", request.method, url);

        let mut builder = self.client.request(to_reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| send_error(&url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| SharedError::network(&url, format!("Failed to read body: {}", e)))?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
