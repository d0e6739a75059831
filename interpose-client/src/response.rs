//! Response description.
//!
//! This module provides [`Response`], the value response interceptors
//! receive and [`Client::request`](crate::Client::request) resolves with.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::RequestConfig;
use crate::error::Error;
use crate::transport::RawResponse;

/// Outcome of an exchange that reached the server.
///
/// `data` is the body exactly as the transport yielded it. Response
/// interceptors may rewrite any field, including `data`.
///
/// # Example
///
/// ```ignore
/// let response = client.get("/api/auth/status", RequestConfig::new()).await?;
///
/// println!("{} {}", response.status, response.status_text);
/// if let Some(value) = response.header("content-type") {
///     println!("Content type: {}", value);
/// }
/// let status: serde_json::Value = response.json()?;
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// Response body.
    pub data: Bytes,
    /// Numeric status code.
    pub status: StatusCode,
    /// Reason phrase.
    pub status_text: String,
    /// Response headers, names lower-cased.
    pub headers: HeaderMap,
    /// The configuration that produced this response.
    pub config: RequestConfig,
    /// The raw transport handle.
    pub request: Option<Arc<RawResponse>>,
}

impl Response {
    /// Create a response with the canonical status text and nothing else.
    pub fn new(status: StatusCode, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            config: RequestConfig::default(),
            request: None,
        }
    }

    /// Decode the body as JSON.
    ///
    /// A body that does not decode yields an [`Error`] with code
    /// `ERR_BAD_RESPONSE`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.data).map_err(|e| Error::decode(self, e))
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Get a header value by name.
    ///
    /// Returns `None` if the header is not present or is not valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the status is in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Transform the body, preserving everything else.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let wrapped = response.map_data(|data| {
    ///     let mut out = b"{\"data\":".to_vec();
    ///     out.extend_from_slice(&data);
    ///     out.push(b'}');
    ///     out.into()
    /// });
    /// ```
    pub fn map_data<F>(self, f: F) -> Response
    where
        F: FnOnce(Bytes) -> Bytes,
    {
        Response {
            data: f(self.data),
            ..self
        }
    }
}
