//! Transport dispatcher.
//!
//! Turns a fully merged [`RequestConfig`] into one network exchange and
//! classifies the outcome: a [`Response`] for statuses in `[200, 300)`, an
//! [`Error`] for everything else.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::HeaderMap;
use url::Url;

use crate::config::{RequestBody, RequestConfig};
use crate::error::Error;
use crate::response::Response;
use crate::transport::Transport;

#[derive(Clone)]
pub(crate) struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Perform one exchange for `config`.
    pub(crate) async fn dispatch(&self, config: RequestConfig) -> Result<Response, Error> {
        let request = match build_request(&config) {
            Ok(request) => request,
            Err(message) => return Err(Error::invalid_request(config, message)),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method(),
            uri = %request.uri(),
            "dispatching request"
        );

        let exchange = self.transport.send(request);
        let outcome = match config.timeout.filter(|t| !t.is_zero()) {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(timeout = ?limit, "request timed out");
                    return Err(Error::timeout(config));
                }
            },
            None => exchange.await,
        };

        let raw = match outcome {
            Ok(raw) => Arc::new(raw),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, connect = err.is_connect(), "transport failed");
                return Err(Error::transport(config, err));
            }
        };

        let response = Response {
            data: raw.body().clone(),
            status: raw.status(),
            status_text: raw.status_text().to_string(),
            headers: parse_raw_headers(raw.raw_headers()),
            config,
            request: Some(raw),
        };

        if response.is_success() {
            Ok(response)
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(status = response.status.as_u16(), "request failed with status");
            Err(Error::status(response))
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// Build the outgoing HTTP request, or describe why it cannot be built.
fn build_request(config: &RequestConfig) -> Result<http::Request<Bytes>, String> {
    let url = resolve_url(config)?;

    let mut headers = config.headers.clone();
    let body = match &config.data {
        None => Bytes::new(),
        Some(RequestBody::Raw(bytes)) => bytes.clone(),
        Some(RequestBody::Json(value)) => encode_json(value, &mut headers)?,
    };

    let mut builder = http::Request::builder()
        .method(http::Method::from(config.effective_method()))
        .uri(url.as_str());
    if let Some(target) = builder.headers_mut() {
        *target = headers;
    }
    builder
        .body(body)
        .map_err(|e| format!("failed to build request: {}", e))
}

/// Join `url` onto `base_url` unless it is already absolute, then append
/// query parameters.
fn resolve_url(config: &RequestConfig) -> Result<Url, String> {
    let target = config.url.as_deref().unwrap_or_default();

    let mut url = match Url::parse(target) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = config
                .base_url
                .as_deref()
                .ok_or_else(|| format!("relative URL `{}` requires a base URL", target))?;
            let joined = if target.is_empty() {
                base.to_string()
            } else {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    target.trim_start_matches('/')
                )
            };
            Url::parse(&joined).map_err(|e| format!("invalid URL `{}`: {}", joined, e))?
        }
        Err(e) => return Err(format!("invalid URL `{}`: {}", target, e)),
    };

    if let Some(params) = config.params.as_ref().filter(|p| !p.is_empty()) {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
    Ok(url)
}

/// Serialize a structured body. Objects and arrays are sent as JSON with a
/// content type unless the caller set one; scalars are sent as their text.
fn encode_json(value: &serde_json::Value, headers: &mut HeaderMap) -> Result<Bytes, String> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(Bytes::new()),
        Value::String(text) => Ok(Bytes::from(text.clone())),
        Value::Bool(_) | Value::Number(_) => Ok(Bytes::from(value.to_string())),
        Value::Object(_) | Value::Array(_) => {
            let encoded = serde_json::to_vec(value)
                .map_err(|e| format!("failed to serialize request body: {}", e))?;
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Ok(Bytes::from(encoded))
        }
    }
}

/// Parse a `Key: value` header blob into a map with lower-cased names.
///
/// Lines without `": "`, with an empty name or value, or that are not valid
/// header syntax are skipped. A repeated name keeps every value in order.
pub(crate) fn parse_raw_headers(raw: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for line in raw.lines() {
        let Some((name, value)) = line.split_once(": ") else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()) else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        headers.append(name, value);
    }
    headers
}
