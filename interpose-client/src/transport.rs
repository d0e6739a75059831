//! HTTP transport layer.
//!
//! The pipeline never opens sockets itself: the dispatcher hands a fully
//! built `http::Request<Bytes>` to a [`Transport`] and gets back a
//! [`RawResponse`], the raw handle later attached to responses and failures.
//!
//! [`HyperTransport`] is the default implementation, using hyper_util's
//! legacy client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//! - Tower service integration for middleware
//!
//! Any `Fn(http::Request<Bytes>) -> impl Future<Output = Result<RawResponse, TransportError>>`
//! closure is also a transport, which is how tests inject fakes.
//!
//! # Feature Flags
//!
//! TLS support requires enabling the appropriate features:
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use interpose_client::transport::{HyperTransport, RawResponse};
//! use std::time::Duration;
//!
//! // Create with default settings (uses default TLS if features enabled)
//! let transport = HyperTransport::new()?;
//!
//! // Or use the builder for customization
//! let transport = HyperTransport::builder()
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//!
//! // Or a closure
//! let fake = |_req: http::Request<bytes::Bytes>| async {
//!     Ok::<_, TransportError>(RawResponse::new(http::StatusCode::OK, "{}"))
//! };
//! ```

mod body;
mod connector;
mod hyper;

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, StatusCode, Version};

pub use body::TransportBody;
pub use connector::{build_https_connector, default_tls_config, has_tls_support};
pub use hyper::{HyperTransport, HyperTransportBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

/// Performs one network exchange.
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and resolve once the full response body is available.
    fn send(&self, request: http::Request<Bytes>)
    -> BoxFuture<'static, Result<RawResponse, TransportError>>;
}

impl<F, Fut> Transport for F
where
    F: Fn(http::Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RawResponse, TransportError>> + Send + 'static,
{
    fn send(
        &self,
        request: http::Request<Bytes>,
    ) -> BoxFuture<'static, Result<RawResponse, TransportError>> {
        Box::pin(self(request))
    }
}

// ============================================================================
// Raw Response
// ============================================================================

/// The raw outcome of an exchange, as the transport saw it.
///
/// Headers are kept as a single text blob of `Key: value` lines; the
/// dispatcher parses them into the response's header map.
#[derive(Clone, Debug)]
pub struct RawResponse {
    status: StatusCode,
    status_text: String,
    raw_headers: String,
    version: Version,
    body: Bytes,
}

impl RawResponse {
    /// Create a raw response with the canonical status text and no headers.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            raw_headers: String::new(),
            version: Version::HTTP_11,
            body: body.into(),
        }
    }

    /// Build a raw response from received parts and a collected body.
    ///
    /// The status text is the reason phrase the server sent when hyper
    /// recorded one, otherwise the canonical reason.
    pub fn from_parts(parts: http::response::Parts, body: Bytes) -> Self {
        let status_text = parts
            .extensions
            .get::<::hyper::ext::ReasonPhrase>()
            .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
            .or_else(|| parts.status.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status: parts.status,
            status_text,
            raw_headers: render_raw_headers(&parts.headers),
            version: parts.version,
            body,
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Replace the header blob with `headers` rendered as text.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        self.raw_headers = render_raw_headers(headers);
        self
    }

    /// Replace the header blob verbatim.
    pub fn with_raw_headers(mut self, raw_headers: impl Into<String>) -> Self {
        self.raw_headers = raw_headers.into();
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// All response headers as `Key: value` lines separated by CRLF.
    pub fn raw_headers(&self) -> &str {
        &self.raw_headers
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Render `headers` as `Key: value` lines separated by CRLF.
///
/// Values that are not visible ASCII are rendered lossily.
pub fn render_raw_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n")
}

// ============================================================================
// Transport Error
// ============================================================================

/// A failure below HTTP: connect, DNS, TLS, or a broken connection.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    connect: bool,
    timeout: bool,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Create a transport error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            connect: false,
            timeout: false,
            source: None,
        }
    }

    /// Create a transport error wrapping `source`.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            source: Some(source.into()),
            ..Self::new(message)
        }
    }

    /// Mark this error as a connection failure.
    pub fn connect(mut self) -> Self {
        self.connect = true;
        self
    }

    /// Mark this error as a transport-level timeout.
    pub fn timeout(mut self) -> Self {
        self.timeout = true;
        self
    }

    /// Whether the connection could not be established.
    pub fn is_connect(&self) -> bool {
        self.connect
    }

    /// Whether the transport itself gave up waiting.
    pub fn is_timeout(&self) -> bool {
        self.timeout
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} {}", self.version, self.status.as_u16(), self.status_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_render_raw_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));

        let raw = render_raw_headers(&headers);
        let lines: Vec<_> = raw.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.contains(&"content-type: application/json"));
        assert!(lines.contains(&"set-cookie: a=1"));
        assert!(lines.contains(&"set-cookie: b=2"));
    }

    #[test]
    fn test_raw_response_defaults() {
        let raw = RawResponse::new(StatusCode::NOT_FOUND, "missing");
        assert_eq!(raw.status(), StatusCode::NOT_FOUND);
        assert_eq!(raw.status_text(), "Not Found");
        assert_eq!(raw.raw_headers(), "");
        assert_eq!(raw.body().as_ref(), b"missing");
        assert_eq!(raw.to_string(), "HTTP/1.1 404 Not Found");
    }

    fn parts(status: u16) -> http::response::Parts {
        http::Response::builder()
            .status(status)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_from_parts_prefers_server_reason() {
        let raw = RawResponse::from_parts(parts(299), Bytes::new());
        assert_eq!(raw.status_text(), "");

        let mut custom = parts(299);
        custom
            .extensions
            .insert(::hyper::ext::ReasonPhrase::from_static(b"Mostly Fine"));
        let raw = RawResponse::from_parts(custom, Bytes::new());
        assert_eq!(raw.status_text(), "Mostly Fine");

        let raw = RawResponse::from_parts(parts(404), Bytes::new());
        assert_eq!(raw.status_text(), "Not Found");
    }

    #[tokio::test]
    async fn test_closure_is_transport() {
        let transport = |request: http::Request<Bytes>| async move {
            Ok::<_, TransportError>(RawResponse::new(StatusCode::OK, request.into_body()))
        };
        let request = http::Request::new(Bytes::from_static(b"echo"));
        let raw = Transport::send(&transport, request).await.unwrap();
        assert_eq!(raw.body().as_ref(), b"echo");
    }

    #[test]
    fn test_transport_error_hints() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = TransportError::with_source("connect failed", io).connect();
        assert!(err.is_connect());
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "connect failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
