//! Pipeline failure type.
//!
//! This module provides [`Error`], the single failure value produced by every
//! stage of [`Client::request`](crate::Client::request): interceptors, the
//! dispatcher, and the transport underneath it.
//!
//! An [`Error`] always says *where* the call failed through its [`ErrorKind`],
//! and carries whatever context existed at that point: the request
//! configuration in flight, a machine-readable [`ErrorCode`], the raw
//! transport handle, and, only for status failures, the partial [`Response`].

use std::fmt;
use std::sync::Arc;

use crate::config::RequestConfig;
use crate::response::Response;
use crate::transport::RawResponse;

type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Machine-readable failure codes.
///
/// The string forms match the codes browser HTTP clients report, so logs and
/// assertions read the same on both sides of an API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The exchange never completed (connection refused, DNS failure, reset).
    ConnectionAborted,
    /// The configured timeout elapsed before the exchange completed.
    TimedOut,
    /// The request could not be built (invalid URL, header, or body).
    BadRequest,
    /// The response body could not be decoded into the requested type.
    BadResponse,
}

impl ErrorCode {
    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionAborted => "ECONNABORTED",
            ErrorCode::TimedOut => "ETIMEDOUT",
            ErrorCode::BadRequest => "ERR_BAD_REQUEST",
            ErrorCode::BadResponse => "ERR_BAD_RESPONSE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline stage a failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The exchange never reached the server or never completed.
    Transport,
    /// The logical deadline was exceeded.
    Timeout,
    /// The server answered with a status outside `[200, 300)`.
    Status,
    /// A registered interceptor raised the failure.
    Interceptor,
    /// The request description could not be turned into an HTTP request.
    InvalidRequest,
    /// A response body could not be decoded.
    Decode,
}

/// Structured failure of a request pipeline.
///
/// Use [`is_failure`] or [`as_failure`] to recognise this type behind a
/// `dyn Error` (for instance inside an `anyhow::Error`), and the accessors to
/// branch on what is available: [`response`](Error::response) is only present
/// for status failures, [`code`](Error::code) only when a code applies.
///
/// # Example
///
/// ```ignore
/// match client.get("/api/protected", RequestConfig::new()).await {
///     Ok(response) => println!("{}", response.text()),
///     Err(err) if err.is_status() => {
///         let response = err.response().unwrap();
///         println!("server said {}: {}", response.status, response.text());
///     }
///     Err(err) => println!("never reached the server: {err} ({:?})", err.code()),
/// }
/// ```
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    config: Option<Box<RequestConfig>>,
    code: Option<ErrorCode>,
    request: Option<Arc<RawResponse>>,
    response: Option<Box<Response>>,
    #[source]
    source: Option<SharedSource>,
}

impl Error {
    /// Create a failure raised by an interceptor.
    ///
    /// The client attaches the configuration in flight if the interceptor did
    /// not supply one with [`with_config`](Error::with_config).
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self::with_kind(ErrorKind::Interceptor, message)
    }

    fn with_kind<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            config: None,
            code: None,
            request: None,
            response: None,
            source: None,
        }
    }

    /// A transport failure: the exchange never completed.
    pub(crate) fn transport<E>(config: RequestConfig, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::with_kind(ErrorKind::Transport, "Network Error")
            .with_config(config)
            .with_code(ErrorCode::ConnectionAborted)
            .with_source(source)
    }

    /// A timeout failure: no response description is available.
    pub(crate) fn timeout(config: RequestConfig) -> Self {
        Self::with_kind(ErrorKind::Timeout, "Request timed out")
            .with_config(config)
            .with_code(ErrorCode::TimedOut)
    }

    /// A status failure carrying the partial response.
    pub(crate) fn status(response: Response) -> Self {
        let mut err = Self::with_kind(
            ErrorKind::Status,
            format!(
                "Request failed with status code {}",
                response.status.as_u16()
            ),
        );
        err.config = Some(Box::new(response.config.clone()));
        err.request = response.request.clone();
        err.response = Some(Box::new(response));
        err
    }

    /// The request description could not be turned into an HTTP request.
    pub(crate) fn invalid_request<S: Into<String>>(config: RequestConfig, message: S) -> Self {
        Self::with_kind(ErrorKind::InvalidRequest, message)
            .with_config(config)
            .with_code(ErrorCode::BadRequest)
    }

    /// A response body failed to decode.
    pub(crate) fn decode<E>(response: &Response, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut err = Self::with_kind(
            ErrorKind::Decode,
            format!("failed to decode response body: {source}"),
        )
        .with_config(response.config.clone())
        .with_code(ErrorCode::BadResponse)
        .with_source(source);
        err.request = response.request.clone();
        err
    }

    /// Attach the request configuration this failure belongs to.
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(Box::new(config));
        self
    }

    /// Attach a machine-readable code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a response description.
    ///
    /// Interceptors that reject a successful response (for example on an
    /// application-level error envelope) use this to keep the response
    /// reachable from the failure.
    pub fn with_response(mut self, response: Response) -> Self {
        if self.config.is_none() {
            self.config = Some(Box::new(response.config.clone()));
        }
        if self.request.is_none() {
            self.request = response.request.clone();
        }
        self.response = Some(Box::new(response));
        self
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Fill in the configuration in flight when none was attached.
    pub(crate) fn or_config(mut self, config: &RequestConfig) -> Self {
        if self.config.is_none() {
            self.config = Some(Box::new(config.clone()));
        }
        self
    }

    /// Get the stage this failure originated from.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the request configuration in flight when the failure occurred.
    pub fn config(&self) -> Option<&RequestConfig> {
        self.config.as_deref()
    }

    /// Get the machine-readable code, if one applies.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the raw transport handle, if the exchange produced one.
    pub fn request(&self) -> Option<&RawResponse> {
        self.request.as_deref()
    }

    /// Get the partial response.
    ///
    /// Present when the server answered with a non-success status, absent
    /// for transport and timeout failures.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Take the partial response out of this failure.
    pub fn into_response(self) -> Option<Response> {
        self.response.map(|response| *response)
    }

    /// Whether the server answered with a non-success status.
    pub fn is_status(&self) -> bool {
        self.kind == ErrorKind::Status
    }

    /// Whether the configured timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Whether the exchange never completed.
    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

/// Returns whether `err` is a pipeline [`Error`].
///
/// This is the discriminator callers use instead of inspecting an error's
/// shape, e.g. when failures travel as `anyhow::Error` or `Box<dyn Error>`.
pub fn is_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    err.is::<Error>()
}

/// Downcast `err` to a pipeline [`Error`].
pub fn as_failure<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a Error> {
    err.downcast_ref::<Error>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use std::error::Error as _;

    fn config() -> RequestConfig {
        RequestConfig::new().url("/things")
    }

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::ConnectionAborted.as_str(), "ECONNABORTED");
        assert_eq!(ErrorCode::TimedOut.as_str(), "ETIMEDOUT");
        assert_eq!(ErrorCode::BadRequest.to_string(), "ERR_BAD_REQUEST");
        assert_eq!(ErrorCode::BadResponse.to_string(), "ERR_BAD_RESPONSE");
    }

    #[test]
    fn test_timeout_error() {
        let err = Error::timeout(config());
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Request timed out");
        assert_eq!(err.code(), Some(ErrorCode::TimedOut));
        assert!(err.response().is_none());
        assert_eq!(err.config().unwrap().url.as_deref(), Some("/things"));
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::transport(config(), io);
        assert!(err.is_transport());
        assert_eq!(err.message(), "Network Error");
        assert_eq!(err.code(), Some(ErrorCode::ConnectionAborted));
        assert!(err.response().is_none());
        assert_eq!(err.source().unwrap().to_string(), "refused");
    }

    #[test]
    fn test_status_error_embeds_status() {
        let mut response = Response::new(StatusCode::NOT_FOUND, Bytes::from_static(b"missing"));
        response.config = config();
        let err = Error::status(response);

        assert!(err.is_status());
        assert!(err.message().contains("404"));
        assert!(err.code().is_none());
        let response = err.response().unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "missing");
        assert_eq!(err.config().unwrap().url.as_deref(), Some("/things"));
    }

    #[test]
    fn test_interceptor_error_defaults() {
        let err = Error::new("denied");
        assert_eq!(err.kind(), ErrorKind::Interceptor);
        assert!(err.config().is_none());

        let err = err.or_config(&config());
        assert_eq!(err.config().unwrap().url.as_deref(), Some("/things"));

        // An explicit config is never overwritten.
        let err = Error::new("denied")
            .with_config(RequestConfig::new().url("/mine"))
            .or_config(&config());
        assert_eq!(err.config().unwrap().url.as_deref(), Some("/mine"));
    }

    #[test]
    fn test_discriminator() {
        let failure: Box<dyn std::error::Error + Send + Sync> = Box::new(Error::new("boom"));
        assert!(is_failure(failure.as_ref()));
        assert_eq!(as_failure(failure.as_ref()).unwrap().message(), "boom");

        let other: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::other("boom"));
        assert!(!is_failure(other.as_ref()));
        assert!(as_failure(other.as_ref()).is_none());
    }

    #[test]
    fn test_into_response() {
        let response = Response::new(StatusCode::BAD_GATEWAY, Bytes::new());
        let err = Error::new("upstream").with_response(response);
        assert_eq!(err.into_response().unwrap().status, StatusCode::BAD_GATEWAY);
    }
}
