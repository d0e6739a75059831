//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderName, HeaderValue};

use crate::client::Client;
use crate::config::RequestConfig;
use crate::transport::{HyperTransport, Transport, TransportError};

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```ignore
/// use interpose_client::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .base_url("http://localhost:3000")
///     .timeout(Duration::from_secs(10))
///     .header("x-client", "interpose")
///     .build()?;
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    /// Configuration merged under every call.
    defaults: RequestConfig,
    /// Transport to use instead of a default [`HyperTransport`].
    transport: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("defaults", &self.defaults)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientBuilder {
    /// Create a new builder with empty defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prefix joined with relative URLs.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let builder = ClientBuilder::new().base_url("http://localhost:3000");
    /// ```
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.defaults.base_url = Some(base_url.into());
        self
    }

    /// Set the default logical deadline for every call.
    ///
    /// A per-call timeout takes precedence.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Add a default header sent with every call.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        self.defaults = self.defaults.header(name, value);
        self
    }

    /// Replace all defaults.
    pub fn defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Use a custom transport.
    ///
    /// Any `Fn(http::Request<Bytes>) -> impl Future<Output = Result<RawResponse, TransportError>>`
    /// closure works, which makes it easy to test interceptors without a
    /// server.
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build the client.
    ///
    /// Without a custom transport this creates a [`HyperTransport`], which
    /// fails when no TLS configuration can be assembled.
    pub fn build(self) -> Result<Client, ClientBuildError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new()?),
        };
        Ok(Client::from_parts(self.defaults, transport))
    }
}

/// Error that can occur when building a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// Failed to create the default transport.
    #[error("failed to create HTTP transport: {0}")]
    Transport(#[from] TransportError),
}
