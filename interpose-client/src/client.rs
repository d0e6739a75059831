//! The interceptor pipeline client.
//!
//! A [`Client`] merges each call's configuration over its defaults, runs the
//! request interceptors, dispatches exactly one exchange, then runs the
//! response interceptors. Every stage sees either the value produced so far
//! or the failure produced so far, and may transform, abort, or recover.

use std::sync::Arc;

use crate::builder::{ClientBuildError, ClientBuilder};
use crate::config::{Interceptor, InterceptorManager, Method, RequestBody, RequestConfig};
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::response::Response;
use crate::transport::{HyperTransport, Transport};

#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

/// The two interceptor registries of a [`Client`].
#[derive(Debug, Default)]
pub struct Interceptors {
    /// Applied to the merged [`RequestConfig`] before dispatch.
    pub request: InterceptorManager<RequestConfig>,
    /// Applied to the [`Response`] or failure after dispatch.
    pub response: InterceptorManager<Response>,
}

struct ClientInner {
    defaults: RequestConfig,
    interceptors: Interceptors,
    dispatcher: Dispatcher,
}

/// HTTP client with ordered request and response interceptors.
///
/// Cloning is cheap and every clone shares the defaults, the transport, and
/// both registries.
///
/// # Example
///
/// ```ignore
/// use interpose_client::{Client, HeaderInterceptor, RequestConfig};
/// use serde_json::json;
///
/// let client = Client::builder()
///     .base_url("http://localhost:3000")
///     .build()?;
///
/// client
///     .interceptors()
///     .request
///     .register(HeaderInterceptor::new("x-test-header", "interceptor-works"));
///
/// let response = client
///     .post("/api/auth/login", Some(json!({}).into()), RequestConfig::new())
///     .await?;
/// println!("{}", response.text());
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.inner.defaults)
            .field("interceptors", &self.inner.interceptors)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client over the default [`HyperTransport`].
    pub fn new(defaults: RequestConfig) -> Result<Self, ClientBuildError> {
        Ok(Self::with_transport(defaults, HyperTransport::new()?))
    }

    /// Create a client over the given transport.
    pub fn with_transport(defaults: RequestConfig, transport: impl Transport) -> Self {
        Self::from_parts(defaults, Arc::new(transport))
    }

    pub(crate) fn from_parts(defaults: RequestConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                defaults,
                interceptors: Interceptors::default(),
                dispatcher: Dispatcher::new(transport),
            }),
        }
    }

    /// Get the configuration merged under every call.
    pub fn defaults(&self) -> &RequestConfig {
        &self.inner.defaults
    }

    /// Get the interceptor registries.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Run the full pipeline for `config`.
    ///
    /// Interceptors registered or ejected while this call is in flight only
    /// affect later calls.
    pub async fn request(&self, config: RequestConfig) -> Result<Response, Error> {
        self.execute(RequestConfig::merge(&self.inner.defaults, config))
            .await
    }

    /// Merge like [`request`](Self::request), then make `data` the payload
    /// even when it is `None`.
    async fn request_with_body(
        &self,
        config: RequestConfig,
        data: Option<RequestBody>,
    ) -> Result<Response, Error> {
        let mut config = RequestConfig::merge(&self.inner.defaults, config);
        config.data = data;
        self.execute(config).await
    }

    async fn execute(&self, config: RequestConfig) -> Result<Response, Error> {
        #[cfg(feature = "tracing")]
        let span = info_span!(
            "http.request",
            http.method = %config.effective_method(),
            url = config.url.as_deref().unwrap_or_default(),
            otel.kind = "client",
        );

        let pipeline = self.run(config);

        #[cfg(feature = "tracing")]
        let pipeline = pipeline.instrument(span);

        pipeline.await
    }

    async fn run(&self, config: RequestConfig) -> Result<Response, Error> {
        let interceptors = &self.inner.interceptors;
        let request_stage = interceptors.request.snapshot();
        let response_stage = interceptors.response.snapshot();

        let outcome = match run_stage(&request_stage, Ok(config)).await {
            Ok(config) => self.inner.dispatcher.dispatch(config).await,
            Err(err) => Err(err),
        };

        run_stage(&response_stage, outcome).await
    }

    /// Send a `GET` request.
    pub async fn get(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, Error> {
        self.request(config.method(Method::Get).url(url)).await
    }

    /// Send a `DELETE` request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, Error> {
        self.request(config.method(Method::Delete).url(url)).await
    }

    /// Send a `POST` request. `data` replaces any payload in `config`.
    pub async fn post(
        &self,
        url: impl Into<String>,
        data: Option<RequestBody>,
        config: RequestConfig,
    ) -> Result<Response, Error> {
        self.request_with_body(config.method(Method::Post).url(url), data)
            .await
    }

    /// Send a `PUT` request. `data` replaces any payload in `config`.
    pub async fn put(
        &self,
        url: impl Into<String>,
        data: Option<RequestBody>,
        config: RequestConfig,
    ) -> Result<Response, Error> {
        self.request_with_body(config.method(Method::Put).url(url), data)
            .await
    }

    /// Send a `PATCH` request. `data` replaces any payload in `config`.
    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: Option<RequestBody>,
        config: RequestConfig,
    ) -> Result<Response, Error> {
        self.request_with_body(config.method(Method::Patch).url(url), data)
            .await
    }
}

/// Values that know which request configuration they belong to.
trait InFlight {
    fn in_flight(&self) -> &RequestConfig;
}

impl InFlight for RequestConfig {
    fn in_flight(&self) -> &RequestConfig {
        self
    }
}

impl InFlight for Response {
    fn in_flight(&self) -> &RequestConfig {
        &self.config
    }
}

/// Fold `state` through `stage` in order.
///
/// Failures raised by a handler get the configuration that was in flight
/// attached, unless they already carry one.
async fn run_stage<T>(stage: &[Arc<Interceptor<T>>], mut state: Result<T, Error>) -> Result<T, Error>
where
    T: InFlight + Send + 'static,
{
    let mut in_flight: Option<RequestConfig> = None;
    for interceptor in stage {
        if let Ok(value) = &state {
            in_flight = Some(value.in_flight().clone());
        }
        state = interceptor.apply(state).await.map_err(|err| match &in_flight {
            Some(config) => err.or_config(config),
            None => err,
        });
    }
    state
}
