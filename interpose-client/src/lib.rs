//! HTTP client with ordered, ejectable interceptors.
//!
//! This crate provides a [`Client`] that runs every call through a small
//! asynchronous pipeline:
//!
//! 1. The call's [`RequestConfig`] is merged over the client defaults.
//! 2. Request interceptors run in registration order.
//! 3. Exactly one exchange is dispatched over a [`Transport`].
//! 4. Response interceptors run in registration order.
//!
//! Each stage receives either the value produced so far or the [`Error`]
//! produced so far. A fulfil handler may transform the value or fail; a
//! reject handler may re-raise or recover with a substitute value, after
//! which later stages see a success.
//!
//! ## Features
//!
//! - Per-stage interceptor registries with stable ids ([`InterceptorManager`])
//! - Per-call configuration merged over client defaults
//! - JSON payloads serialized at dispatch with an automatic content type
//! - Logical per-call timeouts
//! - One structured [`Error`] type that tells status failures apart from
//!   transport and timeout failures
//! - Injectable transport, with a hyper-based default ([`HyperTransport`])
//!
//! ## Example
//!
//! ```ignore
//! use interpose_client::{Client, Error, HeaderInterceptor, Interceptor, RequestConfig};
//!
//! let client = Client::builder()
//!     .base_url("http://localhost:3000")
//!     .build()?;
//!
//! client
//!     .interceptors()
//!     .request
//!     .register(HeaderInterceptor::new("x-test-header", "interceptor-works"));
//!
//! client.interceptors().response.register(
//!     Interceptor::new()
//!         .on_fulfilled(|response| async move { Ok(response) })
//!         .on_rejected(|err: Error| async move {
//!             tracing::warn!(code = ?err.code(), "request failed: {err}");
//!             Err(err)
//!         }),
//! );
//!
//! match client.get("/api/protected", RequestConfig::new()).await {
//!     Ok(response) => println!("{}", response.text()),
//!     Err(err) => match err.response() {
//!         Some(response) => println!("status {}", response.status),
//!         None => println!("no response: {err}"),
//!     },
//! }
//! ```
//!
//! ## Tracing
//!
//! With the `tracing` feature (on by default) every call runs inside an
//! `http.request` span, and the dispatcher and registries emit `debug`
//! events.

mod builder;
mod client;
pub mod config;
mod dispatch;
mod error;
pub mod response;
pub mod transport;

pub use builder::{ClientBuildError, ClientBuilder};
pub use client::{Client, Interceptors};
pub use error::{Error, ErrorCode, ErrorKind, as_failure, is_failure};

// Re-export from config module
pub use config::{
    HeaderInterceptor, Interceptor, InterceptorId, InterceptorManager, Method, Params, RequestBody,
    RequestConfig,
};

pub use response::Response;

// Re-export transport types at the top level for convenience
pub use transport::{
    HyperTransport, HyperTransportBuilder, RawResponse, TlsClientConfig, Transport, TransportError,
};

pub use bytes::Bytes;
