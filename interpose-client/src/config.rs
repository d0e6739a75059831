//! Request configuration and interceptors.
//!
//! This module contains the values that flow through the pipeline:
//! - [`RequestConfig`]: Description of a logical request
//! - [`Interceptor`]: Success and failure handlers for one stage
//! - [`InterceptorManager`]: Ordered registry with stable ids

mod interceptor;
mod options;

pub use interceptor::{HeaderInterceptor, Interceptor, InterceptorId, InterceptorManager, Iter};
pub use options::{InvalidMethod, Method, Params, RequestBody, RequestConfig};
