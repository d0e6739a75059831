//! Request configuration.
//!
//! This module provides [`RequestConfig`], the description of a logical
//! request that travels through the interceptor pipeline, together with the
//! value types it is made of: [`Method`], [`Params`] and [`RequestBody`].

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Description of a logical request.
///
/// Every field is optional so that client defaults and per-call
/// configuration can be layered with [`RequestConfig::merge`]. Request
/// interceptors receive the merged value and may rewrite any field.
///
/// # Example
///
/// ```ignore
/// use interpose_client::RequestConfig;
/// use std::time::Duration;
///
/// let config = RequestConfig::new()
///     .url("/api/protected")
///     .timeout(Duration::from_secs(5))
///     .header("authorization", "Bearer token123")
///     .param("page", "2");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Target URL, absolute or relative to `base_url`.
    pub url: Option<String>,
    /// Prefix joined with relative URLs.
    pub base_url: Option<String>,
    /// HTTP verb. Dispatch treats `None` as `GET`.
    pub method: Option<Method>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Query parameters appended to the URL.
    pub params: Option<Params>,
    /// Request payload.
    pub data: Option<RequestBody>,
    /// Logical deadline for the exchange. `None` or zero disables it.
    pub timeout: Option<Duration>,
    /// Arbitrary typed values interceptors can use to pass state along.
    pub extensions: http::Extensions,
}

impl RequestConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `call` over `defaults`.
    ///
    /// Every field set on `call` wins. Headers are unioned with per-call
    /// values replacing defaults of the same name, and extensions are
    /// unioned the same way.
    pub fn merge(defaults: &RequestConfig, call: RequestConfig) -> RequestConfig {
        let mut headers = defaults.headers.clone();
        for name in call.headers.keys() {
            headers.remove(name);
        }
        let mut current = None;
        for (name, value) in call.headers {
            if let Some(name) = name {
                current = Some(name);
            }
            if let Some(name) = &current {
                headers.append(name.clone(), value);
            }
        }

        let mut extensions = defaults.extensions.clone();
        extensions.extend(call.extensions);

        RequestConfig {
            url: call.url.or_else(|| defaults.url.clone()),
            base_url: call.base_url.or_else(|| defaults.base_url.clone()),
            method: call.method.or(defaults.method),
            headers,
            params: call.params.or_else(|| defaults.params.clone()),
            data: call.data.or_else(|| defaults.data.clone()),
            timeout: call.timeout.or(defaults.timeout),
            extensions,
        }
    }

    /// Set the target URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the prefix joined with relative URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the HTTP verb.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the logical deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header, replacing any existing value of the same name.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Try to add a header.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header<K, V>(mut self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        self.headers.insert(name, value);
        Some(self)
    }

    /// Set all headers, replacing any existing headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(Params::default)
            .insert(key, value);
        self
    }

    /// Set all query parameters.
    pub fn params(mut self, params: impl Into<Params>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Set the request payload.
    pub fn data(mut self, data: impl Into<RequestBody>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set a JSON payload from any serializable value.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.data = Some(RequestBody::json(value)?);
        Ok(self)
    }

    /// Attach a typed extension value.
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Get the effective HTTP verb.
    pub fn effective_method(&self) -> Method {
        self.method.unwrap_or_default()
    }
}

// ============================================================================
// Method
// ============================================================================

/// HTTP verbs the client issues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Get the uppercase wire form of this verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unsupported verb.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct InvalidMethod(String);

impl FromStr for Method {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(InvalidMethod(s.to_string())),
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
        }
    }
}

// ============================================================================
// Params
// ============================================================================

/// Insertion-ordered query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Get the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

// ============================================================================
// RequestBody
// ============================================================================

/// Request payload.
///
/// Structured payloads are serialized to JSON at dispatch time and get a
/// `content-type: application/json` header unless one is already set.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as-is.
    Raw(Bytes),
    /// A JSON value.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Serialize `value` into a JSON payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(RequestBody::Json)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Raw(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Raw(Bytes::from(bytes))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Raw(Bytes::from(text))
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        RequestBody::Raw(Bytes::from_static(text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_per_call_wins() {
        let defaults = RequestConfig::new()
            .base_url("http://localhost:3000")
            .url("/default")
            .timeout(Duration::from_secs(10))
            .method(Method::Post);
        let call = RequestConfig::new()
            .url("/call")
            .timeout(Duration::from_secs(1));

        let merged = RequestConfig::merge(&defaults, call);
        assert_eq!(merged.url.as_deref(), Some("/call"));
        assert_eq!(merged.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
        assert_eq!(merged.method, Some(Method::Post));
    }

    #[test]
    fn test_merge_headers_union() {
        let defaults = RequestConfig::new()
            .header("x-a", "1")
            .header("x-shared", "default");
        let call = RequestConfig::new()
            .header("x-b", "2")
            .header("x-shared", "call");

        let merged = RequestConfig::merge(&defaults, call);
        assert_eq!(merged.headers.get("x-a").unwrap(), "1");
        assert_eq!(merged.headers.get("x-b").unwrap(), "2");
        assert_eq!(merged.headers.get("x-shared").unwrap(), "call");
        assert_eq!(merged.headers.get_all("x-shared").iter().count(), 1);
    }

    #[test]
    fn test_merge_keeps_multi_valued_call_headers() {
        let mut headers = HeaderMap::new();
        headers.append("x-multi", HeaderValue::from_static("a"));
        headers.append("x-multi", HeaderValue::from_static("b"));
        let defaults = RequestConfig::new().header("x-multi", "default");

        let merged = RequestConfig::merge(&defaults, RequestConfig::new().headers(headers));
        let values: Vec<_> = merged.headers.get_all("x-multi").iter().collect();
        assert_eq!(values, ["a", "b"]);
    }

    #[test]
    fn test_merge_extensions() {
        #[derive(Clone, Debug, PartialEq)]
        struct Retry(bool);
        #[derive(Clone, Debug, PartialEq)]
        struct Tag(&'static str);

        let defaults = RequestConfig::new()
            .extension(Retry(false))
            .extension(Tag("default"));
        let call = RequestConfig::new().extension(Tag("call"));

        let merged = RequestConfig::merge(&defaults, call);
        assert_eq!(merged.extensions.get::<Retry>(), Some(&Retry(false)));
        assert_eq!(merged.extensions.get::<Tag>(), Some(&Tag("call")));
    }

    #[test]
    fn test_try_header_invalid() {
        assert!(RequestConfig::new().try_header("bad header", "v").is_none());
        assert!(RequestConfig::new().try_header("x-ok", "v").is_some());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("TRACE".parse::<Method>().is_err());
        assert_eq!(Method::default(), Method::Get);
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!(http::Method::from(Method::Put), http::Method::PUT);
    }

    #[test]
    fn test_params_insertion_order() {
        let mut params = Params::from([("b", "1"), ("a", "2")]);
        params.insert("b", "3");
        params.insert("c", "4");

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, [("b", "3"), ("a", "2"), ("c", "4")]);
        assert_eq!(params.get("a"), Some("2"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_json_body() {
        let config = RequestConfig::new().json(&json!({"a": 1})).unwrap();
        assert_eq!(config.data, Some(RequestBody::Json(json!({"a": 1}))));

        let config = RequestConfig::new().data("plain");
        assert_eq!(
            config.data,
            Some(RequestBody::Raw(Bytes::from_static(b"plain")))
        );
    }
}
