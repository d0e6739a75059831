//! Client side of the demo: token holder, interceptors and the five flows.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use http::HeaderValue;
use http::header::AUTHORIZATION;
use interpose_client::{
    Client, ClientBuildError, Error, HeaderInterceptor, Interceptor, InterceptorId, RequestBody,
    RequestConfig, Response, as_failure,
};
use serde_json::{Value, json};

/// Tokens held by the client between calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Shared, explicitly constructed token holder.
#[derive(Clone, Debug, Default)]
pub struct AuthSession {
    tokens: Arc<RwLock<Tokens>>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> Tokens {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens().access_token
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens().refresh_token
    }

    pub fn set(&self, access_token: String, refresh_token: String) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Tokens {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
        };
    }

    pub fn set_access_token(&self, access_token: String) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token = Some(access_token);
    }

    pub fn clear(&self) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Tokens::default();
    }
}

/// Request interceptor adding `Authorization: Bearer <access token>` when the
/// call did not set one itself.
pub fn bearer_interceptor(session: AuthSession) -> Interceptor<RequestConfig> {
    Interceptor::new().map(move |mut config: RequestConfig| {
        if config.headers.contains_key(AUTHORIZATION) {
            return Ok(config);
        }
        if let Some(token) = session.access_token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::new("access token is not a valid header value").with_source(e))?;
            config.headers.insert(AUTHORIZATION, value);
        }
        Ok(config)
    })
}

/// Response interceptor that logs every outcome and re-raises failures.
pub fn logging_interceptor() -> Interceptor<Response> {
    Interceptor::new()
        .map(|response: Response| {
            tracing::info!(
                status = response.status.as_u16(),
                url = response.config.url.as_deref().unwrap_or_default(),
                "response interceptor ran"
            );
            Ok(response)
        })
        .on_rejected(|err: Error| async move {
            tracing::warn!(code = ?err.code(), "response interceptor saw a failure: {err}");
            Err(err)
        })
}

/// Ids of the interceptors installed by [`install_interceptors`].
#[derive(Clone, Copy, Debug)]
pub struct InstalledInterceptors {
    pub test_header: InterceptorId,
    pub bearer: InterceptorId,
    pub logging: InterceptorId,
}

/// Register the demo interceptors on `client`.
pub fn install_interceptors(client: &Client, session: &AuthSession) -> InstalledInterceptors {
    let interceptors = client.interceptors();
    let test_header = interceptors
        .request
        .register(HeaderInterceptor::new("x-test-header", "interceptor-works"));
    let bearer = interceptors.request.register(bearer_interceptor(session.clone()));
    let logging = interceptors.response.register(logging_interceptor());
    InstalledInterceptors {
        test_header,
        bearer,
        logging,
    }
}

/// Failure of one demo flow.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("log in first")]
    NotLoggedIn,
    #[error("response did not include {0}")]
    MissingToken(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] Error),
}

impl FlowError {
    /// JSON summary of the failure: status and server body when the server
    /// answered, otherwise just the message.
    pub fn details(&self) -> Value {
        let failure = std::error::Error::source(self).and_then(as_failure);
        match failure.and_then(Error::response) {
            Some(response) => json!({
                "message": failure.map(Error::message).unwrap_or_default(),
                "status": response.status.as_u16(),
                "errorDetails": response.json::<Value>().unwrap_or_else(|_| json!(response.text())),
            }),
            None => json!({ "error": self.to_string() }),
        }
    }
}

/// The login, refresh, protected, logout and status flows over one client.
#[derive(Clone, Debug)]
pub struct AuthFlow {
    client: Client,
    session: AuthSession,
}

impl AuthFlow {
    /// Build a client for `base_url` with the demo interceptors installed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientBuildError> {
        let client = Client::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client, installing the demo interceptors on it.
    pub fn with_client(client: Client) -> Self {
        let session = AuthSession::new();
        install_interceptors(&client, &session);
        Self { client, session }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub async fn login(&self) -> Result<Value, FlowError> {
        let body: Value = self
            .client
            .post("/api/auth/login", None, RequestConfig::new())
            .await?
            .json()?;

        let access = string_field(&body, "accessToken").ok_or(FlowError::MissingToken("accessToken"))?;
        let refresh =
            string_field(&body, "refreshToken").ok_or(FlowError::MissingToken("refreshToken"))?;
        self.session.set(access, refresh);
        tracing::info!("logged in");
        Ok(body)
    }

    pub async fn refresh(&self) -> Result<Value, FlowError> {
        let refresh = self.session.refresh_token().ok_or(FlowError::NotLoggedIn)?;
        let body: Value = self
            .client
            .post(
                "/api/auth/refresh",
                Some(RequestBody::from(json!({ "refreshToken": refresh }))),
                RequestConfig::new(),
            )
            .await?
            .json()?;

        let access = string_field(&body, "accessToken").ok_or(FlowError::MissingToken("accessToken"))?;
        self.session.set_access_token(access);
        tracing::info!("access token refreshed");
        Ok(body)
    }

    pub async fn protected(&self) -> Result<Value, FlowError> {
        if self.session.access_token().is_none() {
            return Err(FlowError::NotLoggedIn);
        }
        Ok(self
            .client
            .get("/api/protected", RequestConfig::new())
            .await?
            .json()?)
    }

    pub async fn logout(&self) -> Result<Value, FlowError> {
        let refresh = self.session.refresh_token().ok_or(FlowError::NotLoggedIn)?;
        let body: Value = self
            .client
            .post(
                "/api/auth/logout",
                Some(RequestBody::from(json!({ "refreshToken": refresh }))),
                RequestConfig::new(),
            )
            .await?
            .json()?;
        self.session.clear();
        tracing::info!("logged out");
        Ok(body)
    }

    pub async fn status(&self) -> Result<Value, FlowError> {
        Ok(self
            .client
            .get("/api/auth/status", RequestConfig::new())
            .await?
            .json()?)
    }
}

fn string_field(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
