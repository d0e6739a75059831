//! Demo authentication routes.
//!
//! - `POST /api/auth/login` issues an access and a refresh token and stores
//!   the refresh token.
//! - `POST /api/auth/refresh` issues a new access token; 401 unless the
//!   refresh token verifies and is stored.
//! - `POST /api/auth/logout` revokes the refresh token; 400 without one,
//!   200 whether or not it was stored.
//!
//! A refresh or logout body that is not JSON answers 500.
//! - `GET /api/auth/status` drops expired tokens and lists the rest masked.
//! - `GET /api/protected` requires `Authorization: Bearer <access token>`.

use std::time::{Duration, UNIX_EPOCH};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{ACCESS_TOKEN_EXPIRY, REFRESH_TOKEN_EXPIRY};
use crate::store::{RefreshTokenData, TokenStore};
use crate::token::{TokenError, create_token, now_millis, verify_token};

/// The only account the demo knows about.
#[derive(Clone, Debug, Serialize)]
struct DemoUser {
    id: &'static str,
    username: &'static str,
}

const DEMO_USER: DemoUser = DemoUser {
    id: "user123",
    username: "testuser",
};

/// Route failure rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid token")
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        tracing::error!(error = %err, "failed to issue token");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to issue token")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Read `refreshToken` from a refresh or logout body.
///
/// A body that is not JSON is a server-side failure (500). A JSON body
/// without a non-empty string `refreshToken` yields `None`.
fn refresh_token_from(body: &[u8], route: &'static str) -> Result<Option<String>, ApiError> {
    let body: Value = serde_json::from_slice(body).map_err(|err| {
        tracing::error!(route, error = %err, "request body is not JSON");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Malformed request body")
    })?;
    Ok(body
        .get("refreshToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string))
}

/// Build the router with its token store.
pub fn router(store: TokenStore) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/status", get(status))
        .route("/api/protected", get(protected))
        .with_state(store)
}

async fn login(State(store): State<TokenStore>) -> Result<Json<Value>, ApiError> {
    let access_token = create_token(&DEMO_USER, ACCESS_TOKEN_EXPIRY)?;
    let refresh_token = create_token(&json!({ "id": DEMO_USER.id }), REFRESH_TOKEN_EXPIRY)?;

    store
        .set(
            refresh_token.clone(),
            RefreshTokenData {
                user_id: DEMO_USER.id.to_string(),
                exp: now_millis() + REFRESH_TOKEN_EXPIRY.as_millis() as u64,
            },
        )
        .await;
    tracing::info!(user_id = DEMO_USER.id, "issued refresh token");

    Ok(Json(json!({
        "message": "Login successful",
        "accessToken": access_token,
        "refreshToken": refresh_token,
    })))
}

async fn refresh(State(store): State<TokenStore>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let Some(refresh_token) = refresh_token_from(&body, "refresh")? else {
        tracing::warn!("refresh without a token");
        return Err(ApiError::unauthorized());
    };
    if !verify_token(&refresh_token) || !store.has(&refresh_token).await {
        tracing::warn!("refresh with an invalid or unknown token");
        return Err(ApiError::unauthorized());
    }

    let access_token = create_token(&DEMO_USER, ACCESS_TOKEN_EXPIRY)?;
    tracing::info!(user_id = DEMO_USER.id, "reissued access token");

    Ok(Json(json!({
        "message": "Token refreshed",
        "accessToken": access_token,
    })))
}

async fn logout(State(store): State<TokenStore>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let Some(refresh_token) = refresh_token_from(&body, "logout")? else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Refresh token is required",
        ));
    };

    let message = if store.delete(&refresh_token).await {
        tracing::info!("refresh token revoked");
        "Logged out"
    } else {
        tracing::info!("logout with an unknown token");
        "Token was not found; already logged out"
    };
    Ok(Json(json!({ "message": message })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenStatus {
    token: String,
    user_id: String,
    expires_at: String,
    is_expired: bool,
}

fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

fn rfc3339_millis(epoch_ms: u64) -> String {
    humantime::format_rfc3339_millis(UNIX_EPOCH + Duration::from_millis(epoch_ms)).to_string()
}

async fn status(State(store): State<TokenStore>) -> Json<Value> {
    let removed = store.cleanup_expired().await;
    if removed > 0 {
        tracing::info!(removed, "dropped expired refresh tokens");
    }

    let now = now_millis();
    let tokens: Vec<TokenStatus> = store
        .snapshot()
        .await
        .into_iter()
        .map(|(token, data)| TokenStatus {
            token: mask(&token),
            is_expired: data.is_expired_at(now),
            expires_at: rfc3339_millis(data.exp),
            user_id: data.user_id,
        })
        .collect();

    Json(json!({
        "message": "Token store status",
        "totalTokens": tokens.len(),
        "tokens": tokens,
        "lastUpdated": rfc3339_millis(now),
    }))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .split_once("Bearer ")
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

async fn protected(headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    match bearer(&headers) {
        Some(token) if verify_token(token) => Ok(Json(json!({
            "message": "Protected data accessed",
            "data": "Hello, authenticated user!",
        }))),
        _ => {
            tracing::warn!("unauthorized access attempt: missing or invalid token");
            Err(ApiError::unauthorized())
        }
    }
}
