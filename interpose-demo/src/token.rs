//! Unsigned demo tokens.
//!
//! A token is `base64(header) "." base64(claims)`, where the claims carry the
//! caller's payload plus `exp` and `iat` in epoch milliseconds. There is no
//! signature: verification only checks that the claims decode and have not
//! expired.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Failure to build or read a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token payload must be a JSON object")]
    PayloadNotObject,
    #[error("token has no claims segment")]
    MissingClaims,
    #[error("token segment is not base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token claims are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decoded token claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, epoch milliseconds.
    pub exp: u64,
    /// Issue time, epoch milliseconds.
    pub iat: u64,
    /// Everything else the issuer put in the payload.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Claims {
    /// The `id` claim, if it is a string.
    pub fn user_id(&self) -> Option<&str> {
        self.payload.get("id").and_then(Value::as_str)
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.exp <= now_ms
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Issue a token for `payload` that expires after `expires_in`.
///
/// `exp` and `iat` in the payload are overwritten.
pub fn create_token(payload: &impl Serialize, expires_in: Duration) -> Result<String, TokenError> {
    let Value::Object(mut claims) = serde_json::to_value(payload)? else {
        return Err(TokenError::PayloadNotObject);
    };
    let now = now_millis();
    claims.insert("exp".into(), json!(now + expires_in.as_millis() as u64));
    claims.insert("iat".into(), json!(now));

    let header = serde_json::to_vec(&json!({ "alg": "HS256", "typ": "JWT" }))?;
    let claims = serde_json::to_vec(&claims)?;
    Ok(format!("{}.{}", STANDARD.encode(header), STANDARD.encode(claims)))
}

/// Decode the claims of `token` without checking expiry.
pub fn decode_token(token: &str) -> Result<Claims, TokenError> {
    let segment = token.split('.').nth(1).ok_or(TokenError::MissingClaims)?;
    let raw = STANDARD.decode(segment)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// True iff `token` decodes and has not expired.
pub fn verify_token(token: &str) -> bool {
    match decode_token(token) {
        Ok(claims) => !claims.is_expired_at(now_millis()),
        Err(_) => false,
    }
}
