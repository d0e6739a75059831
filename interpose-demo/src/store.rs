//! In-memory refresh token registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::token::now_millis;

/// What the server remembers about an issued refresh token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshTokenData {
    pub user_id: String,
    /// Expiry, epoch milliseconds.
    pub exp: u64,
}

impl RefreshTokenData {
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.exp <= now_ms
    }
}

/// Refresh tokens keyed by token string.
///
/// Cloning shares the underlying map, so one store can be handed to the
/// router state and kept by the caller.
#[derive(Clone, Debug, Default)]
pub struct TokenStore {
    tokens: Arc<RwLock<HashMap<String, RefreshTokenData>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: impl Into<String>, data: RefreshTokenData) {
        self.tokens.write().await.insert(token.into(), data);
    }

    pub async fn get(&self, token: &str) -> Option<RefreshTokenData> {
        self.tokens.read().await.get(token).cloned()
    }

    pub async fn has(&self, token: &str) -> bool {
        self.tokens.read().await.contains_key(token)
    }

    /// Remove `token`. Returns whether it was present.
    pub async fn delete(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }

    /// Drop every entry whose expiry has passed. Returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let now = now_millis();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, data| !data.is_expired_at(now));
        before - tokens.len()
    }

    /// Copy of every entry, ordered by expiry.
    pub async fn snapshot(&self) -> Vec<(String, RefreshTokenData)> {
        let mut entries: Vec<_> = self
            .tokens
            .read()
            .await
            .iter()
            .map(|(token, data)| (token.clone(), data.clone()))
            .collect();
        entries.sort_by(|a, b| a.1.exp.cmp(&b.1.exp).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}
