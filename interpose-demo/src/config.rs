//! Demo server settings.

use std::net::SocketAddr;
use std::time::Duration;

/// Lifetime of an access token.
pub const ACCESS_TOKEN_EXPIRY: Duration = Duration::from_secs(60);

/// Lifetime of a refresh token.
pub const REFRESH_TOKEN_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Environment variable overriding the listen address.
pub const ADDR_ENV: &str = "INTERPOSE_DEMO_ADDR";

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Returns the server address from `INTERPOSE_DEMO_ADDR`, defaulting to
/// `127.0.0.1:3000`.
///
/// # Example
///
/// ```ignore
/// let addr = interpose_demo::config::server_addr()?;
/// let listener = tokio::net::TcpListener::bind(addr).await?;
/// ```
pub fn server_addr() -> Result<SocketAddr, std::net::AddrParseError> {
    match std::env::var(ADDR_ENV) {
        Ok(addr) if !addr.trim().is_empty() => addr.trim().parse(),
        _ => DEFAULT_ADDR.parse(),
    }
}
