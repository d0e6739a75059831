//! Demo authentication server and the client flows that exercise it.
//!
//! The server issues unsigned access and refresh tokens and keeps refresh
//! tokens in an in-memory [`TokenStore`]. [`AuthFlow`] drives it through an
//! `interpose_client::Client` with request and response interceptors
//! registered.

pub mod config;
pub mod routes;
pub mod session;
pub mod store;
pub mod token;

pub use routes::router;
pub use session::{AuthFlow, AuthSession, FlowError};
pub use store::{RefreshTokenData, TokenStore};

/// Serve the demo routes on `listener` until the task is dropped.
///
/// # Example
///
/// ```ignore
/// let listener = tokio::net::TcpListener::bind(interpose_demo::config::server_addr()?).await?;
/// interpose_demo::serve(listener, interpose_demo::TokenStore::new()).await?;
/// ```
pub async fn serve(listener: tokio::net::TcpListener, store: TokenStore) -> std::io::Result<()> {
    axum::serve(listener, router(store)).await
}
