//! Walk through login, protected access, refresh, logout and status against
//! an in-process demo server.
//!
//! Run with: cargo run --bin auth-flow
//! Log interceptor activity with: RUST_LOG=info,interpose_client=debug cargo run --bin auth-flow

use std::future::Future;

use interpose_demo::config::server_addr;
use interpose_demo::{AuthFlow, FlowError, TokenStore};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

async fn step<F>(name: &str, flow: F) -> bool
where
    F: Future<Output = Result<Value, FlowError>>,
{
    println!("{name}...");
    match flow.await {
        Ok(body) => {
            println!("  PASS: {body}");
            true
        }
        Err(err) => {
            println!("  FAIL: {}", err.details());
            false
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let listener = TcpListener::bind(server_addr()?).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = interpose_demo::serve(listener, TokenStore::new()).await {
            tracing::error!(error = %e, "demo server stopped");
        }
    });
    tracing::info!(%addr, "demo server listening");

    let flow = AuthFlow::new(format!("http://{addr}"))?;

    let mut passed = 0;
    let mut failed = 0;
    let mut record = |ok: bool| if ok { passed += 1 } else { failed += 1 };

    record(!step("Protected before login (expected to fail)", flow.protected()).await);
    record(step("Login", flow.login()).await);
    record(step("Protected", flow.protected()).await);
    record(step("Refresh", flow.refresh()).await);
    record(step("Status", flow.status()).await);
    record(step("Logout", flow.logout()).await);
    record(step("Status after logout", flow.status()).await);

    println!();
    println!("{passed} passed, {failed} failed");
    if failed > 0 {
        anyhow::bail!("{failed} step(s) failed");
    }
    Ok(())
}
