//! End-to-end demo flows over a real socket.

use std::net::SocketAddr;

use http::StatusCode;
use interpose_client::{RequestConfig, is_failure};
use interpose_demo::session::install_interceptors;
use interpose_demo::{AuthFlow, AuthSession, FlowError, TokenStore};
use serde_json::json;
use tokio::net::TcpListener;

async fn start_server(store: TokenStore) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = interpose_demo::serve(listener, store).await {
            eprintln!("server error: {e}");
        }
    });
    Ok(addr)
}

#[tokio::test]
async fn full_flow() -> anyhow::Result<()> {
    let store = TokenStore::new();
    let addr = start_server(store.clone()).await?;
    let flow = AuthFlow::new(format!("http://{addr}"))?;

    let login = flow.login().await?;
    assert_eq!(login["message"], "Login successful");
    let refresh_token = flow.session().refresh_token().expect("login stores tokens");
    assert!(store.has(&refresh_token).await);

    let protected = flow.protected().await?;
    assert_eq!(protected["data"], "Hello, authenticated user!");

    let refreshed = flow.refresh().await?;
    assert_eq!(
        flow.session().access_token().as_deref(),
        refreshed["accessToken"].as_str()
    );

    let status = flow.status().await?;
    assert_eq!(status["totalTokens"], 1);
    assert_eq!(status["tokens"][0]["userId"], "user123");

    let logout = flow.logout().await?;
    assert_eq!(logout["message"], "Logged out");
    assert!(flow.session().refresh_token().is_none());
    assert!(store.is_empty().await);

    let status = flow.status().await?;
    assert_eq!(status["totalTokens"], 0);
    Ok(())
}

#[tokio::test]
async fn invalid_bearer_is_a_status_failure() -> anyhow::Result<()> {
    let addr = start_server(TokenStore::new()).await?;
    let flow = AuthFlow::new(format!("http://{addr}"))?;
    flow.session().set("garbage".into(), "garbage".into());

    let err = flow.protected().await.expect_err("token does not decode");
    let details = err.details();
    assert_eq!(details["status"], 401);
    assert_eq!(details["errorDetails"]["error"], "Invalid token");

    let FlowError::Request(failure) = err else {
        panic!("expected a request failure");
    };
    assert!(failure.is_status());
    assert_eq!(
        failure.response().map(|r| r.status),
        Some(StatusCode::UNAUTHORIZED)
    );

    let boxed: anyhow::Error = failure.into();
    assert!(is_failure(&*boxed));
    Ok(())
}

#[tokio::test]
async fn refresh_after_logout_is_rejected() -> anyhow::Result<()> {
    let addr = start_server(TokenStore::new()).await?;
    let flow = AuthFlow::new(format!("http://{addr}"))?;
    flow.login().await?;
    let tokens = flow.session().tokens();
    flow.logout().await?;

    // put the revoked token back on the client side
    flow.session().set(
        tokens.access_token.unwrap_or_default(),
        tokens.refresh_token.unwrap_or_default(),
    );
    let err = flow.refresh().await.expect_err("token was revoked");
    assert_eq!(err.details()["status"], 401);
    Ok(())
}

#[tokio::test]
async fn logout_without_token_is_bad_request() -> anyhow::Result<()> {
    let addr = start_server(TokenStore::new()).await?;
    let flow = AuthFlow::new(format!("http://{addr}"))?;

    let err = flow
        .client()
        .post(
            "/api/auth/logout",
            Some(json!({}).into()),
            RequestConfig::new(),
        )
        .await
        .expect_err("no refresh token in the body");
    assert_eq!(
        err.response().map(|r| r.status),
        Some(StatusCode::BAD_REQUEST)
    );

    let err = flow
        .client()
        .post("/api/auth/logout", Some("{oops".into()), RequestConfig::new())
        .await
        .expect_err("body is not JSON");
    assert_eq!(
        err.response().map(|r| r.status),
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
    Ok(())
}

#[tokio::test]
async fn ejected_bearer_interceptor_stops_authorizing() -> anyhow::Result<()> {
    let addr = start_server(TokenStore::new()).await?;
    let client = interpose_client::Client::builder()
        .base_url(format!("http://{addr}"))
        .build()?;
    let session = AuthSession::new();
    let installed = install_interceptors(&client, &session);

    let login: serde_json::Value = client
        .post("/api/auth/login", None, RequestConfig::new())
        .await?
        .json()?;
    session.set(
        login["accessToken"].as_str().unwrap_or_default().to_string(),
        login["refreshToken"].as_str().unwrap_or_default().to_string(),
    );
    client.get("/api/protected", RequestConfig::new()).await?;

    assert!(client.interceptors().request.eject(installed.bearer));
    let err = client
        .get("/api/protected", RequestConfig::new())
        .await
        .expect_err("no Authorization header without the interceptor");
    assert_eq!(
        err.response().map(|r| r.status),
        Some(StatusCode::UNAUTHORIZED)
    );
    Ok(())
}
