//! End-to-end pipeline tests against a real axum server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use interpose_client::{
    Client, Error, ErrorCode, HeaderInterceptor, Interceptor, RequestConfig, Response, is_failure,
};
use serde::Deserialize;
use serde_json::{Value, json};

async fn echo(headers: HeaderMap, body: String) -> Json<Value> {
    let headers: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();
    Json(json!({ "headers": headers, "body": body }))
}

#[derive(Deserialize)]
struct Search {
    q: String,
    page: u32,
}

async fn search(Query(search): Query<Search>) -> Json<Value> {
    Json(json!({ "q": search.q, "page": search.page }))
}

async fn teapot() -> (StatusCode, &'static str) {
    (StatusCode::IM_A_TEAPOT, "short and stout")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "finally"
}

async fn start_server() -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route("/echo", post(echo).get(echo))
        .route("/search", get(search))
        .route("/teapot", get(teapot))
        .route("/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {e}");
        }
    });
    Ok(addr)
}

async fn client() -> anyhow::Result<Client> {
    let addr = start_server().await?;
    let client = Client::builder()
        .base_url(format!("http://{addr}"))
        .header("x-default", "1")
        .build()?;
    Ok(client)
}

#[tokio::test]
async fn json_body_and_headers_reach_the_server() -> anyhow::Result<()> {
    let client = client().await?;
    client
        .interceptors()
        .request
        .register(HeaderInterceptor::new("x-test-header", "interceptor-works"));

    let response = client
        .post(
            "/echo",
            Some(json!({"a": 1}).into()),
            RequestConfig::new().header("x-call", "2"),
        )
        .await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let echoed: Value = response.json()?;
    assert_eq!(echoed["body"], r#"{"a":1}"#);
    assert_eq!(echoed["headers"]["content-type"], "application/json");
    assert_eq!(echoed["headers"]["x-default"], "1");
    assert_eq!(echoed["headers"]["x-call"], "2");
    assert_eq!(echoed["headers"]["x-test-header"], "interceptor-works");
    Ok(())
}

#[tokio::test]
async fn query_params_are_appended_in_order() -> anyhow::Result<()> {
    let client = client().await?;
    let response = client
        .get(
            "/search",
            RequestConfig::new().param("q", "rust lang").param("page", "3"),
        )
        .await?;

    assert_eq!(response.request.as_ref().map(|raw| raw.status()), Some(StatusCode::OK));
    let found: Value = response.json()?;
    assert_eq!(found, json!({"q": "rust lang", "page": 3}));
    Ok(())
}

#[tokio::test]
async fn status_failure_carries_response() -> anyhow::Result<()> {
    let client = client().await?;
    let err = client
        .get("/teapot", RequestConfig::new())
        .await
        .expect_err("418 must fail");

    assert!(err.is_status());
    assert!(err.to_string().contains("418"));
    let response = err.response().expect("status failures carry a response");
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(response.status_text, "I'm a teapot");
    assert_eq!(response.text(), "short and stout");
    assert!(response.headers.contains_key("content-type"));

    let boxed: anyhow::Error = err.into();
    assert!(is_failure(&*boxed));
    Ok(())
}

#[tokio::test]
async fn timeout_fires_before_slow_response() -> anyhow::Result<()> {
    let client = client().await?;
    let started = std::time::Instant::now();
    let err = client
        .get("/slow", RequestConfig::new().timeout(Duration::from_millis(100)))
        .await
        .expect_err("deadline is shorter than the handler");

    assert!(err.is_timeout());
    assert_eq!(err.message(), "Request timed out");
    assert_eq!(err.code(), Some(ErrorCode::TimedOut));
    assert!(err.response().is_none());
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[tokio::test]
async fn connection_refused_is_transport_failure() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = Client::builder().base_url(format!("http://{addr}")).build()?;
    let err = client
        .get("/anything", RequestConfig::new())
        .await
        .expect_err("nothing listens on the port");

    assert!(err.is_transport());
    assert_eq!(err.message(), "Network Error");
    assert_eq!(err.code(), Some(ErrorCode::ConnectionAborted));
    assert!(err.response().is_none());
    assert_eq!(err.config().and_then(|c| c.url.as_deref()), Some("/anything"));
    Ok(())
}

#[tokio::test]
async fn response_reject_handler_recovers_status_failure() -> anyhow::Result<()> {
    let client = client().await?;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    client.interceptors().response.register(
        Interceptor::<Response>::new().on_rejected(move |err: Error| {
            let sink = sink.clone();
            async move {
                let status = err.response().map(|r| r.status.as_u16());
                sink.lock().unwrap().push(status);
                let mut fallback = Response::new(StatusCode::OK, "recovered");
                if let Some(config) = err.config() {
                    fallback.config = config.clone();
                }
                Ok(fallback)
            }
        }),
    );

    let response = client.get("/teapot", RequestConfig::new()).await?;
    assert_eq!(response.text(), "recovered");
    assert_eq!(response.config.url.as_deref(), Some("/teapot"));
    assert_eq!(*seen.lock().unwrap(), [Some(418)]);
    Ok(())
}

#[tokio::test]
async fn ejected_interceptor_is_not_applied() -> anyhow::Result<()> {
    let client = client().await?;
    let request = &client.interceptors().request;
    let keep = request.register(HeaderInterceptor::new("x-keep", "yes"));
    let dropped = request.register(HeaderInterceptor::new("x-drop", "yes"));
    assert!(request.eject(dropped));

    let echoed: Value = client.get("/echo", RequestConfig::new()).await?.json()?;
    assert_eq!(echoed["headers"]["x-keep"], "yes");
    assert!(echoed["headers"].get("x-drop").is_none());
    assert_eq!(keep.index(), 0);
    Ok(())
}
