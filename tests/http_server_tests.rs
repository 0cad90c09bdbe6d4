//! Drives a real listening server over HTTP with `reqwest`.

mod test_utils;

use std::net::SocketAddr;

use booking::server::create_app;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use test_utils::{PASSWORD, axis_named, create_user, test_state};
use tokio::net::TcpListener;

async fn spawn_server() -> anyhow::Result<(SocketAddr, booking::server::AppState)> {
    let state = test_state().await?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, state))
}

#[tokio::test]
async fn login_and_reserve_over_http() -> anyhow::Result<()> {
    let (addr, state) = spawn_server().await?;
    let base = format!("http://{addr}");
    let client = Client::new();
    create_user(&state.db, "dg@example.com", false).await?;
    let thies = axis_named(&state.db, "Thies - Mbour - Saly").await?;

    let health = client.get(format!("{base}/healthz")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);

    let login: Value = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "email": "dg@example.com", "password": PASSWORD }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let access = login["access"].as_str().unwrap_or_default();

    let created = client
        .post(format!("{base}/api/bookings"))
        .bearer_auth(access)
        .json(&json!({ "axis_id": thies.id, "year": 2025, "week": 12 }))
        .send()
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);

    let axes: Value = client
        .get(format!("{base}/api/axes"))
        .bearer_auth(access)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(axes.as_array().map(Vec::len), Some(7));
    Ok(())
}

#[tokio::test]
async fn incoming_trace_id_is_echoed() -> anyhow::Result<()> {
    let (addr, _state) = spawn_server().await?;
    let client = Client::new();

    let response = client
        .get(format!("http://{addr}/api/axes"))
        .header("x-trace-id", "client-trace-42")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get("x-trace-id")
            .and_then(|v| v.to_str().ok()),
        Some("client-trace-42")
    );
    let problem: Value = response.json().await?;
    assert_eq!(problem["trace_id"], "client-trace-42");
    Ok(())
}
