//! Test utilities for database and API testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations, seeded axes, test accounts and a ready-to-call router.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use booking::{
    auth::tokens::TokenService,
    config::AppConfig,
    models::{axis, user},
    repositories::{AxisRepository, UserRepository, user::NewUser},
    seeds::seed_axes,
    server::{AppState, create_app},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const PRINCIPAL_ADMIN: &str = "chief@example.com";
pub const PASSWORD: &str = "password123";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    // Every pooled connection to `sqlite::memory:` opens its own database.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Configuration used by every API test.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        principal_admin_email: PRINCIPAL_ADMIN.to_string(),
        ..Default::default()
    }
}

/// Application state over a fresh database with the default axes seeded.
pub async fn test_state() -> Result<AppState> {
    test_state_with(test_config()).await
}

/// Like [`test_state`], with a caller-supplied configuration.
pub async fn test_state_with(config: AppConfig) -> Result<AppState> {
    let db = setup_test_db().await?;
    seed_axes(&db).await?;
    let tokens = TokenService::from_config(&config)?;
    Ok(AppState::new(config, db, tokens))
}

/// Creates an active account with [`PASSWORD`].
pub async fn create_user(db: &DatabaseConnection, email: &str, is_admin: bool) -> Result<user::Model> {
    let user = UserRepository::new(db)
        .create(NewUser {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            is_admin,
            is_active: true,
        })
        .await?;
    Ok(user)
}

/// Looks up a seeded axis by name.
pub async fn axis_named(db: &DatabaseConnection, name: &str) -> Result<axis::Model> {
    AxisRepository::new(db)
        .find_by_name(name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("axis {name} not seeded"))
}

/// Issues an access token without going through the login endpoint.
pub fn access_token(state: &AppState, user: &user::Model) -> Result<String> {
    Ok(state.tokens.issue_pair(user.id, &user.email)?.access)
}

/// Thin wrapper around the router for oneshot requests.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// Decoded response of a [`TestApp`] request.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        let state = test_state_with(config).await?;
        let router = create_app(state.clone());
        Ok(Self { state, router })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request("POST", uri, token, Some(body)).await
    }

    /// Logs in through the API and returns the login response body.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value> {
        let response = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        anyhow::ensure!(
            response.status == StatusCode::OK,
            "login failed with {}: {}",
            response.status,
            response.text()
        );
        Ok(response.json())
    }
}
