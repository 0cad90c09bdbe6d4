//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Axis Booking API.

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod auth;
pub mod availability;
pub mod axes;
pub mod coverage;
pub mod reservations;
pub mod users;

/// Liveness/readiness probe body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: String,
    /// Database reachability, present on readiness checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Process is alive", body = HealthStatus)
    ),
    tag = "health"
)]
pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        database: None,
    })
}

/// Readiness probe; fails while the database is unreachable
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Ready to serve traffic", body = HealthStatus),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "health"
)]
pub async fn readyz(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = %err, "Readiness check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database unavailable",
        )
    })?;

    Ok(Json(HealthStatus {
        status: "ready".to_string(),
        database: Some("ok".to_string()),
    }))
}

#[cfg(test)]
mod tests;
