//! # Axes API Handlers

use axum::{
    extract::{Path, State, rejection::PathRejection},
    response::Json,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::models::axis;
use crate::repositories::AxisRepository;
use crate::server::AppState;

/// List every axis, ordered by name
#[utoipa::path(
    get,
    path = "/api/axes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All axes", body = [axis::Model]),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "axes"
)]
pub async fn list_axes(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<axis::Model>>, ApiError> {
    let axes = AxisRepository::new(&state.db).list().await?;
    Ok(Json(axes))
}

/// Fetch a single axis
#[utoipa::path(
    get,
    path = "/api/axes/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Axis id")),
    responses(
        (status = 200, description = "The axis", body = axis::Model),
        (status = 400, description = "Malformed id", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Axis not found", body = ApiError)
    ),
    tag = "axes"
)]
pub async fn get_axis(
    State(state): State<AppState>,
    _user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<axis::Model>, ApiError> {
    let Path(id) = id?;
    let axis = AxisRepository::new(&state.db).require(id).await?;
    Ok(Json(axis))
}
