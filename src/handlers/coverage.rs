//! # Coverage API Handlers

use axum::{extract::State, response::Json};

use crate::auth::{AdminUser, DgUser};
use crate::error::ApiError;
use crate::ledger::coverage::Coverage;
use crate::repositories::ReservationRepository;
use crate::server::AppState;

/// Share of all axes the caller has ever reserved
#[utoipa::path(
    get,
    path = "/api/coverage/my",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's coverage", body = Coverage),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Only DG users have coverage", body = ApiError)
    ),
    tag = "coverage"
)]
pub async fn my_coverage(
    State(state): State<AppState>,
    DgUser(user): DgUser,
) -> Result<Json<Coverage>, ApiError> {
    let distinct = ReservationRepository::new(&state.db)
        .distinct_axes_for_user(user.id)
        .await?;
    Ok(Json(Coverage::new(user.email, distinct, state.config.total_axes)))
}

/// Coverage of every active DG user, ordered by email
#[utoipa::path(
    get,
    path = "/api/admin/coverage",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coverage per DG user", body = [Coverage]),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn admin_coverage(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Coverage>>, ApiError> {
    let coverage = ReservationRepository::new(&state.db)
        .coverage_for_all(state.config.total_axes, &state.config.principal_admin_email)
        .await?;
    Ok(Json(coverage))
}
