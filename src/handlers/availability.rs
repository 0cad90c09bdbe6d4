//! # Availability API Handlers
//!
//! Read-only views over the reservation ledger. Each handler performs one
//! batched lookup and hands the rows to [`crate::ledger::availability`],
//! which decides what the caller is allowed to see.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiError;
use crate::ledger::availability::{self, FullGrid, SlotAvailability, Viewer, WeekGrid};
use crate::ledger::{validate_period, validate_year};
use crate::repositories::{AxisRepository, ReservationRepository};
use crate::server::AppState;

/// Query for a single slot
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlotQuery {
    /// Axis to inspect
    pub axis_id: Uuid,
    /// Calendar year (2000..=2100)
    pub year: i32,
    /// ISO week (1..=53)
    pub week: i32,
}

/// Query for one axis over a year
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AxisYearQuery {
    pub axis_id: Uuid,
    pub year: i32,
}

/// Query for a whole year
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct YearQuery {
    pub year: i32,
}

/// Query for one ISO week across axes
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeekQuery {
    pub year: i32,
    pub week: i32,
}

/// Is a single slot free?
#[utoipa::path(
    get,
    path = "/api/bookings/availability",
    security(("bearer_auth" = [])),
    params(SlotQuery),
    responses(
        (status = 200, description = "Slot availability; owner only shown to administrators", body = SlotAvailability),
        (status = 400, description = "Missing or out-of-range parameters", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Axis not found", body = ApiError)
    ),
    tag = "availability"
)]
pub async fn slot_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<SlotQuery>, QueryRejection>,
) -> Result<Json<SlotAvailability>, ApiError> {
    let Query(query) = query?;
    validate_period(query.year, query.week)?;

    let axis = AxisRepository::new(&state.db).require(query.axis_id).await?;
    let holder = ReservationRepository::new(&state.db)
        .slot_holder(axis.id, query.year, query.week)
        .await?;

    Ok(Json(availability::slot_availability(
        &axis,
        query.year,
        query.week,
        holder.as_deref(),
        user.viewer(),
    )))
}

/// Weeks 1 to 53 of one axis
#[utoipa::path(
    get,
    path = "/api/weeks/availability",
    security(("bearer_auth" = [])),
    params(AxisYearQuery),
    responses(
        (status = 200, description = "Week-by-week availability of the axis", body = WeekGrid),
        (status = 400, description = "Missing or out-of-range parameters", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Axis not found", body = ApiError)
    ),
    tag = "availability"
)]
pub async fn week_availability(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<AxisYearQuery>, QueryRejection>,
) -> Result<Json<WeekGrid>, ApiError> {
    let Query(query) = query?;
    validate_year(query.year)?;

    let axis = AxisRepository::new(&state.db).require(query.axis_id).await?;
    let booked = ReservationRepository::new(&state.db)
        .booked_for_axis(axis.id, query.year)
        .await?;

    Ok(Json(availability::week_grid(
        &axis,
        query.year,
        &booked,
        user.viewer(),
    )))
}

/// Every axis crossed with every week of a year
#[utoipa::path(
    get,
    path = "/api/bookings/all-slots",
    security(("bearer_auth" = [])),
    params(YearQuery),
    responses(
        (status = 200, description = "Full availability grid", body = FullGrid),
        (status = 400, description = "Missing or out-of-range year", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "availability"
)]
pub async fn all_slots(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<YearQuery>, QueryRejection>,
) -> Result<Json<FullGrid>, ApiError> {
    let Query(query) = query?;
    validate_year(query.year)?;

    let axes = AxisRepository::new(&state.db).list().await?;
    let booked = ReservationRepository::new(&state.db)
        .booked_for_year(query.year)
        .await?;

    let grid = availability::full_grid(query.year, &axes, &booked, user.viewer());
    tracing::debug!(year = query.year, slots = grid.total_slots, "Built availability grid");
    Ok(Json(grid))
}

/// One week across every axis, with owners
#[utoipa::path(
    get,
    path = "/api/admin/axes/availability",
    security(("bearer_auth" = [])),
    params(WeekQuery),
    responses(
        (status = 200, description = "Availability of each axis for the week", body = [SlotAvailability]),
        (status = 400, description = "Missing or out-of-range parameters", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn admin_axes_availability(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<Json<Vec<SlotAvailability>>, ApiError> {
    let Query(query) = query?;
    validate_period(query.year, query.week)?;

    let axes = AxisRepository::new(&state.db).list().await?;
    let booked = ReservationRepository::new(&state.db)
        .booked_for_week(query.year, query.week)
        .await?;

    Ok(Json(availability::week_across_axes(
        query.year,
        query.week,
        &axes,
        &booked,
        Viewer::admin(),
    )))
}
