//! # Reservation API Handlers
//!
//! DG users book slots for themselves; administrators see and manage every
//! reservation. A reservation that belongs to someone else is reported as
//! missing to non-admin callers.

use axum::{
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AdminUser, CurrentUser, DgUser};
use crate::error::{ApiError, not_found};
use crate::ledger::calendar::{CalendarEvent, download_filename, to_calendar_file};
use crate::ledger::export::reservations_csv;
use crate::repositories::ReservationRepository;
use crate::repositories::reservation::{NewReservation, ReservationDetail, SlotChanges};
use crate::server::AppState;

/// Body of `POST /api/bookings`
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub axis_id: Uuid,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 10)]
    pub week: i32,
}

/// Body of `PATCH /api/bookings/{id}`; omitted fields keep their value
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateReservationRequest {
    pub axis_id: Option<Uuid>,
    pub year: Option<i32>,
    pub week: Option<i32>,
}

/// Loads a reservation the caller may see; anything else is `404`.
async fn visible_reservation(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
) -> Result<ReservationDetail, ApiError> {
    ReservationRepository::new(&state.db)
        .find_detail(id)
        .await?
        .filter(|detail| user.is_admin() || detail.user_id == user.id)
        .ok_or_else(|| not_found("Reservation"))
}

async fn load_detail(state: &AppState, id: Uuid) -> Result<ReservationDetail, ApiError> {
    ReservationRepository::new(&state.db)
        .find_detail(id)
        .await?
        .ok_or_else(|| not_found("Reservation"))
}

/// List reservations: all of them for administrators, the caller's own otherwise
#[utoipa::path(
    get,
    path = "/api/bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservations, newest first", body = [ReservationDetail]),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ReservationDetail>>, ApiError> {
    let repo = ReservationRepository::new(&state.db);
    let reservations = if user.is_admin() {
        repo.list_all().await?
    } else {
        repo.list_for_user(user.id).await?
    };
    Ok(Json(reservations))
}

/// Every reservation in the system
#[utoipa::path(
    get,
    path = "/api/admin/bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All reservations, newest first", body = [ReservationDetail]),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn admin_bookings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<ReservationDetail>>, ApiError> {
    let reservations = ReservationRepository::new(&state.db).list_all().await?;
    Ok(Json(reservations))
}

/// Every reservation as a CSV attachment
#[utoipa::path(
    get,
    path = "/api/admin/bookings/export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV with columns Email, Axis, Year, ISO Week, Created", content_type = "text/csv", body = String),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn export_bookings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Response, ApiError> {
    let reservations = ReservationRepository::new(&state.db).list_all().await?;
    let body = reservations_csv(&reservations).map_err(anyhow::Error::from)?;
    tracing::info!(admin_id = %admin.id, rows = reservations.len(), "Exported reservations");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"reservations.csv\""),
    );
    Ok((headers, body).into_response())
}

/// The caller's own reservations
#[utoipa::path(
    get,
    path = "/api/bookings/my",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's reservations, newest first", body = [ReservationDetail]),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Only DG users have reservations", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn my_reservations(
    State(state): State<AppState>,
    DgUser(user): DgUser,
) -> Result<Json<Vec<ReservationDetail>>, ApiError> {
    let reservations = ReservationRepository::new(&state.db)
        .list_for_user(user.id)
        .await?;
    Ok(Json(reservations))
}

/// Reserve a slot for the caller
#[utoipa::path(
    post,
    path = "/api/bookings",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = ReservationDetail),
        (status = 400, description = "Week or year out of range", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrators cannot reserve", body = ApiError),
        (status = 404, description = "Axis not found", body = ApiError),
        (status = 409, description = "Slot already reserved", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    DgUser(user): DgUser,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let reservation = ReservationRepository::new(&state.db)
        .reserve(NewReservation {
            user_id: user.id,
            axis_id: request.axis_id,
            year: request.year,
            week: request.week,
        })
        .await?;
    let detail = load_detail(&state, reservation.id).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/bookings/{}", detail.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(detail)).into_response())
}

/// Fetch one reservation
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "The reservation", body = ReservationDetail),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Not found or not visible to the caller", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ReservationDetail>, ApiError> {
    let Path(id) = id?;
    Ok(Json(visible_reservation(&state, &user, id).await?))
}

/// Move a reservation to another slot
#[utoipa::path(
    patch,
    path = "/api/bookings/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    request_body = UpdateReservationRequest,
    responses(
        (status = 200, description = "Updated reservation", body = ReservationDetail),
        (status = 400, description = "Week or year out of range", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Reservation or axis not found", body = ApiError),
        (status = 409, description = "Target slot already reserved", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn update_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateReservationRequest>, JsonRejection>,
) -> Result<Json<ReservationDetail>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    visible_reservation(&state, &user, id).await?;

    let updated = ReservationRepository::new(&state.db)
        .update_slot(
            id,
            SlotChanges {
                axis_id: request.axis_id,
                year: request.year,
                week: request.week,
            },
        )
        .await?;
    tracing::info!(
        reservation_id = %updated.id,
        user_id = %user.id,
        year = updated.year,
        week = updated.week,
        "Reservation updated"
    );

    Ok(Json(load_detail(&state, updated.id).await?))
}

/// Cancel a reservation
#[utoipa::path(
    delete,
    path = "/api/bookings/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    responses(
        (status = 204, description = "Reservation deleted"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Not found or not visible to the caller", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn delete_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let detail = visible_reservation(&state, &user, id).await?;

    ReservationRepository::new(&state.db).delete(detail.id).await?;
    tracing::info!(reservation_id = %detail.id, user_id = %user.id, "Reservation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Download a reservation as an iCalendar file
#[utoipa::path(
    get,
    path = "/api/bookings/{id}/download-ics",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "iCalendar document", content_type = "text/calendar", body = String),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Not found or not visible to the caller", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn download_ics(
    State(state): State<AppState>,
    user: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let detail = visible_reservation(&state, &user, id).await?;

    let event = CalendarEvent {
        reservation_id: detail.id,
        axis_name: &detail.axis_name,
        owner_email: &detail.user_email,
        year: detail.year,
        week: detail.week,
    };
    let body = to_calendar_file(&event, Utc::now()).ok_or_else(|| {
        anyhow::anyhow!(
            "ISO week {} of {} cannot be placed on the calendar",
            detail.week,
            detail.year
        )
    })?;

    let filename = download_filename(&detail.axis_name, detail.week, detail.year);
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(anyhow::Error::from)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/calendar; charset=utf-8"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok((headers, body).into_response())
}
