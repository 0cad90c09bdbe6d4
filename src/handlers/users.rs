//! # User Directory API Handlers
//!
//! Administrator-only management of accounts. Accounts created here are always
//! DG users; administrators are provisioned through configuration or the
//! `manage create-admin` command.

use axum::{
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AdminUser, UserRole, resolve_role};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::user;
use crate::repositories::UserRepository;
use crate::repositories::user::{NewUser, UserChanges};
use crate::server::AppState;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Public view of an account; never includes the password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "dg@example.com")]
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
    #[schema(value_type = String, format = DateTime)]
    pub date_joined: DateTimeWithTimeZone,
    pub role: UserRole,
}

impl UserResponse {
    pub fn from_model(user: &user::Model, config: &AppConfig) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_active: user.is_active,
            date_joined: user.date_joined,
            role: resolve_role(user, config),
        }
    }
}

/// Body of `POST /api/users`
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "dg@example.com")]
    pub email: String,
    /// At least 8 characters
    pub password: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Body of `PATCH /api/users/{id}`; omitted fields keep their value
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// List every account
#[utoipa::path(
    get,
    path = "/api/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All accounts ordered by email", body = [UserResponse]),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepository::new(&state.db).list().await?;
    Ok(Json(
        users
            .iter()
            .map(|user| UserResponse::from_model(user, &state.config))
            .collect(),
    ))
}

/// Create a DG user
#[utoipa::path(
    post,
    path = "/api/users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid email or password too short", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let created = UserRepository::new(&state.db)
        .create(NewUser {
            email: request.email,
            password: request.password,
            is_admin: false,
            is_active: request.is_active,
        })
        .await?;
    tracing::info!(user_id = %created.id, created_by = %admin.id, "User created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/users/{}", created.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((
        StatusCode::CREATED,
        headers,
        Json(UserResponse::from_model(&created, &state.config)),
    )
        .into_response())
}

/// Fetch one account
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The account", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let user = UserRepository::new(&state.db).require(id).await?;
    Ok(Json(UserResponse::from_model(&user, &state.config)))
}

/// Update an account
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Invalid email or password too short", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required, or principal admin protected", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload?;

    let updated = UserRepository::new(&state.db)
        .update(
            id,
            UserChanges {
                email: request.email,
                password: request.password,
                is_active: request.is_active,
            },
            &state.config,
        )
        .await?;
    tracing::info!(user_id = %updated.id, updated_by = %admin.id, "User updated");

    Ok(Json(UserResponse::from_model(&updated, &state.config)))
}

/// Delete an account together with its reservations
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Administrator access required, or principal admin protected", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    UserRepository::new(&state.db)
        .delete(id, &state.config)
        .await?;
    tracing::info!(user_id = %id, deleted_by = %admin.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
