//! # Authentication API Handlers
//!
//! Login, refresh-token rotation and logout.

use axum::{
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::password::verify_password;
use crate::auth::tokens::{TokenError, TokenType};
use crate::auth::{CurrentUser, UserRole, resolve_role};
use crate::error::{ApiError, unauthorized, validation_error};
use crate::handlers::MessageResponse;
use crate::handlers::users::UserResponse;
use crate::repositories::{RevokedTokenRepository, UserRepository};
use crate::server::AppState;

/// Credentials for `POST /api/auth/login`
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "dg@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserResponse,
    pub user_type: UserRole,
    #[schema(example = "/dashboard")]
    pub redirect_to: String,
    pub message: String,
}

/// Body of `POST /api/auth/token/refresh`
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// A rotated token pair
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Body of `POST /api/auth/logout`; may be omitted entirely
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh: Option<String>,
}

fn token_failure(err: TokenError) -> ApiError {
    match err {
        TokenError::Expired => unauthorized(Some("Token has expired")),
        TokenError::MissingSecret | TokenError::Encode(_) => anyhow::Error::from(err).into(),
        _ => unauthorized(Some("Invalid refresh token")),
    }
}

/// Exchange credentials for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Malformed body", body = ApiError),
        (status = 401, description = "Invalid credentials or inactive account", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let repo = UserRepository::new(&state.db);

    let user = repo
        .find_by_email(&request.email)
        .await?
        .filter(|user| user.is_active)
        .filter(|user| {
            user.password_hash
                .as_deref()
                .is_some_and(|hash| verify_password(&request.password, hash))
        });

    let Some(mut user) = user else {
        counter!("auth_logins_total", "outcome" => "failure").increment(1);
        tracing::info!("Login rejected");
        return Err(unauthorized(Some("Invalid email or password")));
    };

    if state.config.is_principal_admin(&user.email) && !user.is_admin {
        tracing::info!(user_id = %user.id, "Promoting principal admin on login");
        user = repo.promote_to_admin(user).await?;
    }

    let role = resolve_role(&user, &state.config);
    let pair = state
        .tokens
        .issue_pair(user.id, &user.email)
        .map_err(token_failure)?;

    counter!("auth_logins_total", "outcome" => "success").increment(1);
    tracing::info!(user_id = %user.id, role = ?role, "Login succeeded");

    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: UserResponse::from_model(&user, &state.config),
        user_type: role,
        redirect_to: role.landing_path().to_string(),
        message: "Login successful".to_string(),
    }))
}

/// Rotate a refresh token; the presented token is revoked
#[utoipa::path(
    post,
    path = "/api/auth/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPairResponse),
        (status = 400, description = "Malformed body", body = ApiError),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let Json(request) = payload?;

    let claims = state
        .tokens
        .decode(&request.refresh, TokenType::Refresh)
        .map_err(token_failure)?;

    let revoked = RevokedTokenRepository::new(&state.db);
    if revoked.is_revoked(claims.jti).await? {
        return Err(unauthorized(Some("Token has been revoked")));
    }

    let user = UserRepository::new(&state.db)
        .find_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| unauthorized(Some("User not found or inactive")))?;

    // A concurrent refresh with the same token may have passed the check above.
    if !revoked.revoke(&claims).await? {
        tracing::warn!(user_id = %user.id, jti = %claims.jti, "Refresh token replayed");
        return Err(unauthorized(Some("Token has been revoked")));
    }

    let pair = state
        .tokens
        .issue_pair(user.id, &user.email)
        .map_err(token_failure)?;

    Ok(Json(TokenPairResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

/// Revoke the current access token and, if given, the refresh token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(("bearer_auth" = [])),
    request_body(content = LogoutRequest, description = "Optional refresh token to revoke"),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "Refresh token malformed or not owned by caller", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: LogoutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            validation_error("Invalid request body", json!({ "body": err.to_string() }))
        })?
    };

    let refresh_claims = request
        .refresh
        .as_deref()
        .map(|refresh| {
            state
                .tokens
                .decode(refresh, TokenType::Refresh)
                .ok()
                .filter(|claims| claims.sub == user.id)
                .ok_or_else(|| {
                    validation_error(
                        "Invalid refresh token",
                        json!({ "refresh": "Token is invalid or belongs to another user" }),
                    )
                })
        })
        .transpose()?;

    let revoked = RevokedTokenRepository::new(&state.db);
    revoked.revoke(&user.token).await?;
    if let Some(claims) = &refresh_claims {
        revoked.revoke(claims).await?;
    }

    let purged = revoked.purge_expired(chrono::Utc::now()).await?;
    tracing::info!(user_id = %user.id, purged, "User logged out");

    Ok(Json(MessageResponse {
        message: "Logout successful".to_string(),
    }))
}
