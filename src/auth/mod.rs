//! # Authentication and Authorization
//!
//! Bearer-token authentication for protected endpoints and role extractors.
//! A user is an administrator when flagged as one or when their email is the
//! configured principal admin; everyone else is a DG user.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::ledger::availability::Viewer;
use crate::models::user;
use crate::repositories::{RevokedTokenRepository, UserRepository};
use crate::server::AppState;
use tokens::{TokenError, TokenType};

pub mod password;
pub mod tokens;

/// Role of an account as seen by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Dg,
}

impl UserRole {
    /// Front-end landing page for the role
    pub fn landing_path(&self) -> &'static str {
        match self {
            UserRole::Admin => "/admin",
            UserRole::Dg => "/dashboard",
        }
    }
}

/// Resolves the effective role of an account.
pub fn resolve_role(user: &user::Model, config: &AppConfig) -> UserRole {
    if user.is_admin || config.is_principal_admin(&user.email) {
        UserRole::Admin
    } else {
        UserRole::Dg
    }
}

/// The authenticated caller, inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    /// Claims of the access token used for this request
    pub token: tokens::Claims,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn viewer(&self) -> Viewer {
        if self.is_admin() {
            Viewer::admin()
        } else {
            Viewer::member()
        }
    }

    pub fn token_expires_at(&self) -> DateTime<Utc> {
        self.token.expires_at()
    }
}

/// Caller that must be an administrator (403 otherwise)
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

/// Caller that must be a DG user (403 otherwise)
#[derive(Debug, Clone)]
pub struct DgUser(pub CurrentUser);

/// Authentication middleware validating `Authorization: Bearer <access token>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = state
        .tokens
        .decode(token, TokenType::Access)
        .map_err(|err| {
            tracing::debug!(error = %err, "Rejected access token");
            match err {
                TokenError::Expired => unauthorized(Some("Token has expired")),
                _ => unauthorized(Some("Invalid access token")),
            }
        })?;

    if RevokedTokenRepository::new(&state.db)
        .is_revoked(claims.jti)
        .await?
    {
        return Err(unauthorized(Some("Token has been revoked")));
    }

    let user = UserRepository::new(&state.db)
        .find_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| unauthorized(Some("User not found or inactive")))?;

    let current = CurrentUser {
        id: user.id,
        role: resolve_role(&user, &state.config),
        email: user.email,
        token: claims,
    };
    tracing::debug!(user_id = %current.id, role = ?current.role, "Authenticated request");

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(None))
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(forbidden(Some("Administrator access required")))
        }
    }
}

impl<S> FromRequestParts<S> for DgUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Err(forbidden(Some("Only DG users can perform this action")))
        } else {
            Ok(DgUser(user))
        }
    }
}
