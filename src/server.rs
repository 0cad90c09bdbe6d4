//! # Server Configuration
//!
//! This module contains the router, shared state and OpenAPI document for the
//! Axis Booking API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{auth_middleware, tokens::TokenService};
use crate::config::AppConfig;
use crate::handlers;
use crate::rate_limit::{RateLimits, anonymous_rate_limit, login_rate_limit, user_rate_limit};
use crate::telemetry::{TRACE_ID_HEADER, trace_id_middleware};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub tokens: Arc<TokenService>,
    pub limits: Arc<RateLimits>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection, tokens: TokenService) -> Self {
        let limits = RateLimits::from_config(&config);
        Self {
            config: Arc::new(config),
            db,
            tokens: Arc::new(tokens),
            limits: Arc::new(limits),
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz));

    let auth = Router::new()
        .route(
            "/api/auth/login",
            post(handlers::auth::login).route_layer(middleware::from_fn_with_state(
                state.clone(),
                login_rate_limit,
            )),
        )
        .route("/api/auth/token/refresh", post(handlers::auth::refresh_token))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            anonymous_rate_limit,
        ));

    let protected = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/axes", get(handlers::axes::list_axes))
        .route("/api/axes/{id}", get(handlers::axes::get_axis))
        .route(
            "/api/bookings",
            get(handlers::reservations::list_reservations)
                .post(handlers::reservations::create_reservation),
        )
        .route("/api/bookings/my", get(handlers::reservations::my_reservations))
        .route(
            "/api/bookings/availability",
            get(handlers::availability::slot_availability),
        )
        .route("/api/bookings/all-slots", get(handlers::availability::all_slots))
        .route(
            "/api/bookings/{id}",
            get(handlers::reservations::get_reservation)
                .patch(handlers::reservations::update_reservation)
                .delete(handlers::reservations::delete_reservation),
        )
        .route(
            "/api/bookings/{id}/download-ics",
            get(handlers::reservations::download_ics),
        )
        .route(
            "/api/weeks/availability",
            get(handlers::availability::week_availability),
        )
        .route("/api/coverage/my", get(handlers::coverage::my_coverage))
        .route("/api/admin/bookings", get(handlers::reservations::admin_bookings))
        .route(
            "/api/admin/bookings/export",
            get(handlers::reservations::export_bookings),
        )
        .route("/api/admin/coverage", get(handlers::coverage::admin_coverage))
        .route(
            "/api/admin/axes/availability",
            get(handlers::availability::admin_axes_availability),
        )
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/{id}",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), user_rate_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public)
        .merge(auth)
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(trace_id_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([
            HeaderName::from_static(TRACE_ID_HEADER),
            header::CONTENT_DISPOSITION,
            header::LOCATION,
        ])
}

/// Starts the server with the given configuration
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::logout,
        crate::handlers::axes::list_axes,
        crate::handlers::axes::get_axis,
        crate::handlers::reservations::list_reservations,
        crate::handlers::reservations::my_reservations,
        crate::handlers::reservations::create_reservation,
        crate::handlers::reservations::get_reservation,
        crate::handlers::reservations::update_reservation,
        crate::handlers::reservations::delete_reservation,
        crate::handlers::reservations::download_ics,
        crate::handlers::reservations::admin_bookings,
        crate::handlers::reservations::export_bookings,
        crate::handlers::availability::slot_availability,
        crate::handlers::availability::week_availability,
        crate::handlers::availability::all_slots,
        crate::handlers::availability::admin_axes_availability,
        crate::handlers::coverage::my_coverage,
        crate::handlers::coverage::admin_coverage,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::axis::Model,
            crate::error::ApiError,
            crate::auth::UserRole,
            crate::handlers::HealthStatus,
            crate::handlers::MessageResponse,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::RefreshRequest,
            crate::handlers::auth::TokenPairResponse,
            crate::handlers::auth::LogoutRequest,
            crate::handlers::reservations::CreateReservationRequest,
            crate::handlers::reservations::UpdateReservationRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::repositories::reservation::ReservationDetail,
            crate::ledger::availability::SlotAvailability,
            crate::ledger::availability::WeekAvailability,
            crate::ledger::availability::WeekGrid,
            crate::ledger::availability::FullGrid,
            crate::ledger::coverage::Coverage,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, token refresh and logout"),
        (name = "axes", description = "Reservable axes"),
        (name = "reservations", description = "Weekly axis reservations"),
        (name = "availability", description = "Slot availability views"),
        (name = "coverage", description = "Axis coverage statistics"),
        (name = "admin", description = "Administrator views"),
        (name = "users", description = "User directory"),
    ),
    info(
        title = "Axis Booking API",
        description = "Weekly reservation of geographic axes",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
