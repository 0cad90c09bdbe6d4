//! # Axis Booking Main Entry Point
//!
//! This is the main entry point for the Axis Booking API service.

use anyhow::Context;
use booking::{
    auth::tokens::TokenService,
    config::ConfigLoader,
    db, seeds,
    server::{AppState, run_server},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from layered env files and variables
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    telemetry::init_tracing(&config).context("initializing telemetry")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::migrate(&db).await.context("applying migrations")?;

    if config.seed_axes_on_startup {
        let created = seeds::seed_axes(&db).await?;
        tracing::info!(created, "Axis seed complete");
    }
    if let Some(admin) = seeds::ensure_principal_admin(&db, &config).await? {
        tracing::info!(user_id = %admin.id, "Principal admin ready");
    }

    let tokens = TokenService::from_config(&config).context("initializing token service")?;

    run_server(AppState::new(config, db, tokens)).await
}
