//! Database connection and pool management for the Axis Booking service.
//!
//! This module provides functionality to initialize and manage a SeaORM
//! connection pool with configurable parameters, and to apply the schema.

use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::AppConfig;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Initializes a database connection pool with the given configuration.
///
/// Connection attempts are retried with exponential backoff so the service
/// can start alongside a database that is still booting.
///
/// ```no_run
/// use booking::{config::AppConfig, db::init_pool};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::default();
///     let db = init_pool(&config).await?;
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "Database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let max_retries = 5;
    let mut retry_delay = Duration::from_millis(100);
    let mut attempt = 1;

    loop {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                log::info!("Successfully connected to database (attempt {})", attempt);
                return Ok(conn);
            }
            Err(e) if attempt >= max_retries => {
                log::error!(
                    "Failed to connect to database after {} attempts: {}",
                    max_retries,
                    e
                );
                return Err(DatabaseError::ConnectionFailed { source: e }.into());
            }
            Err(e) => {
                log::warn!(
                    "Database connection attempt {} failed: {}, retrying in {:?}",
                    attempt,
                    e,
                    retry_delay
                );

                sleep(retry_delay).await;
                retry_delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Applies all pending schema migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .context("Failed to apply database migrations")?;
    log::info!("Database migrations applied");
    Ok(())
}

/// Health check for the database connection.
///
/// Verifies that the connection is still active by executing a trivial query.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    use sea_orm::Statement;

    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());

    db.query_one(stmt)
        .await
        .context("Database health check failed")?;

    Ok(())
}

/// In-memory SQLite database with the schema applied, for unit tests.
#[cfg(test)]
pub(crate) async fn memory_db() -> DatabaseConnection {
    // Every pooled connection to `sqlite::memory:` opens its own database.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt)
        .await
        .expect("in-memory sqlite should open");
    migrate(&db).await.expect("migrations should apply");
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_database_url() {
        let config = AppConfig {
            database_url: String::new(),
            ..Default::default()
        };

        let result = init_pool(&config).await;

        assert!(matches!(
            result.unwrap_err().downcast::<DatabaseError>(),
            Ok(DatabaseError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_database_fails_after_retries() {
        let config = AppConfig {
            database_url: "sqlite:/nonexistent-booking-dir/booking.db?mode=ro".to_string(),
            db_max_connections: 1,
            ..Default::default()
        };

        let result = init_pool(&config).await;

        assert!(matches!(
            result.unwrap_err().downcast::<DatabaseError>(),
            Ok(DatabaseError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_check_and_migrate_on_sqlite() {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            ..Default::default()
        };

        let db = init_pool(&config).await.unwrap();
        migrate(&db).await.unwrap();
        health_check(&db).await.unwrap();
    }
}
