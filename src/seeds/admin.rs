//! Principal administrator bootstrap.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::models::user;
use crate::repositories::UserRepository;

/// Makes sure the configured principal admin account exists.
///
/// Only acts when `ADMIN_PASSWORD` is configured. An existing account is
/// promoted and activated but keeps its current password.
pub async fn ensure_principal_admin(
    db: &DatabaseConnection,
    config: &AppConfig,
) -> Result<Option<user::Model>> {
    let Some(password) = config.admin_password.as_deref() else {
        log::debug!("No admin bootstrap password configured, skipping principal admin setup");
        return Ok(None);
    };

    let repo = UserRepository::new(db);
    let email = config.principal_admin_email.as_str();

    let admin = match repo
        .find_by_email(email)
        .await
        .context("Failed to look up principal admin")?
    {
        Some(existing) if existing.is_admin && existing.is_active => existing,
        Some(existing) => {
            log::info!("Promoting existing account {} to principal admin", existing.email);
            let promoted = repo
                .promote_to_admin(existing)
                .await
                .context("Failed to promote principal admin")?;
            repo.update(
                promoted.id,
                crate::repositories::user::UserChanges {
                    is_active: Some(true),
                    ..Default::default()
                },
                config,
            )
            .await
            .context("Failed to activate principal admin")?
        }
        None => {
            log::info!("Creating principal admin account {}", email);
            repo.upsert_admin(email, password)
                .await
                .context("Failed to create principal admin")?
        }
    };

    Ok(Some(admin))
}
