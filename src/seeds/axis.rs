//! Axis seeding functionality
//!
//! The seven default axes are created idempotently; `reset_axes` wipes them
//! (and every reservation) before recreating the set.

use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};

use crate::models::Reservation;
use crate::repositories::AxisRepository;

/// Names of the axes available for reservation.
pub const DEFAULT_AXES: [&str; 7] = [
    "Thies - Mbour - Saly",
    "Diourbel - Touba",
    "Louga - Saint Louis - Podor",
    "Linguere - Matam - Bakel",
    "Fatick - Kaolack - Kaffrine",
    "Tamba - Kedougou",
    "Zig - Sedhiou - Kolda",
];

/// Creates any default axis that does not exist yet. Returns how many were created.
pub async fn seed_axes(db: &DatabaseConnection) -> Result<usize> {
    let created = AxisRepository::new(db)
        .ensure_named(&DEFAULT_AXES)
        .await
        .context("Failed to seed axes")?;

    if created == 0 {
        log::info!("All {} default axes already exist, skipping", DEFAULT_AXES.len());
    } else {
        log::info!("Created {} default axes", created);
    }
    Ok(created)
}

/// Deletes every reservation and axis, then recreates the default set.
pub async fn reset_axes(db: &DatabaseConnection) -> Result<usize> {
    let txn = db.begin().await.context("Failed to open transaction")?;

    let reservations = Reservation::delete_many()
        .exec(&txn)
        .await
        .context("Failed to delete reservations")?;
    let axes = crate::models::Axis::delete_many()
        .exec(&txn)
        .await
        .context("Failed to delete axes")?;
    txn.commit().await.context("Failed to commit axis reset")?;

    log::warn!(
        "Deleted {} reservations and {} axes",
        reservations.rows_affected,
        axes.rows_affected
    );

    seed_axes(db).await
}
