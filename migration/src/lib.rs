//! Database migrations for the Axis Booking service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_000100_create_users;
mod m2026_01_05_000200_create_axes;
mod m2026_01_05_000300_create_reservations;
mod m2026_01_05_000400_create_revoked_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_000100_create_users::Migration),
            Box::new(m2026_01_05_000200_create_axes::Migration),
            Box::new(m2026_01_05_000300_create_reservations::Migration),
            Box::new(m2026_01_05_000400_create_revoked_tokens::Migration),
        ]
    }
}
