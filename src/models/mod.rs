//! # Data Models
//!
//! This module contains the SeaORM entities and shared response models used
//! throughout the Axis Booking service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod axis;
pub mod reservation;
pub mod revoked_token;
pub mod user;

pub use axis::Entity as Axis;
pub use reservation::Entity as Reservation;
pub use revoked_token::Entity as RevokedToken;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "axis-booking".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
