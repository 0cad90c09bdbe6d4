//! Database seeding functionality
//!
//! Populates the reservable axes and bootstraps the principal administrator
//! when the service or the `manage` CLI starts.

pub mod admin;
pub mod axis;

pub use admin::ensure_principal_admin;
pub use axis::{DEFAULT_AXES, reset_axes, seed_axes};
