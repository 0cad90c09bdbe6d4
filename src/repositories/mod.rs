//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities. Repositories return [`crate::error::RepositoryError`], which
//! handlers convert into API errors.

pub mod axis;
pub mod reservation;
pub mod revoked_token;
pub mod user;

pub use axis::AxisRepository;
pub use reservation::ReservationRepository;
pub use revoked_token::RevokedTokenRepository;
pub use user::UserRepository;
