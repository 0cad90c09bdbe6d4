//! # Axis Booking Library
//!
//! This library provides the core functionality for the Axis Booking service:
//! weekly reservation of geographic axes, availability views, coverage
//! statistics and the HTTP API around them.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod rate_limit;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub use migration;
