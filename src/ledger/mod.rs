//! # Booking Ledger
//!
//! Slot rules shared by the reservation store and the read-side projections.
//! A slot is one `(axis, year, ISO week)` triple and can be held by at most one user.

use std::ops::RangeInclusive;

use serde_json::{Map, Value};

use crate::error::RepositoryError;

pub mod availability;
pub mod calendar;
pub mod coverage;
pub mod export;

/// Every week number a slot may use. Grids always enumerate all of them,
/// whether or not the year actually has an ISO week 53.
pub const WEEKS: RangeInclusive<i32> = 1..=53;

/// Accepted reservation years.
pub const YEARS: RangeInclusive<i32> = 2000..=2100;

/// Number of weeks enumerated per axis in grid views.
pub const TOTAL_WEEKS: usize = 53;

/// Checks that `year` and `week` are inside the bookable ranges.
///
/// Both fields are checked so the caller gets every problem at once.
pub fn validate_period(year: i32, week: i32) -> Result<(), RepositoryError> {
    let mut fields = Map::new();

    if !YEARS.contains(&year) {
        fields.insert(
            "year".to_string(),
            Value::String(format!(
                "Year must be between {} and {}",
                YEARS.start(),
                YEARS.end()
            )),
        );
    }

    if !WEEKS.contains(&week) {
        fields.insert(
            "week".to_string(),
            Value::String(format!(
                "Week must be between {} and {}",
                WEEKS.start(),
                WEEKS.end()
            )),
        );
    }

    if fields.is_empty() {
        return Ok(());
    }

    Err(RepositoryError::Validation {
        message: "Invalid reservation period".to_string(),
        fields: Value::Object(fields),
    })
}

/// Checks a year on its own, for views that take no week.
pub fn validate_year(year: i32) -> Result<(), RepositoryError> {
    if YEARS.contains(&year) {
        Ok(())
    } else {
        Err(RepositoryError::validation_error(
            "year",
            format!("Year must be between {} and {}", YEARS.start(), YEARS.end()),
        ))
    }
}
