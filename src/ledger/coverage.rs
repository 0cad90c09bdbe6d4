//! Coverage statistics: how many distinct axes a user has reserved, all time.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coverage of one user over the configured number of axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coverage {
    #[schema(example = "dg@example.com")]
    pub user_email: String,
    #[schema(example = 2)]
    pub distinct_axes_count: u64,
    #[schema(example = 7)]
    pub total_axes: u32,
    /// Percentage rounded to two decimals
    #[schema(example = 28.57)]
    pub coverage_rate: f64,
}

impl Coverage {
    pub fn new(user_email: impl Into<String>, distinct_axes_count: u64, total_axes: u32) -> Self {
        Self {
            user_email: user_email.into(),
            distinct_axes_count,
            total_axes,
            coverage_rate: coverage_rate(distinct_axes_count, total_axes),
        }
    }
}

/// `distinct / total * 100` rounded to two decimals; `0.0` when there are no axes.
pub fn coverage_rate(distinct_axes_count: u64, total_axes: u32) -> f64 {
    if total_axes == 0 {
        return 0.0;
    }
    let rate = distinct_axes_count as f64 / f64::from(total_axes) * 100.0;
    (rate * 100.0).round() / 100.0
}
