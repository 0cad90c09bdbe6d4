//! Availability projections derived from the reservations currently stored.
//!
//! Every function here is pure: callers fetch the rows (one batched query per
//! view) and hand them over together with the [`Viewer`] the view is built for.
//! Owner identities are only ever revealed through [`Viewer::reveal`].

use std::collections::HashMap;

use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{TOTAL_WEEKS, WEEKS};
use crate::models::axis;

/// Who a projection is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    is_admin: bool,
}

impl Viewer {
    pub fn admin() -> Self {
        Self { is_admin: true }
    }

    pub fn member() -> Self {
        Self { is_admin: false }
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Non-admins never see who holds a slot, their own reservations included.
    fn reveal(&self, owner_email: Option<&str>) -> Option<String> {
        if self.is_admin {
            owner_email.map(str::to_string)
        } else {
            None
        }
    }
}

/// A taken slot as read from storage.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct BookedSlot {
    pub axis_id: Uuid,
    pub week: i32,
    pub owner_email: String,
}

/// Availability of one `(axis, year, week)` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SlotAvailability {
    pub axis_id: Uuid,
    #[schema(example = "Thies - Mbour - Saly")]
    pub axis_name: String,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 10)]
    pub week: i32,
    pub is_available: bool,
    /// Holder of the slot; only populated for administrators
    pub owner_email: Option<String>,
}

/// One week inside a [`WeekGrid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeekAvailability {
    pub week: i32,
    pub is_available: bool,
    pub owner_email: Option<String>,
}

/// Every week of one year for a single axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeekGrid {
    pub axis_id: Uuid,
    pub axis_name: String,
    pub year: i32,
    pub weeks: Vec<WeekAvailability>,
}

/// Every axis crossed with every week of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FullGrid {
    pub year: i32,
    pub total_axes: usize,
    pub total_weeks: usize,
    pub total_slots: usize,
    pub slots: Vec<SlotAvailability>,
}

/// Availability of a single slot given its current holder, if any.
pub fn slot_availability(
    axis: &axis::Model,
    year: i32,
    week: i32,
    holder: Option<&str>,
    viewer: Viewer,
) -> SlotAvailability {
    SlotAvailability {
        axis_id: axis.id,
        axis_name: axis.name.clone(),
        year,
        week,
        is_available: holder.is_none(),
        owner_email: viewer.reveal(holder),
    }
}

/// Weeks 1..=53 of `year` for `axis`. Rows for other axes are ignored.
pub fn week_grid(axis: &axis::Model, year: i32, booked: &[BookedSlot], viewer: Viewer) -> WeekGrid {
    let by_week: HashMap<i32, &str> = booked
        .iter()
        .filter(|slot| slot.axis_id == axis.id)
        .map(|slot| (slot.week, slot.owner_email.as_str()))
        .collect();

    let weeks = WEEKS
        .map(|week| {
            let holder = by_week.get(&week).copied();
            WeekAvailability {
                week,
                is_available: holder.is_none(),
                owner_email: viewer.reveal(holder),
            }
        })
        .collect();

    WeekGrid {
        axis_id: axis.id,
        axis_name: axis.name.clone(),
        year,
        weeks,
    }
}

/// Cross product of `axes` (in the order given) and weeks 1..=53.
pub fn full_grid(year: i32, axes: &[axis::Model], booked: &[BookedSlot], viewer: Viewer) -> FullGrid {
    let index = index_by_slot(booked);

    let slots: Vec<SlotAvailability> = axes
        .iter()
        .flat_map(|axis| {
            let index = &index;
            WEEKS.map(move |week| {
                let holder = index.get(&(axis.id, week)).copied();
                slot_availability(axis, year, week, holder, viewer)
            })
        })
        .collect();

    FullGrid {
        year,
        total_axes: axes.len(),
        total_weeks: TOTAL_WEEKS,
        total_slots: slots.len(),
        slots,
    }
}

/// One entry per axis for a single week.
pub fn week_across_axes(
    year: i32,
    week: i32,
    axes: &[axis::Model],
    booked: &[BookedSlot],
    viewer: Viewer,
) -> Vec<SlotAvailability> {
    let index = index_by_slot(booked);

    axes.iter()
        .map(|axis| {
            let holder = index.get(&(axis.id, week)).copied();
            slot_availability(axis, year, week, holder, viewer)
        })
        .collect()
}

fn index_by_slot(booked: &[BookedSlot]) -> HashMap<(Uuid, i32), &str> {
    booked
        .iter()
        .map(|slot| ((slot.axis_id, slot.week), slot.owner_email.as_str()))
        .collect()
}
