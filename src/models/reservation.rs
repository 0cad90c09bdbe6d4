//! Reservation entity model
//!
//! A reservation binds one slot, the `(axis_id, year, week)` triple, to the
//! user who booked it. The triple is unique at the storage layer.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Reservation entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owner of the reservation
    pub user_id: Uuid,

    /// Reserved axis
    pub axis_id: Uuid,

    /// Calendar year (2000..=2100)
    pub year: i32,

    /// ISO week number (1..=53)
    pub week: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::axis::Entity",
        from = "Column::AxisId",
        to = "super::axis::Column::Id",
        on_delete = "Cascade"
    )]
    Axis,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::axis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Axis.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
