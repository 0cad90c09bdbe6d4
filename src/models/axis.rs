//! Axis entity model
//!
//! An axis is a named geographic division that can be reserved one ISO week
//! at a time. The set of axes is seed data.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Axis entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "axes")]
#[schema(as = Axis)]
pub struct Model {
    /// Unique identifier for the axis (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name, unique across axes
    #[sea_orm(unique)]
    #[schema(example = "Thies - Mbour - Saly")]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
