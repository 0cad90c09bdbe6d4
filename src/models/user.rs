//! User entity model
//!
//! Accounts are either DG users (`is_admin = false`) who reserve slots, or
//! administrators who oversee every reservation.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// User account
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login email, always stored lower-cased
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2 PHC string; `None` means the account cannot log in with a password
    pub password_hash: Option<String>,

    pub is_admin: bool,

    pub is_active: bool,

    pub date_joined: DateTimeWithTimeZone,
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
