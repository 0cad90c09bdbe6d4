//! Revoked token entity model
//!
//! Stores the `jti` of every access or refresh token invalidated by logout or
//! by refresh rotation, until the token would have expired anyway.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "revoked_tokens")]
pub struct Model {
    /// JWT id of the revoked token (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub jti: Uuid,

    pub user_id: Uuid,

    /// `access` or `refresh`
    pub token_type: String,

    /// Original expiry of the token; rows past this instant can be purged
    pub expires_at: DateTimeWithTimeZone,

    pub revoked_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
