//! # Revoked Token Repository
//!
//! Denylist of token ids invalidated before their natural expiry.

use crate::auth::tokens::Claims;
use crate::error::RepositoryError;
use crate::models::revoked_token::{ActiveModel, Column, Entity as RevokedToken};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TryInsertResult,
    sea_query::OnConflict,
};
use uuid::Uuid;

/// Repository for RevokedToken database operations
pub struct RevokedTokenRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> RevokedTokenRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records the token as revoked.
    ///
    /// Returns `false` when the token was already revoked. The primary key on
    /// `jti` decides between concurrent callers, so exactly one sees `true`.
    pub async fn revoke(&self, claims: &Claims) -> Result<bool, RepositoryError> {
        let row = ActiveModel {
            jti: Set(claims.jti),
            user_id: Set(claims.sub),
            token_type: Set(claims.token_type.as_str().to_string()),
            expires_at: Set(claims.expires_at().into()),
            revoked_at: Set(Utc::now().into()),
        };

        let outcome = RevokedToken::insert(row)
            .on_conflict(OnConflict::column(Column::Jti).do_nothing().to_owned())
            .do_nothing()
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(matches!(outcome, TryInsertResult::Inserted(_)))
    }

    pub async fn is_revoked(&self, jti: Uuid) -> Result<bool, RepositoryError> {
        let found = RevokedToken::find_by_id(jti)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(found.is_some())
    }

    /// Drops rows whose tokens have expired anyway.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let now: DateTimeWithTimeZone = now.into();
        let result = RevokedToken::delete_many()
            .filter(Column::ExpiresAt.lt(now))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected)
    }
}
