//! # Axis Repository
//!
//! Read access to the reservable axes and idempotent maintenance of the seed set.

use crate::error::RepositoryError;
use crate::models::axis::{ActiveModel as AxisActiveModel, Column, Entity as Axis, Model as AxisModel};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// Repository for Axis database operations
pub struct AxisRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> AxisRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// All axes ordered by name
    pub async fn list(&self) -> Result<Vec<AxisModel>, RepositoryError> {
        Axis::find()
            .order_by_asc(Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<AxisModel>, RepositoryError> {
        Axis::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Like [`find`](Self::find) but an unknown id is a `NotFound` error.
    pub async fn require(&self, id: Uuid) -> Result<AxisModel, RepositoryError> {
        self.find(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Axis"))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<AxisModel>, RepositoryError> {
        Axis::find()
            .filter(Column::Name.eq(name))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Axis::find()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Inserts every name not already present; returns how many were created.
    pub async fn ensure_named(&self, names: &[&str]) -> Result<usize, RepositoryError> {
        let mut created = 0;
        for name in names {
            if self.find_by_name(name).await?.is_some() {
                continue;
            }

            AxisActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set((*name).to_string()),
            }
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
            created += 1;
        }
        Ok(created)
    }

    /// Removes every axis; their reservations go with them.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = Axis::delete_many()
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_db;

    #[tokio::test]
    async fn ensure_named_is_idempotent_and_list_is_sorted() {
        let db = memory_db().await;
        let repo = AxisRepository::new(&db);

        let created = repo.ensure_named(&["Tamba - Kedougou", "Diourbel - Touba"]).await.unwrap();
        assert_eq!(created, 2);
        let created_again = repo.ensure_named(&["Diourbel - Touba"]).await.unwrap();
        assert_eq!(created_again, 0);

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["Diourbel - Touba", "Tamba - Kedougou"]);
    }

    #[tokio::test]
    async fn require_unknown_axis_is_not_found() {
        let db = memory_db().await;
        let err = AxisRepository::new(&db).require(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
