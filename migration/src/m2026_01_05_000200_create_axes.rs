//! Migration to create the axes table (geographic reservation units).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Axes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Axes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Axes::Name).string_len(100).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_axes_name")
                    .table(Axes::Table)
                    .col(Axes::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Axes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Axes {
    Table,
    Id,
    Name,
}
