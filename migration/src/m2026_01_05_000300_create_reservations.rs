//! Migration to create the reservations table.
//!
//! The composite unique index on `(axis_id, year, week)` is what guarantees a
//! slot has at most one holder, including under concurrent inserts.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reservations::UserId).uuid().not_null())
                    .col(ColumnDef::new(Reservations::AxisId).uuid().not_null())
                    .col(ColumnDef::new(Reservations::Year).integer().not_null())
                    .col(ColumnDef::new(Reservations::Week).integer().not_null())
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_user_id")
                            .from(Reservations::Table, Reservations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_axis_id")
                            .from(Reservations::Table, Reservations::AxisId)
                            .to(Axes::Table, Axes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_axis_year_week")
                    .table(Reservations::Table)
                    .col(Reservations::AxisId)
                    .col(Reservations::Year)
                    .col(Reservations::Week)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_user_year")
                    .table(Reservations::Table)
                    .col(Reservations::UserId)
                    .col(Reservations::Year)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_year_week")
                    .table(Reservations::Table)
                    .col(Reservations::Year)
                    .col(Reservations::Week)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_created_at")
                    .table(Reservations::Table)
                    .col(Reservations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_reservations_axis_year_week",
            "idx_reservations_user_year",
            "idx_reservations_year_week",
            "idx_reservations_created_at",
        ] {
            manager
                .drop_index(Index::drop().name(name).table(Reservations::Table).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Reservations {
    Table,
    Id,
    UserId,
    AxisId,
    Year,
    Week,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Axes {
    Table,
    Id,
}
