//! Create `plan` table: SaaS tiers with per-store feature limits.
//! A NULL limit means unlimited.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Plan::Table)
                    .if_not_exists()
                    .col(uuid(Plan::Id).primary_key())
                    .col(string_len(Plan::Name, 64).not_null())
                    .col(string_len(Plan::Slug, 64).unique_key().not_null())
                    .col(big_integer(Plan::Price).not_null())
                    .col(string_len(Plan::Currency, 3).not_null())
                    .col(integer(Plan::IntervalDays).not_null())
                    .col(ColumnDef::new(Plan::MaxProducts).integer().null())
                    .col(ColumnDef::new(Plan::MaxOrders).integer().null())
                    .col(ColumnDef::new(Plan::MaxStorageMb).integer().null())
                    .col(boolean(Plan::IsActive).not_null())
                    .col(timestamp_with_time_zone(Plan::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Plan::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Plan::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Plan {
    Table,
    Id,
    Name,
    Slug,
    Price,
    Currency,
    IntervalDays,
    MaxProducts,
    MaxOrders,
    MaxStorageMb,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
