//! Create `store` table: the tenant boundary for catalog, carts, orders and billing.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Store::Table)
                    .if_not_exists()
                    .col(uuid(Store::Id).primary_key())
                    .col(uuid(Store::OwnerId).not_null())
                    .col(string_len(Store::Name, 128).not_null())
                    .col(string_len(Store::Slug, 128).unique_key().not_null())
                    .col(ColumnDef::new(Store::Description).text().null())
                    .col(string_len(Store::Currency, 3).not_null())
                    .col(string_len(Store::Status, 32).not_null())
                    .col(timestamp_with_time_zone(Store::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Store::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_store_owner")
                            .from(Store::Table, Store::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Store::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Store { Table, Id, OwnerId, Name, Slug, Description, Currency, Status, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
