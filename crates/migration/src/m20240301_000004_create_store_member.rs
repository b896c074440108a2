//! Create `store_member` table linking users to stores with a role.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StoreMember::Table)
                    .if_not_exists()
                    .col(uuid(StoreMember::Id).primary_key())
                    .col(uuid(StoreMember::StoreId).not_null())
                    .col(uuid(StoreMember::UserId).not_null())
                    .col(string_len(StoreMember::Role, 16).not_null())
                    .col(timestamp_with_time_zone(StoreMember::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(StoreMember::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_store_member_store")
                            .from(StoreMember::Table, StoreMember::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_store_member_user")
                            .from(StoreMember::Table, StoreMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership per (store, user)
        manager
            .create_index(
                Index::create()
                    .name("uniq_store_member_store_user")
                    .table(StoreMember::Table)
                    .col(StoreMember::StoreId)
                    .col(StoreMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(StoreMember::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum StoreMember { Table, Id, StoreId, UserId, Role, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Store { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
