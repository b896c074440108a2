//! Create `subscription` table linking a store to a plan for a billing window.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscription::Table)
                    .if_not_exists()
                    .col(uuid(Subscription::Id).primary_key())
                    .col(uuid(Subscription::StoreId).not_null())
                    .col(uuid(Subscription::PlanId).not_null())
                    .col(string_len(Subscription::Status, 16).not_null())
                    .col(ColumnDef::new(Subscription::StartsAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Subscription::EndsAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Subscription::CancelledAt).timestamp_with_time_zone().null())
                    .col(timestamp_with_time_zone(Subscription::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Subscription::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_store")
                            .from(Subscription::Table, Subscription::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_plan")
                            .from(Subscription::Table, Subscription::PlanId)
                            .to(Plan::Table, Plan::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Subscription::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Subscription { Table, Id, StoreId, PlanId, Status, StartsAt, EndsAt, CancelledAt, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Store { Table, Id }

#[derive(DeriveIden)]
enum Plan { Table, Id }
