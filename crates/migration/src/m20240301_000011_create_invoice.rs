//! Create `invoice` table. An invoice bills either an order or a subscription.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoice::Table)
                    .if_not_exists()
                    .col(uuid(Invoice::Id).primary_key())
                    .col(uuid(Invoice::StoreId).not_null())
                    .col(ColumnDef::new(Invoice::OrderId).uuid().null())
                    .col(ColumnDef::new(Invoice::SubscriptionId).uuid().null())
                    .col(string_len(Invoice::Number, 32).unique_key().not_null())
                    .col(big_integer(Invoice::Amount).not_null())
                    .col(string_len(Invoice::Currency, 3).not_null())
                    .col(string_len(Invoice::Status, 16).not_null())
                    .col(timestamp_with_time_zone(Invoice::IssuedAt).not_null())
                    .col(ColumnDef::new(Invoice::PaidAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoice_store")
                            .from(Invoice::Table, Invoice::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoice_order")
                            .from(Invoice::Table, Invoice::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoice_subscription")
                            .from(Invoice::Table, Invoice::SubscriptionId)
                            .to(Subscription::Table, Subscription::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Invoice::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Invoice { Table, Id, StoreId, OrderId, SubscriptionId, Number, Amount, Currency, Status, IssuedAt, PaidAt }

#[derive(DeriveIden)]
enum Store { Table, Id }

#[derive(DeriveIden)]
enum Orders { Table, Id }

#[derive(DeriveIden)]
enum Subscription { Table, Id }
