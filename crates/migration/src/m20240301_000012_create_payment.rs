//! Create `payment` table recording EBILLING bills and their outcome.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(uuid(Payment::StoreId).not_null())
                    .col(uuid(Payment::InvoiceId).not_null())
                    .col(uuid(Payment::UserId).not_null())
                    .col(ColumnDef::new(Payment::OrderId).uuid().null())
                    .col(ColumnDef::new(Payment::SubscriptionId).uuid().null())
                    .col(big_integer(Payment::Amount).not_null())
                    .col(string_len(Payment::Currency, 3).not_null())
                    .col(string_len(Payment::Provider, 32).not_null())
                    .col(ColumnDef::new(Payment::ProviderBillId).string_len(64).null())
                    .col(ColumnDef::new(Payment::ProviderTransactionId).string_len(128).null())
                    .col(ColumnDef::new(Payment::PaymentSystem).string_len(32).null())
                    .col(string_len(Payment::PayerMsisdn, 20).not_null())
                    .col(string_len(Payment::PayerEmail, 255).not_null())
                    .col(string_len(Payment::Status, 16).not_null())
                    .col(boolean(Payment::RefundDue).not_null().default(false))
                    .col(timestamp_with_time_zone(Payment::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Payment::UpdatedAt).not_null())
                    .col(ColumnDef::new(Payment::PaidAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_store")
                            .from(Payment::Table, Payment::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_invoice")
                            .from(Payment::Table, Payment::InvoiceId)
                            .to(Invoice::Table, Invoice::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_user")
                            .from(Payment::Table, Payment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Payment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Payment {
    Table,
    Id,
    StoreId,
    InvoiceId,
    UserId,
    OrderId,
    SubscriptionId,
    Amount,
    Currency,
    Provider,
    ProviderBillId,
    ProviderTransactionId,
    PaymentSystem,
    PayerMsisdn,
    PayerEmail,
    Status,
    RefundDue,
    CreatedAt,
    UpdatedAt,
    PaidAt,
}

#[derive(DeriveIden)]
enum Store { Table, Id }

#[derive(DeriveIden)]
enum Invoice { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
