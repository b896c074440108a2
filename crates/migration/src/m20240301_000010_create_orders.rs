//! Create `orders` and `order_item` tables.
//!
//! Order items snapshot product name and price; the product link is nulled when
//! the product is deleted so order history survives catalog changes.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(uuid(Orders::Id).primary_key())
                    .col(uuid(Orders::StoreId).not_null())
                    .col(uuid(Orders::UserId).not_null())
                    .col(string_len(Orders::Number, 32).unique_key().not_null())
                    .col(string_len(Orders::Status, 16).not_null())
                    .col(string_len(Orders::PaymentStatus, 16).not_null())
                    .col(big_integer(Orders::Subtotal).not_null())
                    .col(big_integer(Orders::Total).not_null())
                    .col(string_len(Orders::Currency, 3).not_null())
                    .col(ColumnDef::new(Orders::ShippingAddress).text().null())
                    .col(ColumnDef::new(Orders::Note).text().null())
                    .col(timestamp_with_time_zone(Orders::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Orders::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_store")
                            .from(Orders::Table, Orders::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_user")
                            .from(Orders::Table, Orders::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItem::Table)
                    .if_not_exists()
                    .col(uuid(OrderItem::Id).primary_key())
                    .col(uuid(OrderItem::OrderId).not_null())
                    .col(ColumnDef::new(OrderItem::ProductId).uuid().null())
                    .col(string_len(OrderItem::ProductName, 255).not_null())
                    .col(big_integer(OrderItem::UnitPrice).not_null())
                    .col(integer(OrderItem::Quantity).not_null())
                    .col(big_integer(OrderItem::LineTotal).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_item_order")
                            .from(OrderItem::Table, OrderItem::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_item_product")
                            .from(OrderItem::Table, OrderItem::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(OrderItem::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    StoreId,
    UserId,
    Number,
    Status,
    PaymentStatus,
    Subtotal,
    Total,
    Currency,
    ShippingAddress,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItem { Table, Id, OrderId, ProductId, ProductName, UnitPrice, Quantity, LineTotal }

#[derive(DeriveIden)]
enum Store { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Product { Table, Id }
