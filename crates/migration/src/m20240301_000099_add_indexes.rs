use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: &[(&str, &str, &str)] = &[
    ("idx_store_member_user", "store_member", "user_id"),
    ("idx_product_store", "product", "store_id"),
    ("idx_product_category", "product", "category_id"),
    ("idx_orders_store", "orders", "store_id"),
    ("idx_orders_user", "orders", "user_id"),
    ("idx_orders_created_at", "orders", "created_at"),
    ("idx_order_item_order", "order_item", "order_id"),
    ("idx_invoice_store", "invoice", "store_id"),
    ("idx_invoice_order", "invoice", "order_id"),
    ("idx_payment_invoice", "payment", "invoice_id"),
    ("idx_payment_bill", "payment", "provider_bill_id"),
    ("idx_subscription_store", "subscription", "store_id"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, col) in INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(*name)
                        .table(Alias::new(*table))
                        .col(Alias::new(*col))
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _) in INDEXES {
            manager
                .drop_index(Index::drop().name(*name).table(Alias::new(*table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
