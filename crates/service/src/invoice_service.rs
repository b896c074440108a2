use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;
use uuid::Uuid;

use models::invoice::{self, Billable};
use models::status::{InvoiceStatus, PaymentStatus};
use models::{order, payment};

use crate::access::{authorize, Actor, Permission};
use crate::errors::ServiceError;
use crate::{fetch_page, Page, Pagination};

pub async fn issue<C: ConnectionTrait>(db: &C, store_id: Uuid, billable: Billable, amount: i64, currency: &str) -> Result<invoice::Model, ServiceError> {
    let created = invoice::new_unpaid(store_id, billable, amount, currency).insert(db).await?;
    info!(invoice_id = %created.id, number = %created.number, amount, "invoice_issued");
    Ok(created)
}

fn billable_filter(billable: Billable) -> sea_orm::sea_query::SimpleExpr {
    match billable {
        Billable::Order(id) => invoice::Column::OrderId.eq(id),
        Billable::Subscription(id) => invoice::Column::SubscriptionId.eq(id),
    }
}

/// The most recent invoice for an order or subscription.
pub async fn find_for<C: ConnectionTrait>(db: &C, billable: Billable) -> Result<Option<invoice::Model>, ServiceError> {
    Ok(invoice::Entity::find()
        .filter(billable_filter(billable))
        .order_by_desc(invoice::Column::IssuedAt)
        .one(db)
        .await?)
}

/// Void unpaid invoices of `billable` and cancel pending payments against them.
pub async fn void_open<C: ConnectionTrait>(db: &C, billable: Billable) -> Result<(), ServiceError> {
    let open = invoice::Entity::find()
        .filter(billable_filter(billable))
        .filter(invoice::Column::Status.eq(InvoiceStatus::Unpaid))
        .all(db)
        .await?;
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    for inv in open {
        let id = inv.id;
        let mut am: invoice::ActiveModel = inv.into();
        am.status = Set(InvoiceStatus::Void);
        am.update(db).await?;
        let cancelled = payment::Entity::update_many()
            .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Cancelled))
            .col_expr(payment::Column::UpdatedAt, Expr::value(now))
            .filter(payment::Column::InvoiceId.eq(id))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending))
            .exec(db)
            .await?;
        info!(invoice_id = %id, payments_cancelled = cancelled.rows_affected, "invoice_voided");
    }
    Ok(())
}

/// Settle an unpaid invoice. Returns `false` when it was already paid or void;
/// void is final, so such an invoice is left as it is.
pub async fn mark_paid<C: ConnectionTrait>(db: &C, invoice_id: Uuid) -> Result<bool, ServiceError> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let settled = invoice::Entity::update_many()
        .col_expr(invoice::Column::Status, Expr::value(InvoiceStatus::Paid))
        .col_expr(invoice::Column::PaidAt, Expr::value(Some(now)))
        .filter(invoice::Column::Id.eq(invoice_id))
        .filter(invoice::Column::Status.eq(InvoiceStatus::Unpaid))
        .exec(db)
        .await?;
    if settled.rows_affected == 1 {
        info!(invoice_id = %invoice_id, "invoice_paid");
    }
    Ok(settled.rows_affected == 1)
}

pub async fn list_for_store(
    db: &DatabaseConnection,
    actor: Actor,
    store_id: Uuid,
    status: Option<InvoiceStatus>,
    opts: Pagination,
) -> Result<Page<invoice::Model>, ServiceError> {
    authorize(db, store_id, actor, Permission::ViewBilling).await?;
    let mut q = invoice::Entity::find().filter(invoice::Column::StoreId.eq(store_id));
    if let Some(s) = status {
        q = q.filter(invoice::Column::Status.eq(s));
    }
    fetch_page(db, q.order_by_desc(invoice::Column::IssuedAt), opts).await
}

/// Visible to the store's billing roles and to the customer of the billed order.
pub async fn get(db: &DatabaseConnection, actor: Actor, invoice_id: Uuid) -> Result<invoice::Model, ServiceError> {
    let inv = invoice::Entity::find_by_id(invoice_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("invoice"))?;
    if let Some(order_id) = inv.order_id {
        let customer = order::Entity::find_by_id(order_id).one(db).await?.map(|o| o.user_id);
        if customer == Some(actor.user_id) {
            return Ok(inv);
        }
    }
    authorize(db, inv.store_id, actor, Permission::ViewBilling).await?;
    Ok(inv)
}
