//! Checkout and order lifecycle.
//!
//! Checkout runs in one transaction: stock is taken with a conditional
//! decrement (`stock >= qty`), so two buyers racing for the last unit cannot
//! both succeed. Status changes are likewise conditional on the status the
//! caller saw.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::invoice::{self, Billable};
use models::plan::PlanLimits;
use models::status::{OrderPaymentStatus, OrderStatus};
use models::{cart_item, order, order_item, product};

use crate::access::{authorize, Actor, Permission};
use crate::cart_service;
use crate::errors::ServiceError;
use crate::invoice_service;
use crate::store_service::find_open;
use crate::subscription_service::{effective_plan, orders_in_period};
use crate::{fetch_page, Page, Pagination};

const MAX_TEXT: usize = 1000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutInput {
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub invoice: Option<invoice::Model>,
}

fn label<T: std::fmt::Debug>(v: T) -> String {
    format!("{:?}", v).to_lowercase()
}

fn clean_text(field: &str, v: Option<String>) -> Result<Option<String>, ServiceError> {
    let v = v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    if v.as_ref().is_some_and(|s| s.chars().count() > MAX_TEXT) {
        return Err(ServiceError::Validation(format!("{field} too long (<={MAX_TEXT})")));
    }
    Ok(v)
}

async fn load_view<C: ConnectionTrait>(db: &C, order: order::Model) -> Result<OrderView, ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .order_by_asc(order_item::Column::ProductName)
        .all(db)
        .await?;
    let invoice = invoice_service::find_for(db, Billable::Order(order.id)).await?;
    Ok(OrderView { order, items, invoice })
}

/// Turn the caller's cart into an order with an unpaid invoice.
#[instrument(skip(db, input))]
pub async fn checkout(db: &DatabaseConnection, actor: Actor, store_id: Uuid, input: CheckoutInput) -> Result<OrderView, ServiceError> {
    let store = find_open(db, store_id).await?;
    let shipping_address = clean_text("shipping_address", input.shipping_address)?;
    let note = clean_text("note", input.note)?;
    let now = Utc::now();

    let txn = db.begin().await?;
    let cart = cart_service::find_cart(&txn, actor.user_id, store_id)
        .await?
        .ok_or_else(|| ServiceError::Validation("cart is empty".into()))?;
    let lines = cart_service::load_items(&txn, cart.id).await?;
    if lines.is_empty() {
        return Err(ServiceError::Validation("cart is empty".into()));
    }

    let plan = effective_plan(&txn, store_id).await?;
    let placed = orders_in_period(&txn, store_id, plan.period_start(now.into())).await?;
    if !PlanLimits::allows(plan.limits.max_orders, placed) {
        return Err(ServiceError::LimitExceeded("this store has reached its order limit for the period".into()));
    }

    let order_id = Uuid::new_v4();
    let mut subtotal: i64 = 0;
    let mut items = Vec::with_capacity(lines.len());
    for (item, p) in lines {
        if !p.is_active || p.store_id != store_id {
            return Err(ServiceError::Conflict(format!("'{}' is no longer available", p.name)));
        }
        let taken = product::Entity::update_many()
            .col_expr(product::Column::Stock, Expr::col(product::Column::Stock).sub(item.quantity))
            .col_expr(product::Column::UpdatedAt, Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(now)))
            .filter(product::Column::Id.eq(p.id))
            .filter(product::Column::Stock.gte(item.quantity))
            .exec(&txn)
            .await?;
        if taken.rows_affected != 1 {
            return Err(ServiceError::Conflict(format!("insufficient stock for '{}'", p.name)));
        }
        let line_total = cart_item::line_total(p.price, item.quantity)?;
        subtotal = cart_item::sum_totals([subtotal, line_total])?;
        items.push(order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(Some(p.id)),
            product_name: Set(p.name),
            unit_price: Set(p.price),
            quantity: Set(item.quantity),
            line_total: Set(line_total),
        });
    }

    let created = order::ActiveModel {
        id: Set(order_id),
        store_id: Set(store_id),
        user_id: Set(actor.user_id),
        number: Set(order::generate_number("ORD", now)),
        status: Set(OrderStatus::Pending),
        payment_status: Set(OrderPaymentStatus::Unpaid),
        subtotal: Set(subtotal),
        total: Set(subtotal),
        currency: Set(store.currency.clone()),
        shipping_address: Set(shipping_address),
        note: Set(note),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    for am in items {
        am.insert(&txn).await?;
    }
    invoice_service::issue(&txn, store_id, Billable::Order(created.id), created.total, &store.currency).await?;
    cart_service::empty(&txn, cart.id).await?;
    let view = load_view(&txn, created).await?;
    txn.commit().await?;

    info!(order_id = %view.order.id, number = %view.order.number, store_id = %store_id, total = view.order.total, "order_created");
    Ok(view)
}

/// Compare-and-set on the status the caller observed.
async fn transition<C: ConnectionTrait>(db: &C, current: &order::Model, next: OrderStatus) -> Result<(), ServiceError> {
    if !current.status.can_transition_to(next) {
        return Err(ServiceError::InvalidTransition(format!(
            "cannot move order from {} to {}",
            label(current.status),
            label(next)
        )));
    }
    let res = order::Entity::update_many()
        .col_expr(order::Column::Status, Expr::value(next))
        .col_expr(order::Column::UpdatedAt, Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())))
        .filter(order::Column::Id.eq(current.id))
        .filter(order::Column::Status.eq(current.status))
        .exec(db)
        .await?;
    if res.rows_affected != 1 {
        return Err(ServiceError::Conflict("order was modified concurrently".into()));
    }
    Ok(())
}

async fn reload<C: ConnectionTrait>(db: &C, order_id: Uuid) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("order"))
}

/// Cancel inside a transaction: restock lines, void the open invoice, cancel
/// pending payments, and mark a paid order refunded.
pub async fn cancel_in_txn<C: ConnectionTrait>(db: &C, current: &order::Model) -> Result<order::Model, ServiceError> {
    transition(db, current, OrderStatus::Cancelled).await?;
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(current.id))
        .all(db)
        .await?;
    for item in items {
        let Some(pid) = item.product_id else { continue };
        product::Entity::update_many()
            .col_expr(product::Column::Stock, Expr::col(product::Column::Stock).add(item.quantity))
            .filter(product::Column::Id.eq(pid))
            .exec(db)
            .await?;
    }
    invoice_service::void_open(db, Billable::Order(current.id)).await?;
    if current.payment_status == OrderPaymentStatus::Paid {
        order::Entity::update_many()
            .col_expr(order::Column::PaymentStatus, Expr::value(OrderPaymentStatus::Refunded))
            .filter(order::Column::Id.eq(current.id))
            .exec(db)
            .await?;
    }
    let cancelled = reload(db, current.id).await?;
    info!(order_id = %cancelled.id, payment_status = ?cancelled.payment_status, "order_cancelled");
    Ok(cancelled)
}

/// Record a successful payment. A pending order becomes confirmed; an order
/// cancelled in the meantime is flagged refunded for manual follow-up.
pub async fn mark_paid_in_txn<C: ConnectionTrait>(db: &C, order_id: Uuid) -> Result<order::Model, ServiceError> {
    let current = reload(db, order_id).await?;
    if current.status == OrderStatus::Cancelled {
        return refund_if_cancelled_in_txn(db, order_id).await;
    }
    let mut am: order::ActiveModel = current.clone().into();
    am.payment_status = Set(OrderPaymentStatus::Paid);
    if current.status == OrderStatus::Pending {
        am.status = Set(OrderStatus::Confirmed);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Money arrived for an order whose invoice is closed. A cancelled order is
/// flagged refunded; a paid one is left alone.
pub async fn refund_if_cancelled_in_txn<C: ConnectionTrait>(db: &C, order_id: Uuid) -> Result<order::Model, ServiceError> {
    let current = reload(db, order_id).await?;
    if current.status != OrderStatus::Cancelled || current.payment_status == OrderPaymentStatus::Refunded {
        return Ok(current);
    }
    warn!(order_id = %order_id, "payment received for cancelled order; marking refunded");
    let mut am: order::ActiveModel = current.into();
    am.payment_status = Set(OrderPaymentStatus::Refunded);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn list_mine(db: &DatabaseConnection, actor: Actor, opts: Pagination) -> Result<Page<order::Model>, ServiceError> {
    let q = order::Entity::find()
        .filter(order::Column::UserId.eq(actor.user_id))
        .order_by_desc(order::Column::CreatedAt);
    fetch_page(db, q, opts).await
}

async fn find_mine(db: &DatabaseConnection, actor: Actor, order_id: Uuid) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .one(db)
        .await?
        .filter(|o| o.user_id == actor.user_id)
        .ok_or_else(|| ServiceError::not_found("order"))
}

pub async fn get_mine(db: &DatabaseConnection, actor: Actor, order_id: Uuid) -> Result<OrderView, ServiceError> {
    let found = find_mine(db, actor, order_id).await?;
    load_view(db, found).await
}

/// Customers may cancel only before the store confirms.
#[instrument(skip(db))]
pub async fn cancel_mine(db: &DatabaseConnection, actor: Actor, order_id: Uuid) -> Result<OrderView, ServiceError> {
    let found = find_mine(db, actor, order_id).await?;
    if found.status != OrderStatus::Pending {
        return Err(ServiceError::InvalidTransition(format!("order is {}; only pending orders can be cancelled", label(found.status))));
    }
    let txn = db.begin().await?;
    let cancelled = cancel_in_txn(&txn, &found).await?;
    let view = load_view(&txn, cancelled).await?;
    txn.commit().await?;
    Ok(view)
}

pub async fn list_for_store(
    db: &DatabaseConnection,
    actor: Actor,
    store_id: Uuid,
    status: Option<OrderStatus>,
    opts: Pagination,
) -> Result<Page<order::Model>, ServiceError> {
    authorize(db, store_id, actor, Permission::ViewOrders).await?;
    let mut q = order::Entity::find().filter(order::Column::StoreId.eq(store_id));
    if let Some(s) = status {
        q = q.filter(order::Column::Status.eq(s));
    }
    fetch_page(db, q.order_by_desc(order::Column::CreatedAt), opts).await
}

async fn find_in_store(db: &DatabaseConnection, store_id: Uuid, order_id: Uuid) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .one(db)
        .await?
        .filter(|o| o.store_id == store_id)
        .ok_or_else(|| ServiceError::not_found("order"))
}

pub async fn get_for_store(db: &DatabaseConnection, actor: Actor, store_id: Uuid, order_id: Uuid) -> Result<OrderView, ServiceError> {
    authorize(db, store_id, actor, Permission::ViewOrders).await?;
    let found = find_in_store(db, store_id, order_id).await?;
    load_view(db, found).await
}

/// Advance fulfilment, or cancel with the stronger permission.
#[instrument(skip(db))]
pub async fn set_status(db: &DatabaseConnection, actor: Actor, store_id: Uuid, order_id: Uuid, next: OrderStatus) -> Result<OrderView, ServiceError> {
    let perm = if next == OrderStatus::Cancelled { Permission::CancelOrders } else { Permission::FulfillOrders };
    authorize(db, store_id, actor, perm).await?;
    let found = find_in_store(db, store_id, order_id).await?;

    if next == OrderStatus::Cancelled {
        let txn = db.begin().await?;
        let cancelled = cancel_in_txn(&txn, &found).await?;
        let view = load_view(&txn, cancelled).await?;
        txn.commit().await?;
        return Ok(view);
    }
    transition(db, &found, next).await?;
    let updated = reload(db, order_id).await?;
    info!(order_id = %order_id, from = %label(found.status), to = %label(next), "order_status_changed");
    load_view(db, updated).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart_service::{self, AddItem};
    use crate::product_service::{self, sample};
    use crate::store_service::{self, CreateStore};
    use crate::plan_service::{self, PlanInput};
    use crate::subscription_service;
    use crate::test_support::{actor, get_db, platform_admin, seed_user};
    use models::status::{InvoiceStatus, StoreRole};

    struct Fixture {
        owner: Actor,
        buyer: Actor,
        store_id: Uuid,
        product_id: Uuid,
    }

    async fn fixture(db: &DatabaseConnection, stock: i32) -> Result<Fixture, anyhow::Error> {
        let owner = actor(seed_user(db, "owner@shop.test").await);
        let buyer = actor(seed_user(db, "buyer@shop.test").await);
        let store = store_service::create(db, owner, CreateStore::named("Orders shop")).await?.store;
        let p = product_service::create(db, owner, store.id, sample("Wax", 2_000, stock)).await?;
        Ok(Fixture { owner, buyer, store_id: store.id, product_id: p.id })
    }

    async fn stock_of(db: &DatabaseConnection, id: Uuid) -> i32 {
        product::Entity::find_by_id(id).one(db).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn checkout_creates_order_invoice_and_takes_stock() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let f = fixture(&db, 5).await?;
        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 2 }).await?;

        let input = CheckoutInput { shipping_address: Some(" Quartier Louis, Libreville ".into()), note: None };
        let v = checkout(&db, f.buyer, f.store_id, input).await?;
        assert!(v.order.number.starts_with("ORD-"));
        assert_eq!(v.order.total, 4_000);
        assert_eq!(v.order.status, OrderStatus::Pending);
        assert_eq!(v.order.shipping_address.as_deref(), Some("Quartier Louis, Libreville"));
        assert_eq!(v.items.len(), 1);
        assert_eq!(v.items[0].product_name, "Wax");
        let inv = v.invoice.unwrap();
        assert_eq!(inv.amount, 4_000);
        assert_eq!(inv.status, InvoiceStatus::Unpaid);

        assert_eq!(stock_of(&db, f.product_id).await, 3);
        assert!(cart_service::view(&db, f.buyer, f.store_id).await?.items.is_empty());

        let again = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await;
        assert!(matches!(again, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn checkout_rolls_back_when_stock_ran_out() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let f = fixture(&db, 3).await?;
        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 3 }).await?;
        // Stock drops after the item went into the cart.
        let patch = product_service::ProductUpdate { stock: Some(1), ..Default::default() };
        product_service::update(&db, f.owner, f.store_id, f.product_id, patch).await?;

        let res = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await;
        assert!(matches!(res, Err(ServiceError::Conflict(_))));
        assert_eq!(stock_of(&db, f.product_id).await, 1);
        assert_eq!(cart_service::view(&db, f.buyer, f.store_id).await?.items.len(), 1);
        assert_eq!(list_mine(&db, f.buyer, Pagination::default()).await?.total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn fulfilment_follows_the_state_machine() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let f = fixture(&db, 5).await?;
        let staff = seed_user(&db, "staff@shop.test").await;
        models::store_member::create(&db, f.store_id, staff, StoreRole::Staff).await?;
        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 1 }).await?;
        let id = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await?.order.id;

        let skip = set_status(&db, actor(staff), f.store_id, id, OrderStatus::Shipped).await;
        assert!(matches!(skip, Err(ServiceError::InvalidTransition(_))));
        for next in [OrderStatus::Confirmed, OrderStatus::Processing, OrderStatus::Shipped] {
            assert_eq!(set_status(&db, actor(staff), f.store_id, id, next).await?.order.status, next);
        }
        let late = set_status(&db, f.owner, f.store_id, id, OrderStatus::Cancelled).await;
        assert!(matches!(late, Err(ServiceError::InvalidTransition(_))));
        set_status(&db, actor(staff), f.store_id, id, OrderStatus::Delivered).await?;

        let page = list_for_store(&db, f.owner, f.store_id, Some(OrderStatus::Delivered), Pagination::default()).await?;
        assert_eq!(page.total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn plan_order_limit_blocks_checkout() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let f = fixture(&db, 5).await?;
        let plan = plan_service::create(&db, platform_admin(), PlanInput { max_orders: Some(1), ..plan_service::input("solo", 0, None) }).await?;
        subscription_service::subscribe(&db, f.owner, f.store_id, plan.id).await?;

        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 1 }).await?;
        let first = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await?.order.id;
        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 1 }).await?;
        let over = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await;
        assert!(matches!(over, Err(ServiceError::LimitExceeded(_))));
        assert_eq!(stock_of(&db, f.product_id).await, 4);

        // Cancelled orders free their slot.
        cancel_mine(&db, f.buyer, first).await?;
        checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_restocks_and_voids() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let f = fixture(&db, 5).await?;
        let staff = seed_user(&db, "staff@shop.test").await;
        models::store_member::create(&db, f.store_id, staff, StoreRole::Staff).await?;
        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 2 }).await?;
        let a = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await?.order.id;

        let denied = set_status(&db, actor(staff), f.store_id, a, OrderStatus::Cancelled).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let v = cancel_mine(&db, f.buyer, a).await?;
        assert_eq!(v.order.status, OrderStatus::Cancelled);
        assert_eq!(v.invoice.unwrap().status, InvoiceStatus::Void);
        assert_eq!(stock_of(&db, f.product_id).await, 5);

        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 1 }).await?;
        let b = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await?.order.id;
        set_status(&db, f.owner, f.store_id, b, OrderStatus::Confirmed).await?;
        assert!(matches!(cancel_mine(&db, f.buyer, b).await, Err(ServiceError::InvalidTransition(_))));
        let other = actor(seed_user(&db, "other@shop.test").await);
        assert!(matches!(get_mine(&db, other, b).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn payment_confirms_or_flags_refund() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let f = fixture(&db, 5).await?;
        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 1 }).await?;
        let a = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await?.order.id;
        let paid = mark_paid_in_txn(&db, a).await?;
        assert_eq!(paid.status, OrderStatus::Confirmed);
        assert_eq!(paid.payment_status, OrderPaymentStatus::Paid);

        let cancelled = set_status(&db, f.owner, f.store_id, a, OrderStatus::Cancelled).await?;
        assert_eq!(cancelled.order.payment_status, OrderPaymentStatus::Refunded);

        cart_service::add_item(&db, f.buyer, f.store_id, AddItem { product_id: f.product_id, quantity: 1 }).await?;
        let b = checkout(&db, f.buyer, f.store_id, CheckoutInput::default()).await?.order.id;
        cancel_mine(&db, f.buyer, b).await?;
        let late = mark_paid_in_txn(&db, b).await?;
        assert_eq!(late.status, OrderStatus::Cancelled);
        assert_eq!(late.payment_status, OrderPaymentStatus::Refunded);
        Ok(())
    }
}
