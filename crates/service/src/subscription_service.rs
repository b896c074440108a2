//! Store subscriptions and the plan limits they unlock.
//!
//! A store runs on [`PlanLimits::FREE`] unless it has a current active
//! subscription. Paid plans start `pending` and are activated by the payment
//! callback; free plans activate immediately.

use chrono::{Datelike, Duration, TimeZone, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::invoice::Billable;
use models::plan::{self, PlanLimits};
use sea_orm::prelude::DateTimeWithTimeZone;
use models::status::{OrderStatus, SubscriptionStatus};
use models::{invoice, order, subscription};

use crate::access::{authorize, Actor, Permission};
use crate::errors::ServiceError;
use crate::invoice_service;

/// Limits a store currently operates under.
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePlan {
    pub subscription: Option<subscription::Model>,
    pub plan: Option<plan::Model>,
    pub limits: PlanLimits,
}

impl EffectivePlan {
    fn free() -> Self { Self {
        subscription: None, plan: None, limits: PlanLimits::FREE }
    }

    /// Start of the window `max_orders` is counted over: the subscription's
    /// start, or the first day of the calendar month for free stores.
    pub fn period_start(&self, now: DateTimeWithTimeZone) -> DateTimeWithTimeZone {
        if let Some(start) = self.subscription.as_ref().and_then(|s| s.starts_at) {
            return start;
        }
        Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .map(Into::into)
            .unwrap_or(now)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentSubscription {
    #[serde(flatten)]
    pub effective: EffectivePlan,
    /// Paid subscription awaiting its payment, if any.
    pub pending: Option<subscription::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeOutcome {
    pub subscription: subscription::Model,
    /// Present for paid plans; pay it to activate the subscription.
    pub invoice: Option<invoice::Model>,
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

/// Resolve the store's current plan. Active subscriptions past their end are
/// stored as `expired` on the way.
pub async fn effective_plan<C: ConnectionTrait>(db: &C, store_id: Uuid) -> Result<EffectivePlan, ServiceError> {
    let active = subscription::Entity::find()
        .filter(subscription::Column::StoreId.eq(store_id))
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Active))
        .order_by_desc(subscription::Column::StartsAt)
        .one(db)
        .await?;
    let Some(sub) = active else {
        return Ok(EffectivePlan::free());
    };
    if !sub.is_current(now()) {
        let mut am: subscription::ActiveModel = sub.into();
        am.status = Set(SubscriptionStatus::Expired);
        am.updated_at = Set(now());
        let expired = am.update(db).await?;
        info!(subscription_id = %expired.id, store_id = %store_id, "subscription_expired");
        return Ok(EffectivePlan::free());
    }
    let plan = plan::Entity::find_by_id(sub.plan_id).one(db).await?;
    let limits = plan.as_ref().map(plan::Model::limits).unwrap_or(PlanLimits::FREE);
    Ok(EffectivePlan { subscription: Some(sub), plan, limits })
}

/// Orders counted against `max_orders` in the current period. Cancelled orders do not count.
pub async fn orders_in_period<C: ConnectionTrait>(db: &C, store_id: Uuid, since: DateTimeWithTimeZone) -> Result<u64, ServiceError> {
    Ok(order::Entity::find()
        .filter(order::Column::StoreId.eq(store_id))
        .filter(order::Column::CreatedAt.gte(since))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .count(db)
        .await?)
}

async fn find_pending<C: ConnectionTrait>(db: &C, store_id: Uuid) -> Result<Vec<subscription::Model>, ServiceError> {
    Ok(subscription::Entity::find()
        .filter(subscription::Column::StoreId.eq(store_id))
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Pending))
        .all(db)
        .await?)
}

pub async fn current(db: &DatabaseConnection, actor: Actor, store_id: Uuid) -> Result<CurrentSubscription, ServiceError> {
    authorize(db, store_id, actor, Permission::ViewBilling).await?;
    let effective = effective_plan(db, store_id).await?;
    let pending = find_pending(db, store_id).await?.into_iter().max_by_key(|s| s.created_at);
    Ok(CurrentSubscription { effective, pending })
}

/// Move a store onto `plan_id`. Any earlier pending subscription is discarded.
#[instrument(skip(db))]
pub async fn subscribe(db: &DatabaseConnection, actor: Actor, store_id: Uuid, plan_id: Uuid) -> Result<SubscribeOutcome, ServiceError> {
    authorize(db, store_id, actor, Permission::ManageBilling).await?;
    let plan = plan::Entity::find_by_id(plan_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("plan"))?;
    if !plan.is_active {
        return Err(ServiceError::Validation("plan is not available".into()));
    }

    let txn = db.begin().await?;
    for stale in find_pending(&txn, store_id).await? {
        let id = stale.id;
        let mut am: subscription::ActiveModel = stale.into();
        am.status = Set(SubscriptionStatus::Cancelled);
        am.cancelled_at = Set(Some(now()));
        am.updated_at = Set(now());
        am.update(&txn).await?;
        invoice_service::void_open(&txn, Billable::Subscription(id)).await?;
    }

    let sub = subscription::new_pending(store_id, plan.id).insert(&txn).await?;
    if plan.is_free() {
        let active = activate_in_txn(&txn, sub.id).await?;
        txn.commit().await?;
        return Ok(SubscribeOutcome { subscription: active, invoice: None });
    }
    let inv = invoice_service::issue(&txn, store_id, Billable::Subscription(sub.id), plan.price, &plan.currency).await?;
    txn.commit().await?;
    info!(subscription_id = %sub.id, store_id = %store_id, plan_id = %plan.id, invoice_id = %inv.id, "subscription_pending");
    Ok(SubscribeOutcome { subscription: sub, invoice: Some(inv) })
}

/// Start a pending subscription now; the store's previous active one expires.
pub async fn activate_in_txn<C: ConnectionTrait>(db: &C, subscription_id: Uuid) -> Result<subscription::Model, ServiceError> {
    let sub = subscription::Entity::find_by_id(subscription_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("subscription"))?;
    if sub.status != SubscriptionStatus::Pending {
        return Err(ServiceError::InvalidTransition(format!("subscription is {:?}", sub.status).to_lowercase()));
    }
    let plan = plan::Entity::find_by_id(sub.plan_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("plan"))?;

    let at = now();
    subscription::Entity::update_many()
        .col_expr(subscription::Column::Status, Expr::value(SubscriptionStatus::Expired))
        .col_expr(subscription::Column::UpdatedAt, Expr::value(at))
        .filter(subscription::Column::StoreId.eq(sub.store_id))
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Active))
        .filter(subscription::Column::Id.ne(sub.id))
        .exec(db)
        .await?;

    let store_id = sub.store_id;
    let mut am: subscription::ActiveModel = sub.into();
    am.status = Set(SubscriptionStatus::Active);
    am.starts_at = Set(Some(at));
    am.ends_at = Set(Some(at + Duration::days(i64::from(plan.interval_days))));
    am.updated_at = Set(at);
    let active = am.update(db).await?;
    info!(subscription_id = %active.id, store_id = %store_id, plan_id = %plan.id, "subscription_activated");
    Ok(active)
}

#[instrument(skip(db))]
pub async fn cancel(db: &DatabaseConnection, actor: Actor, store_id: Uuid) -> Result<subscription::Model, ServiceError> {
    authorize(db, store_id, actor, Permission::ManageBilling).await?;
    let sub = effective_plan(db, store_id)
        .await?
        .subscription
        .ok_or_else(|| ServiceError::not_found("active subscription"))?;
    let mut am: subscription::ActiveModel = sub.into();
    am.status = Set(SubscriptionStatus::Cancelled);
    am.cancelled_at = Set(Some(now()));
    am.updated_at = Set(now());
    let cancelled = am.update(db).await?;
    info!(subscription_id = %cancelled.id, store_id = %store_id, "subscription_cancelled");
    Ok(cancelled)
}
