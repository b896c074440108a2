//! Payment records and their lifecycle around the gateway.
//!
//! A payment is always recorded `pending` before the bill is requested, so a
//! callback can never refer to a payment we do not know. The gateway's paid
//! notification is authoritative: it settles the payment even if we had
//! already given up on it locally.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use models::invoice::{self, Billable};
use models::status::{InvoiceStatus, OrderPaymentStatus, OrderStatus, PaymentStatus, SubscriptionStatus};
use models::{order, payment, plan, subscription, user};

use crate::access::{authorize, Actor, Permission};
use crate::errors::ServiceError;
use crate::{invoice_service, order_service, subscription_service};

use super::gateway::{BillRequest, PaymentGateway};

#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePayment {
    pub payer_msisdn: String,
    /// Defaults to the account email.
    #[serde(default)]
    pub payer_email: Option<String>,
    /// `airtelmoney` or `moovmoney` to push a USSD prompt; omit for portal only.
    #[serde(default)]
    pub payment_system: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiated {
    pub payment: payment::Model,
    pub portal_url: String,
    /// An earlier pending bill was still valid and is returned instead of a new one.
    pub reused: bool,
}

/// EBILLING's form-encoded notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackInput {
    pub reference: String,
    pub billingid: String,
    pub amount: String,
    #[serde(default)]
    pub transactionid: Option<String>,
    #[serde(default)]
    pub paymentsystem: Option<String>,
}

/// Everything needed to bill one invoice.
struct Target {
    store_id: Uuid,
    invoice: invoice::Model,
    order_id: Option<Uuid>,
    subscription_id: Option<Uuid>,
    description: String,
}

/// Gateway amounts arrive as text, sometimes with a zero fraction ("1500.00").
fn parse_amount(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if !frac.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse().ok()
}

#[derive(Clone)]
pub struct PaymentService {
    db: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    expiry_minutes: i64,
}

impl PaymentService {
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn PaymentGateway>, expiry_minutes: i64) -> Self {
        Self { db, gateway, expiry_minutes }
    }

    fn now() -> sea_orm::prelude::DateTimeWithTimeZone {
        Utc::now().into()
    }

    async fn set_status(&self, p: payment::Model, status: PaymentStatus) -> Result<payment::Model, ServiceError> {
        let id = p.id;
        let mut am: payment::ActiveModel = p.into();
        am.status = Set(status);
        am.updated_at = Set(Self::now());
        let updated = am.update(&self.db).await?;
        info!(payment_id = %id, status = ?status, "payment_status_changed");
        Ok(updated)
    }

    /// Store a lapsed pending payment as expired.
    async fn expire_if_lapsed(&self, p: payment::Model) -> Result<payment::Model, ServiceError> {
        if p.is_expired_at(Self::now(), self.expiry_minutes) {
            return self.set_status(p, PaymentStatus::Expired).await;
        }
        Ok(p)
    }

    /// Pay for one of the caller's own orders.
    #[instrument(skip(self, input))]
    pub async fn initiate_for_order(&self, actor: Actor, order_id: Uuid, input: InitiatePayment) -> Result<PaymentInitiated, ServiceError> {
        let o = order::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .filter(|o| o.user_id == actor.user_id)
            .ok_or_else(|| ServiceError::not_found("order"))?;
        if o.status != OrderStatus::Pending || o.payment_status != OrderPaymentStatus::Unpaid {
            return Err(ServiceError::InvalidTransition("order is not awaiting payment".into()));
        }
        let inv = invoice_service::find_for(&self.db, Billable::Order(o.id))
            .await?
            .filter(|i| i.status == InvoiceStatus::Unpaid)
            .ok_or_else(|| ServiceError::Conflict("order has no open invoice".into()))?;
        let target = Target {
            store_id: o.store_id,
            invoice: inv,
            order_id: Some(o.id),
            subscription_id: None,
            description: format!("Order {}", o.number),
        };
        self.start(actor, target, input).await
    }

    /// Pay for the store's pending subscription.
    #[instrument(skip(self, input))]
    pub async fn initiate_for_subscription(&self, actor: Actor, store_id: Uuid, input: InitiatePayment) -> Result<PaymentInitiated, ServiceError> {
        authorize(&self.db, store_id, actor, Permission::ManageBilling).await?;
        let sub = subscription::Entity::find()
            .filter(subscription::Column::StoreId.eq(store_id))
            .filter(subscription::Column::Status.eq(SubscriptionStatus::Pending))
            .order_by_desc(subscription::Column::CreatedAt)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("pending subscription"))?;
        let inv = invoice_service::find_for(&self.db, Billable::Subscription(sub.id))
            .await?
            .filter(|i| i.status == InvoiceStatus::Unpaid)
            .ok_or_else(|| ServiceError::Conflict("subscription has no open invoice".into()))?;
        let plan_name = plan::Entity::find_by_id(sub.plan_id)
            .one(&self.db)
            .await?
            .map(|p| p.name)
            .unwrap_or_else(|| "plan".into());
        let target = Target {
            store_id,
            invoice: inv,
            order_id: None,
            subscription_id: Some(sub.id),
            description: format!("Subscription {}", plan_name),
        };
        self.start(actor, target, input).await
    }

    async fn start(&self, actor: Actor, target: Target, input: InitiatePayment) -> Result<PaymentInitiated, ServiceError> {
        let payer = user::Entity::find_by_id(actor.user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        let msisdn = input.payer_msisdn.trim().to_string();
        payment::validate_msisdn(&msisdn)?;
        if let Some(system) = &input.payment_system {
            payment::validate_payment_system(system)?;
        }
        let email = input.payer_email.map(|e| user::normalize_email(&e)).unwrap_or_else(|| payer.email.clone());
        user::validate_email(&email)?;

        // Reuse a live bill; settle stale ones first.
        let open = payment::Entity::find()
            .filter(payment::Column::InvoiceId.eq(target.invoice.id))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending))
            .order_by_desc(payment::Column::CreatedAt)
            .all(&self.db)
            .await?;
        for p in open {
            let p = self.expire_if_lapsed(p).await?;
            if p.status != PaymentStatus::Pending {
                continue;
            }
            match p.provider_bill_id.clone() {
                Some(bill_id) if p.user_id == actor.user_id => {
                    self.push(&bill_id, input.payment_system.as_deref(), &msisdn).await;
                    let portal_url = self.gateway.portal_url(&bill_id)?;
                    return Ok(PaymentInitiated { payment: p, portal_url, reused: true });
                }
                Some(_) => {}
                None => {
                    self.set_status(p, PaymentStatus::Failed).await?;
                }
            }
        }

        let now = Self::now();
        let pending = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(target.store_id),
            invoice_id: Set(target.invoice.id),
            user_id: Set(actor.user_id),
            order_id: Set(target.order_id),
            subscription_id: Set(target.subscription_id),
            amount: Set(target.invoice.amount),
            currency: Set(target.invoice.currency.clone()),
            provider: Set(payment::PROVIDER_EBILLING.to_string()),
            provider_bill_id: Set(None),
            provider_transaction_id: Set(None),
            payment_system: Set(input.payment_system.clone()),
            payer_msisdn: Set(msisdn.clone()),
            payer_email: Set(email.clone()),
            status: Set(PaymentStatus::Pending),
            refund_due: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            paid_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        let req = BillRequest {
            payer_email: email,
            payer_msisdn: msisdn.clone(),
            payer_name: payer.name,
            amount: pending.amount,
            short_description: target.description,
            external_reference: pending.id.to_string(),
            expiry_period: self.expiry_minutes,
        };
        let bill = match self.gateway.create_bill(&req).await {
            Ok(b) => b,
            Err(e) => {
                error!(payment_id = %pending.id, error = %e, "ebilling_create_bill_failed");
                self.set_status(pending, PaymentStatus::Failed).await?;
                return Err(e.into());
            }
        };

        let mut am: payment::ActiveModel = pending.into();
        am.provider_bill_id = Set(Some(bill.bill_id.clone()));
        am.updated_at = Set(Self::now());
        let stored = am.update(&self.db).await?;
        info!(payment_id = %stored.id, bill_id = %bill.bill_id, invoice_id = %target.invoice.id, amount = stored.amount, "payment_initiated");

        self.push(&bill.bill_id, input.payment_system.as_deref(), &msisdn).await;
        let portal_url = self.gateway.portal_url(&bill.bill_id)?;
        Ok(PaymentInitiated { payment: stored, portal_url, reused: false })
    }

    /// The portal stays usable when a USSD prompt cannot be sent.
    async fn push(&self, bill_id: &str, system: Option<&str>, msisdn: &str) {
        let Some(system) = system else { return };
        if let Err(e) = self.gateway.push_ussd(bill_id, system, msisdn).await {
            warn!(bill_id = %bill_id, error = %e, "ebilling_ussd_push_failed");
        }
    }

    /// Apply EBILLING's paid notification. Repeated notifications are no-ops.
    ///
    /// The form carries nothing the payer could not copy, so the bill is
    /// looked up on the gateway and must be reported paid there.
    #[instrument(skip(self, input), fields(reference = %input.reference, bill_id = %input.billingid))]
    pub async fn handle_callback(&self, input: CallbackInput) -> Result<payment::Model, ServiceError> {
        let id = Uuid::parse_str(input.reference.trim()).map_err(|_| ServiceError::not_found("payment"))?;
        let p = payment::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment"))?;
        let Some(bill_id) = p.provider_bill_id.clone().filter(|b| b == input.billingid.trim()) else {
            warn!(payment_id = %id, "callback bill id mismatch");
            return Err(ServiceError::Validation("billing id does not match payment".into()));
        };
        if parse_amount(&input.amount) != Some(p.amount) {
            warn!(payment_id = %id, amount = %input.amount, expected = p.amount, "callback amount mismatch");
            return Err(ServiceError::Validation("amount does not match payment".into()));
        }
        if p.status == PaymentStatus::Paid {
            info!(payment_id = %id, "duplicate payment callback ignored");
            return Ok(p);
        }

        let bill = self.gateway.fetch_bill(&bill_id).await.map_err(|e| {
            error!(payment_id = %id, error = %e, "ebilling_fetch_bill_failed");
            ServiceError::from(e)
        })?;
        if bill.bill_id != bill_id || !bill.is_paid() {
            warn!(payment_id = %id, state = %bill.state, "callback for a bill the gateway does not report paid");
            return Err(ServiceError::Validation("bill is not paid".into()));
        }
        if p.status != PaymentStatus::Pending {
            warn!(payment_id = %id, status = ?p.status, "paid callback for a payment no longer pending");
        }

        let now = Self::now();
        let txn = self.db.begin().await?;
        let claimed = payment::Entity::update_many()
            .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Paid))
            .col_expr(payment::Column::ProviderTransactionId, Expr::value(input.transactionid.clone()))
            .col_expr(payment::Column::PaymentSystem, Expr::value(input.paymentsystem.clone().or(p.payment_system.clone())))
            .col_expr(payment::Column::PaidAt, Expr::value(Some(now)))
            .col_expr(payment::Column::UpdatedAt, Expr::value(now))
            .filter(payment::Column::Id.eq(id))
            .filter(payment::Column::Status.ne(PaymentStatus::Paid))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 1 {
            let mut refund_due = false;
            if invoice_service::mark_paid(&txn, p.invoice_id).await? {
                // The invoice is settled; sibling bills must not collect again.
                let siblings = payment::Entity::update_many()
                    .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Cancelled))
                    .col_expr(payment::Column::UpdatedAt, Expr::value(now))
                    .filter(payment::Column::InvoiceId.eq(p.invoice_id))
                    .filter(payment::Column::Id.ne(id))
                    .filter(payment::Column::Status.eq(PaymentStatus::Pending))
                    .exec(&txn)
                    .await?;
                if siblings.rows_affected > 0 {
                    info!(invoice_id = %p.invoice_id, cancelled = siblings.rows_affected, "sibling payments cancelled");
                }
                if let Some(order_id) = p.order_id {
                    order_service::mark_paid_in_txn(&txn, order_id).await?;
                }
                if let Some(sub_id) = p.subscription_id {
                    let sub = subscription::Entity::find_by_id(sub_id).one(&txn).await?;
                    match sub {
                        Some(s) if s.status == SubscriptionStatus::Pending => {
                            subscription_service::activate_in_txn(&txn, sub_id).await?;
                        }
                        _ => {
                            warn!(payment_id = %id, subscription_id = %sub_id, "paid subscription is no longer pending");
                            refund_due = true;
                        }
                    }
                }
            } else {
                // Void or already paid: the invoice stays as it is and the money goes back.
                warn!(payment_id = %id, invoice_id = %p.invoice_id, "payment collected against a closed invoice; refund due");
                refund_due = true;
                if let Some(order_id) = p.order_id {
                    order_service::refund_if_cancelled_in_txn(&txn, order_id).await?;
                }
            }
            if refund_due {
                payment::Entity::update_many()
                    .col_expr(payment::Column::RefundDue, Expr::value(true))
                    .filter(payment::Column::Id.eq(id))
                    .exec(&txn)
                    .await?;
            }
        }
        let settled = payment::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment"))?;
        txn.commit().await?;
        info!(payment_id = %id, invoice_id = %settled.invoice_id, amount = settled.amount, refund_due = settled.refund_due, "payment_paid");
        Ok(settled)
    }

    /// Visible to the payer and to the store's billing roles.
    pub async fn get(&self, actor: Actor, payment_id: Uuid) -> Result<payment::Model, ServiceError> {
        let p = payment::Entity::find_by_id(payment_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("payment"))?;
        if p.user_id != actor.user_id {
            authorize(&self.db, p.store_id, actor, Permission::ViewBilling).await?;
        }
        self.expire_if_lapsed(p).await
    }
}
