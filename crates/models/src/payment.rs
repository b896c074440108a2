use sea_orm::entity::prelude::*;
use uuid::Uuid;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::status::PaymentStatus;
use crate::{invoice, store, user};

pub const PROVIDER_EBILLING: &str = "ebilling";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub invoice_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub amount: i64,
    pub currency: String,
    pub provider: String,
    pub provider_bill_id: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub payment_system: Option<String>,
    pub payer_msisdn: String,
    pub payer_email: String,
    pub status: PaymentStatus,
    /// Money was collected that no open invoice could absorb.
    pub refund_due: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub paid_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Store, Invoice, User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
            Relation::Invoice => Entity::belongs_to(invoice::Entity).from(Column::InvoiceId).to(invoice::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A pending bill whose expiry period has elapsed at `now`.
    pub fn is_expired_at(&self, now: DateTimeWithTimeZone, expiry_minutes: i64) -> bool {
        self.status == PaymentStatus::Pending && self.created_at + Duration::minutes(expiry_minutes) <= now
    }
}

/// Mobile-money networks EBILLING can push a USSD prompt to.
pub const PAYMENT_SYSTEMS: [&str; 2] = ["airtelmoney", "moovmoney"];

pub fn validate_payment_system(s: &str) -> Result<(), errors::ModelError> {
    if !PAYMENT_SYSTEMS.contains(&s) {
        return Err(errors::ModelError::Validation(format!("payment_system must be one of {}", PAYMENT_SYSTEMS.join(", "))));
    }
    Ok(())
}

/// Phone numbers: optional leading `+`, then 8..=15 digits.
pub fn validate_msisdn(msisdn: &str) -> Result<(), errors::ModelError> {
    let digits = msisdn.strip_prefix('+').unwrap_or(msisdn);
    if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(errors::ModelError::Validation("payer_msisdn must be 8-15 digits".into()));
    }
    Ok(())
}
