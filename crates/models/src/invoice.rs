use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::status::InvoiceStatus;
use crate::{order, store, subscription};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub order_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub number: String,
    pub amount: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub issued_at: DateTimeWithTimeZone,
    pub paid_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Store, Order, Subscription }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
            Relation::Order => Entity::belongs_to(order::Entity).from(Column::OrderId).to(order::Column::Id).into(),
            Relation::Subscription => Entity::belongs_to(subscription::Entity)
                .from(Column::SubscriptionId)
                .to(subscription::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// What an invoice bills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Billable {
    Order(Uuid),
    Subscription(Uuid),
}

pub fn new_unpaid(store_id: Uuid, billable: Billable, amount: i64, currency: &str) -> ActiveModel {
    let now = Utc::now();
    let (order_id, subscription_id) = match billable {
        Billable::Order(id) => (Some(id), None),
        Billable::Subscription(id) => (None, Some(id)),
    };
    ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        order_id: Set(order_id),
        subscription_id: Set(subscription_id),
        number: Set(crate::order::generate_number("INV", now)),
        amount: Set(amount),
        currency: Set(currency.to_string()),
        status: Set(InvoiceStatus::Unpaid),
        issued_at: Set(now.into()),
        paid_at: Set(None),
    }
}
