use sea_orm::entity::prelude::*;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{OrderPaymentStatus, OrderStatus};
use crate::{order_item, store, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub user_id: Uuid,
    pub number: String,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub subtotal: i64,
    pub total: i64,
    pub currency: String,
    pub shipping_address: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Store, User, Items }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
            Relation::Items => Entity::has_many(order_item::Entity).into(),
        }
    }
}

impl Related<order_item::Entity> for Entity {
    fn to() -> RelationDef { Relation::Items.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Human-facing reference: `<PREFIX>-YYYYMMDD-XXXXXXXX`, the suffix taken from a fresh UUID.
pub fn generate_number(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();
    format!("{prefix}-{}-{suffix}", at.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn number_has_date_and_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let n = generate_number("ORD", at);
        assert!(n.starts_with("ORD-20240309-"), "{n}");
        assert_eq!(n.len(), "ORD-20240309-".len() + 8);
        assert!(n[13..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
