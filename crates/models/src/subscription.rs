use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::status::SubscriptionStatus;
use crate::{plan, store};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub starts_at: Option<DateTimeWithTimeZone>,
    pub ends_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Store, Plan }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
            Relation::Plan => Entity::belongs_to(plan::Entity).from(Column::PlanId).to(plan::Column::Id).into(),
        }
    }
}

impl Related<plan::Entity> for Entity {
    fn to() -> RelationDef { Relation::Plan.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Active and still inside its billing window at `now`.
    pub fn is_current(&self, now: DateTimeWithTimeZone) -> bool {
        self.status == SubscriptionStatus::Active && self.ends_at.map_or(true, |end| end > now)
    }
}

pub fn new_pending(store_id: Uuid, plan_id: Uuid) -> ActiveModel {
    let now = Utc::now().into();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        plan_id: Set(plan_id),
        status: Set(SubscriptionStatus::Pending),
        starts_at: Set(None),
        ends_at: Set(None),
        cancelled_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}
