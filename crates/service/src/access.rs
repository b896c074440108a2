//! Store-scoped role checks.
//!
//! Every store operation resolves the caller's membership through [`authorize`]
//! before touching data. Platform admins bypass membership entirely.

use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::status::{StoreRole, StoreStatus};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    ViewStore,
    ManageStore,
    DeleteStore,
    ManageMembers,
    ManageCatalog,
    ViewOrders,
    FulfillOrders,
    CancelOrders,
    ViewBilling,
    ManageBilling,
}

impl Permission {
    /// Still granted while a store is suspended.
    pub fn allowed_when_suspended(self) -> bool {
        matches!(self, Permission::ViewStore | Permission::ViewBilling)
    }
}

pub fn role_allows(role: StoreRole, perm: Permission) -> bool {
    use Permission::*;
    match role {
        StoreRole::Owner => true,
        StoreRole::Admin => !matches!(perm, DeleteStore | ManageBilling),
        StoreRole::Manager => matches!(perm, ViewStore | ManageCatalog | ViewOrders | FulfillOrders | CancelOrders | ViewBilling),
        StoreRole::Staff => matches!(perm, ViewStore | ViewOrders | FulfillOrders),
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// Result of a successful check. `role` is `None` for platform admins
/// acting on a store they are not a member of.
#[derive(Debug, Clone)]
pub struct StoreAccess {
    pub store: models::store::Model,
    pub role: Option<StoreRole>,
}

impl StoreAccess {
    /// Rank used for role-management decisions; admins act as owner.
    pub fn effective_role(&self) -> StoreRole {
        self.role.unwrap_or(StoreRole::Owner)
    }
}

pub async fn authorize<C: ConnectionTrait>(db: &C, store_id: Uuid, actor: Actor, perm: Permission) -> Result<StoreAccess, ServiceError> {
    let store = models::store::Entity::find_by_id(store_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("store"))?;
    let member = models::store_member::find(db, store_id, actor.user_id).await?;
    let role = member.map(|m| m.role);

    if actor.is_admin {
        return Ok(StoreAccess { store, role });
    }
    let Some(r) = role else {
        return Err(ServiceError::forbidden());
    };
    if store.status == StoreStatus::Suspended && !perm.allowed_when_suspended() {
        return Err(ServiceError::Forbidden("store is suspended".into()));
    }
    if !role_allows(r, perm) {
        return Err(ServiceError::forbidden());
    }
    Ok(StoreAccess { store, role })
}

/// Whether `actor_role` may grant, change or revoke `target`.
pub fn can_manage_role(actor_role: StoreRole, target: StoreRole) -> bool {
    target != StoreRole::Owner && actor_role.outranks(target)
}
