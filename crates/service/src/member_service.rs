use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::status::StoreRole;
use models::{store_member, user};

use crate::access::{authorize, can_manage_role, Actor, Permission};
use crate::errors::ServiceError;
use crate::{Page, Pagination};

#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: StoreRole,
    pub joined_at: sea_orm::prelude::DateTimeWithTimeZone,
}

fn view(m: store_member::Model, u: user::Model) -> MemberView {
    MemberView { user_id: u.id, email: u.email, name: u.name, role: m.role, joined_at: m.created_at }
}

async fn find_member(db: &DatabaseConnection, store_id: Uuid, user_id: Uuid) -> Result<store_member::Model, ServiceError> {
    store_member::find(db, store_id, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("member"))
}

pub async fn list(db: &DatabaseConnection, actor: Actor, store_id: Uuid, opts: Pagination) -> Result<Page<MemberView>, ServiceError> {
    authorize(db, store_id, actor, Permission::ViewStore).await?;
    let (page_idx, per_page) = opts.normalize();
    let paginator = store_member::Entity::find()
        .filter(store_member::Column::StoreId.eq(store_id))
        .order_by_asc(store_member::Column::CreatedAt)
        .find_also_related(user::Entity)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page_idx)
        .await?
        .into_iter()
        .filter_map(|(m, u)| u.map(|u| view(m, u)))
        .collect();
    Ok(Page::new(items, total, opts))
}

/// Add an existing user by email.
#[instrument(skip(db))]
pub async fn add(db: &DatabaseConnection, actor: Actor, store_id: Uuid, email: &str, role: StoreRole) -> Result<MemberView, ServiceError> {
    let access = authorize(db, store_id, actor, Permission::ManageMembers).await?;
    if !can_manage_role(access.effective_role(), role) {
        return Err(ServiceError::Forbidden(format!("cannot grant role {:?}", role).to_lowercase()));
    }
    let target = user::find_by_email(db, email)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))?;
    if store_member::find(db, store_id, target.id).await?.is_some() {
        return Err(ServiceError::Conflict("user is already a member".into()));
    }
    let created = store_member::create(db, store_id, target.id, role).await?;
    info!(store_id = %store_id, user_id = %target.id, role = ?role, "member_added");
    Ok(view(created, target))
}

#[instrument(skip(db))]
pub async fn change_role(db: &DatabaseConnection, actor: Actor, store_id: Uuid, user_id: Uuid, role: StoreRole) -> Result<MemberView, ServiceError> {
    let access = authorize(db, store_id, actor, Permission::ManageMembers).await?;
    let member = find_member(db, store_id, user_id).await?;
    let mine = access.effective_role();
    if !can_manage_role(mine, member.role) || !can_manage_role(mine, role) {
        return Err(ServiceError::Forbidden("cannot change this member's role".into()));
    }
    let target = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))?;
    let mut am: store_member::ActiveModel = member.into();
    am.role = Set(role);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(store_id = %store_id, user_id = %user_id, role = ?role, "member_role_changed");
    Ok(view(updated, target))
}

/// Remove a member. Any non-owner may also remove themselves.
#[instrument(skip(db))]
pub async fn remove(db: &DatabaseConnection, actor: Actor, store_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
    if user_id == actor.user_id {
        authorize(db, store_id, actor, Permission::ViewStore).await?;
        let member = find_member(db, store_id, user_id).await?;
        if member.role == StoreRole::Owner {
            return Err(ServiceError::Forbidden("the owner cannot leave the store".into()));
        }
        store_member::Entity::delete_by_id(member.id).exec(db).await?;
        info!(store_id = %store_id, user_id = %user_id, "member_left");
        return Ok(());
    }
    let access = authorize(db, store_id, actor, Permission::ManageMembers).await?;
    let member = find_member(db, store_id, user_id).await?;
    if !can_manage_role(access.effective_role(), member.role) {
        return Err(ServiceError::Forbidden("cannot remove this member".into()));
    }
    store_member::Entity::delete_by_id(member.id).exec(db).await?;
    info!(store_id = %store_id, user_id = %user_id, "member_removed");
    Ok(())
}
