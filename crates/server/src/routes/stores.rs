use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;
use uuid::Uuid;

use models::status::StoreRole;
use service::member_service::{self, MemberView};
use service::store_service::{self, CreateStore, StoreUsage, StoreWithRole, UpdateStore};
use service::Page;

use crate::auth::CurrentUser;
use crate::errors::JsonApiError;
use crate::extract::{Json, Path, Query};
use crate::routes::PageQuery;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct AddMemberInput {
    pub email: String,
    pub role: StoreRole,
}

#[derive(Debug, Deserialize)]
pub struct RoleInput {
    pub role: StoreRole,
}

#[utoipa::path(get, path = "/stores", tag = "stores", params(PageQuery), security(("bearer" = [])), responses((status = 200, description = "Stores the caller belongs to")))]
pub async fn list(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<StoreWithRole>>, JsonApiError> {
    Ok(Json(store_service::list_mine(&state.db, user.actor(), q.pagination()).await?))
}

#[utoipa::path(
    post, path = "/stores", tag = "stores",
    request_body = crate::openapi::CreateStoreRequest,
    security(("bearer" = [])),
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 409, description = "Slug taken"))
)]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateStore>,
) -> Result<(StatusCode, Json<StoreWithRole>), JsonApiError> {
    let created = store_service::create(&state.db, user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/stores/{id}", tag = "stores", params(("id" = Uuid, Path, description = "Store id")), security(("bearer" = [])), responses((status = 200, description = "OK"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoreWithRole>, JsonApiError> {
    Ok(Json(store_service::get(&state.db, user.actor(), id).await?))
}

#[utoipa::path(
    put, path = "/stores/{id}", tag = "stores",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::UpdateStoreRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden"), (status = 409, description = "Slug taken"))
)]
pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStore>,
) -> Result<Json<models::store::Model>, JsonApiError> {
    Ok(Json(store_service::update(&state.db, user.actor(), id, input).await?))
}

#[utoipa::path(delete, path = "/stores/{id}", tag = "stores", params(("id" = Uuid, Path, description = "Store id")), security(("bearer" = [])), responses((status = 204, description = "Deleted"), (status = 403, description = "Owner only")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    store_service::delete(&state.db, user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/stores/{id}/usage", tag = "stores", params(("id" = Uuid, Path, description = "Store id")), security(("bearer" = [])), responses((status = 200, description = "Usage against plan limits")))]
pub async fn usage(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoreUsage>, JsonApiError> {
    Ok(Json(store_service::usage(&state.db, user.actor(), id).await?))
}

#[utoipa::path(get, path = "/stores/{id}/members", tag = "members", params(("id" = Uuid, Path, description = "Store id"), PageQuery), security(("bearer" = [])), responses((status = 200, description = "Members")))]
pub async fn list_members(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<MemberView>>, JsonApiError> {
    Ok(Json(member_service::list(&state.db, user.actor(), id, q.pagination()).await?))
}

#[utoipa::path(
    post, path = "/stores/{id}/members", tag = "members",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::AddMemberRequest,
    security(("bearer" = [])),
    responses((status = 201, description = "Added"), (status = 403, description = "Forbidden"), (status = 404, description = "Unknown user"), (status = 409, description = "Already a member"))
)]
pub async fn add_member(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<AddMemberInput>,
) -> Result<(StatusCode, Json<MemberView>), JsonApiError> {
    let member = member_service::add(&state.db, user.actor(), id, &input.email, input.role).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    put, path = "/stores/{id}/members/{user_id}", tag = "members",
    params(("id" = Uuid, Path, description = "Store id"), ("user_id" = Uuid, Path, description = "Member user id")),
    request_body = crate::openapi::RoleRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Role changed"), (status = 403, description = "Forbidden"))
)]
pub async fn change_member_role(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<RoleInput>,
) -> Result<Json<MemberView>, JsonApiError> {
    Ok(Json(member_service::change_role(&state.db, user.actor(), id, member_id, input.role).await?))
}

#[utoipa::path(
    delete, path = "/stores/{id}/members/{user_id}", tag = "members",
    params(("id" = Uuid, Path, description = "Store id"), ("user_id" = Uuid, Path, description = "Member user id")),
    security(("bearer" = [])),
    responses((status = 204, description = "Removed"), (status = 403, description = "Forbidden"))
)]
pub async fn remove_member(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, JsonApiError> {
    member_service::remove(&state.db, user.actor(), id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
