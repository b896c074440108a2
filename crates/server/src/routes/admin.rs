use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;
use uuid::Uuid;

use models::status::StoreStatus;
use service::plan_service::{self, PlanInput};
use service::store_service;

use crate::auth::CurrentUser;
use crate::errors::JsonApiError;
use crate::extract::{Json, Path};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct StoreStatusInput {
    pub status: StoreStatus,
}

#[utoipa::path(
    post, path = "/admin/plans", tag = "admin",
    request_body = crate::openapi::PlanRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Validation Error"),
        (status = 403, description = "Platform admins only"),
        (status = 409, description = "Slug taken")
    )
)]
pub async fn create_plan(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<PlanInput>,
) -> Result<(StatusCode, Json<models::plan::Model>), JsonApiError> {
    let plan = plan_service::create(&state.db, user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

#[utoipa::path(
    put, path = "/admin/plans/{id}", tag = "admin",
    params(("id" = Uuid, Path, description = "Plan id")),
    request_body = crate::openapi::PlanRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Updated"), (status = 403, description = "Platform admins only"), (status = 404, description = "Not Found"))
)]
pub async fn update_plan(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<PlanInput>,
) -> Result<Json<models::plan::Model>, JsonApiError> {
    Ok(Json(plan_service::update(&state.db, user.actor(), id, input).await?))
}

#[utoipa::path(
    put, path = "/admin/stores/{id}/status", tag = "admin",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::StoreStatusRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Updated"), (status = 403, description = "Platform admins only"), (status = 404, description = "Not Found"))
)]
pub async fn set_store_status(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<StoreStatusInput>,
) -> Result<Json<models::store::Model>, JsonApiError> {
    Ok(Json(store_service::set_status(&state.db, user.actor(), id, input.status).await?))
}
