use axum::{extract::State, http::StatusCode, Extension};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use models::status::{InvoiceStatus, PaymentStatus};
use models::{invoice, payment, plan, subscription};
use service::payment::service::{CallbackInput, InitiatePayment, PaymentInitiated};
use service::subscription_service::{self, CurrentSubscription, SubscribeOutcome};
use service::{invoice_service, plan_service, Page};

use crate::auth::CurrentUser;
use crate::errors::JsonApiError;
use crate::extract::{Form, Json, Path, Query};
use crate::routes::PageQuery;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `unpaid`, `paid` or `void`.
    #[param(value_type = Option<String>)]
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeInput {
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub refund_due: bool,
}

#[utoipa::path(get, path = "/plans", tag = "billing", responses((status = 200, description = "Active plans, cheapest first")))]
pub async fn list_plans(State(state): State<ServerState>) -> Result<Json<Vec<plan::Model>>, JsonApiError> {
    Ok(Json(plan_service::list_active(&state.db).await?))
}

#[utoipa::path(
    post, path = "/orders/{id}/payments", tag = "billing",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = crate::openapi::InitiatePaymentRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Bill created, or an earlier pending one reused"),
        (status = 409, description = "Order not awaiting payment"),
        (status = 502, description = "Gateway failure")
    )
)]
pub async fn pay_order(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<InitiatePayment>,
) -> Result<(StatusCode, Json<PaymentInitiated>), JsonApiError> {
    let started = state.payments.initiate_for_order(user.actor(), id, input).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

#[utoipa::path(
    post, path = "/stores/{id}/subscription/payments", tag = "billing",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::InitiatePaymentRequest,
    security(("bearer" = [])),
    responses((status = 201, description = "Bill created for the pending subscription"), (status = 404, description = "No pending subscription"))
)]
pub async fn pay_subscription(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<InitiatePayment>,
) -> Result<(StatusCode, Json<PaymentInitiated>), JsonApiError> {
    let started = state.payments.initiate_for_subscription(user.actor(), id, input).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

#[utoipa::path(get, path = "/payments/{id}", tag = "billing", params(("id" = Uuid, Path, description = "Payment id")), security(("bearer" = [])), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get_payment(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<payment::Model>, JsonApiError> {
    Ok(Json(state.payments.get(user.actor(), id).await?))
}

/// EBILLING notification, posted form-encoded once the payer settles the bill.
#[utoipa::path(
    post, path = "/payments/ebilling/callback", tag = "billing",
    request_body(content = crate::openapi::EbillingCallbackForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Payment recorded"),
        (status = 400, description = "Bill id or amount mismatch"),
        (status = 404, description = "Unknown reference")
    )
)]
pub async fn ebilling_callback(State(state): State<ServerState>, Form(input): Form<CallbackInput>) -> Result<Json<CallbackAck>, JsonApiError> {
    info!(reference = %input.reference, bill_id = %input.billingid, "ebilling callback received");
    let p = state.payments.handle_callback(input).await?;
    Ok(Json(CallbackAck { payment_id: p.id, status: p.status, refund_due: p.refund_due }))
}

#[utoipa::path(get, path = "/stores/{id}/invoices", tag = "billing", params(("id" = Uuid, Path, description = "Store id"), InvoiceQuery), security(("bearer" = [])), responses((status = 200, description = "Invoices, newest first")))]
pub async fn list_invoices(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(q): Query<InvoiceQuery>,
) -> Result<Json<Page<invoice::Model>>, JsonApiError> {
    let page = PageQuery { page: q.page, per_page: q.per_page }.pagination();
    Ok(Json(invoice_service::list_for_store(&state.db, user.actor(), id, q.status, page).await?))
}

#[utoipa::path(get, path = "/invoices/{id}", tag = "billing", params(("id" = Uuid, Path, description = "Invoice id")), security(("bearer" = [])), responses((status = 200, description = "OK"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn get_invoice(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<invoice::Model>, JsonApiError> {
    Ok(Json(invoice_service::get(&state.db, user.actor(), id).await?))
}

#[utoipa::path(get, path = "/stores/{id}/subscription", tag = "billing", params(("id" = Uuid, Path, description = "Store id")), security(("bearer" = [])), responses((status = 200, description = "Effective plan and any pending subscription")))]
pub async fn current_subscription(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CurrentSubscription>, JsonApiError> {
    Ok(Json(subscription_service::current(&state.db, user.actor(), id).await?))
}

#[utoipa::path(
    post, path = "/stores/{id}/subscription", tag = "billing",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::SubscribeRequest,
    security(("bearer" = [])),
    responses((status = 201, description = "Active for free plans, pending with an invoice otherwise"), (status = 403, description = "Owner only"))
)]
pub async fn subscribe(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<SubscribeInput>,
) -> Result<(StatusCode, Json<SubscribeOutcome>), JsonApiError> {
    let outcome = subscription_service::subscribe(&state.db, user.actor(), id, input.plan_id).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[utoipa::path(post, path = "/stores/{id}/subscription/cancel", tag = "billing", params(("id" = Uuid, Path, description = "Store id")), security(("bearer" = [])), responses((status = 200, description = "Cancelled"), (status = 404, description = "No active subscription")))]
pub async fn cancel_subscription(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<subscription::Model>, JsonApiError> {
    Ok(Json(subscription_service::cancel(&state.db, user.actor(), id).await?))
}
