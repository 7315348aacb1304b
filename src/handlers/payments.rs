use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{require_admin, validate_input};
use crate::services::orders::{VerifyPaymentRequest, VerifyPaymentResponse};
use crate::services::razorpay::{
    GatewayCollection, GatewayOrder, GatewayPayment, GatewayRefund,
};
use crate::{ApiResponse, AppState};

/// Verify a payment-gateway callback and confirm the order
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified, order confirmed", body = ApiResponse<VerifyPaymentResponse>),
        (status = 400, description = "Invalid signature or missing fields", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<VerifyPaymentResponse>>, ServiceError> {
    validate_input(&body)?;
    let response = state.services.orders.verify_payment(body).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[derive(Debug, Deserialize)]
pub struct GatewayListQuery {
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub skip: u32,
}

fn default_count() -> u32 {
    10
}

/// Direct gateway passthrough for operators: list orders
pub async fn list_gateway_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<GatewayListQuery>,
) -> Result<Json<ApiResponse<GatewayCollection<GatewayOrder>>>, ServiceError> {
    require_admin(&auth_user)?;
    let orders = state
        .services
        .gateway
        .list_orders(query.count, query.skip)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn fetch_gateway_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<GatewayOrder>>, ServiceError> {
    require_admin(&auth_user)?;
    let order = state.services.gateway.fetch_order(&id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_gateway_payments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<GatewayListQuery>,
) -> Result<Json<ApiResponse<GatewayCollection<GatewayPayment>>>, ServiceError> {
    require_admin(&auth_user)?;
    let payments = state
        .services
        .gateway
        .list_payments(query.count, query.skip)
        .await?;
    Ok(Json(ApiResponse::success(payments)))
}

pub async fn fetch_gateway_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<GatewayPayment>>, ServiceError> {
    require_admin(&auth_user)?;
    let payment = state.services.gateway.fetch_payment(&id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRefundBody {
    pub payment_id: String,
    /// Minor currency units; omit for a full refund
    pub amount: Option<i64>,
    pub notes: Option<Value>,
}

/// Issue a refund against a captured payment
pub async fn create_gateway_refund(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<CreateRefundBody>,
) -> Result<Json<ApiResponse<GatewayRefund>>, ServiceError> {
    require_admin(&auth_user)?;
    if body.payment_id.is_empty() {
        return Err(ServiceError::ValidationError(
            "payment_id is required".to_string(),
        ));
    }
    let refund = state
        .services
        .gateway
        .create_refund(&body.payment_id, body.amount, body.notes)
        .await?;
    Ok(Json(ApiResponse::success(refund)))
}
