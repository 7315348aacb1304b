use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{require_admin, validate_input, PaginationParams};
use crate::services::orders::{
    CreateOrderItemInput, CreateOrderRequest, CreateOrderResponse, OrderListResponse,
    OrderResponse, OrderStatus, UpdateOrderStatusRequest, UpdateOrderStatusResponse,
};
use crate::{ApiResponse, AppState};

/// Checkout payload; the owning user comes from the bearer token, never the
/// request body.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderBody {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Customer email must be valid"))]
    pub customer_email: String,
    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub customer_phone: String,
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, message = "Billing address is required"))]
    pub billing_address: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CreateOrderItemBody>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub shipping_charges: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItemBody {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Create an order and its payment-gateway order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderBody,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<CreateOrderResponse>),
        (status = 400, description = "Validation failure", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<CreateOrderBody>,
) -> Result<(http::StatusCode, Json<ApiResponse<CreateOrderResponse>>), ServiceError> {
    validate_input(&body)?;

    let request = CreateOrderRequest {
        user_id: auth_user.user_id,
        customer_name: body.customer_name,
        customer_email: body.customer_email,
        customer_phone: body.customer_phone,
        shipping_address: body.shipping_address,
        billing_address: body.billing_address,
        items: body
            .items
            .into_iter()
            .map(|item| CreateOrderItemInput {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
        total_amount: body.total_amount,
        shipping_charges: body.shipping_charges,
        tax_amount: body.tax_amount,
        payment_method: body.payment_method,
    };

    let response = state.services.orders.create_order(request).await?;
    Ok((
        http::StatusCode::CREATED,
        Json(ApiResponse::success(response)),
    ))
}

/// Fetch an order with its line items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;

    if order.user_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "order belongs to another user".to_string(),
        ));
    }

    Ok(Json(ApiResponse::success(order)))
}

/// List the authenticated user's orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let result = state
        .services
        .orders
        .list_orders_for_user(auth_user.user_id, pagination.page, pagination.per_page)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Move a paid order through fulfillment (shipped/delivered) or cancel it
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<UpdateOrderStatusResponse>),
        (status = 400, description = "Invalid status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not eligible for update", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<UpdateOrderStatusResponse>>, ServiceError> {
    require_admin(&auth_user)?;
    validate_input(&body)?;

    let new_status = OrderStatus::from_str(&body.status)?;
    let response = state
        .services
        .orders
        .update_order_status(id, new_status)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
