use axum::{
    extract::{Path, Query, State},
    Json,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{require_admin, validate_input, PaginationParams};
use crate::services::returns::{
    CreateReturnRequest, CreateReturnResponse, ReturnListResponse, ReturnResponse,
};
use crate::{ApiResponse, AppState};

/// Create a return request against an owned order
#[utoipa::path(
    post,
    path = "/api/v1/returns",
    request_body = CreateReturnRequest,
    responses(
        (status = 201, description = "Return request created", body = ApiResponse<CreateReturnResponse>),
        (status = 400, description = "Validation failure, expired window, or missing photos", body = crate::errors::ErrorResponse),
        (status = 401, description = "Order belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Returns"
)]
pub async fn create_return(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<CreateReturnRequest>,
) -> Result<(http::StatusCode, Json<ApiResponse<CreateReturnResponse>>), ServiceError> {
    validate_input(&body)?;
    let response = state
        .services
        .returns
        .create_return(auth_user.user_id, body)
        .await?;
    Ok((
        http::StatusCode::CREATED,
        Json(ApiResponse::success(response)),
    ))
}

/// Fetch a return request
pub async fn get_return(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReturnResponse>>, ServiceError> {
    let ret = state.services.returns.get_return(id).await?;
    if ret.user_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "return belongs to another user".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(ret)))
}

/// List all return requests (operators)
pub async fn list_returns(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<ReturnListResponse>>, ServiceError> {
    require_admin(&auth_user)?;
    let result = state
        .services
        .returns
        .list_returns(pagination.page, pagination.per_page)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct OrderReturnsResponse {
    pub returns: Vec<ReturnResponse>,
}

/// List return requests filed against one order
pub async fn list_returns_for_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderReturnsResponse>>, ServiceError> {
    let order = state.services.orders.get_order(order_id).await?;
    if order.user_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "order belongs to another user".to_string(),
        ));
    }
    let returns = state.services.returns.list_returns_for_order(order_id).await?;
    Ok(Json(ApiResponse::success(OrderReturnsResponse { returns })))
}
