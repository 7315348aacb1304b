use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::invoices::InvoiceDocument;
use crate::{ApiResponse, AppState};

async fn authorize_order_access(
    state: &AppState,
    auth_user: &AuthUser,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    let order = state.services.orders.get_order(order_id).await?;
    if order.user_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "order belongs to another user".to_string(),
        ));
    }
    Ok(())
}

/// Generate (or re-generate) the invoice for a paid order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/invoice",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Invoice generated", body = ApiResponse<InvoiceDocument>),
        (status = 400, description = "Payment incomplete", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Invoices"
)]
pub async fn generate_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InvoiceDocument>>, ServiceError> {
    authorize_order_access(&state, &auth_user, id).await?;
    let invoice = state.services.invoices.generate_invoice(id).await?;
    Ok(Json(ApiResponse::success(invoice)))
}

/// Fetch the rendered invoice as plain text
pub async fn fetch_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize_order_access(&state, &auth_user, id).await?;
    let invoice = state.services.invoices.generate_invoice(id).await?;
    Ok((
        [(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        invoice.rendered,
    ))
}
