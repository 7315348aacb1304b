use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::require_admin;
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationHealth {
    pub primary_transport_reachable: bool,
}

/// Connectivity probe for the primary email transport; no message is sent.
pub async fn notification_health(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<NotificationHealth>>, ServiceError> {
    require_admin(&auth_user)?;
    let reachable = state.services.notifications.health_check().await;
    Ok(Json(ApiResponse::success(NotificationHealth {
        primary_transport_reachable: reachable,
    })))
}
