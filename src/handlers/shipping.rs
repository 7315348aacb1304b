//! Shipping provider passthrough endpoints for store operators.
//!
//! Every handler acquires a fresh provider token for the logical session and
//! relays the provider's JSON payload untouched.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::require_admin;
use crate::{ApiResponse, AppState};

pub async fn create_shipment_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.create_order(&token, &payload).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct AssignAwbBody {
    pub shipment_id: i64,
    pub courier_id: Option<i64>,
}

pub async fn assign_awb(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<AssignAwbBody>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client
        .assign_awb(&token, body.shipment_id, body.courier_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct ShipmentIdsBody {
    pub shipment_ids: Vec<i64>,
}

pub async fn generate_label(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<ShipmentIdsBody>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.generate_label(&token, &body.shipment_ids).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn get_manifest(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<ShipmentIdsBody>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.get_manifest(&token, &body.shipment_ids).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn track_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(awb_code): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.track_order(&token, &awb_code).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct CancelOrdersBody {
    pub order_ids: Vec<i64>,
}

pub async fn cancel_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<CancelOrdersBody>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.cancel_order(&token, &body.order_ids).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct CancelRtoBody {
    pub awb_codes: Vec<String>,
}

pub async fn cancel_rto(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<CancelRtoBody>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.cancel_rto(&token, &body.awb_codes).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn get_pickup_locations(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.get_pickup_locations(&token).await?;
    Ok(Json(ApiResponse::success(result)))
}

#[derive(Debug, Deserialize)]
pub struct ServiceabilityQuery {
    pub pickup_postcode: String,
    pub delivery_postcode: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub cod: bool,
}

fn default_weight() -> f64 {
    0.5
}

pub async fn check_serviceability(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ServiceabilityQuery>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client
        .check_serviceability(
            &token,
            &query.pickup_postcode,
            &query.delivery_postcode,
            query.weight,
            query.cod,
        )
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn get_channels(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.get_channels(&token).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn get_account_details(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    require_admin(&auth_user)?;
    let client = &state.services.shiprocket;
    let token = client.authenticate().await?;
    let result = client.get_account_details(&token).await?;
    Ok(Json(ApiResponse::success(result)))
}
