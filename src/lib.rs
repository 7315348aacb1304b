//! Herbloom Commerce API Library
//!
//! Backend for the Herbloom storefront: order lifecycle, payment
//! reconciliation, returns, shipping passthrough and notifications.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<auth::AuthService>,
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// Enhanced API routes function
pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/orders",
            axum::routing::post(handlers::orders::create_order).get(handlers::orders::list_my_orders),
        )
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route(
            "/orders/{id}/status",
            axum::routing::put(handlers::orders::update_order_status),
        )
        .route(
            "/orders/{id}/invoice",
            axum::routing::post(handlers::invoices::generate_invoice)
                .get(handlers::invoices::fetch_invoice),
        )
        .route(
            "/orders/{id}/returns",
            get(handlers::returns::list_returns_for_order),
        );

    let payments = Router::new().route(
        "/payments/verify",
        axum::routing::post(handlers::payments::verify_payment),
    );

    // Direct gateway passthrough for operators
    let razorpay = Router::new()
        .route(
            "/razorpay/orders",
            get(handlers::payments::list_gateway_orders),
        )
        .route(
            "/razorpay/orders/{id}",
            get(handlers::payments::fetch_gateway_order),
        )
        .route(
            "/razorpay/payments",
            get(handlers::payments::list_gateway_payments),
        )
        .route(
            "/razorpay/payments/{id}",
            get(handlers::payments::fetch_gateway_payment),
        )
        .route(
            "/razorpay/refunds",
            axum::routing::post(handlers::payments::create_gateway_refund),
        );

    let returns = Router::new()
        .route(
            "/returns",
            axum::routing::post(handlers::returns::create_return)
                .get(handlers::returns::list_returns),
        )
        .route("/returns/{id}", get(handlers::returns::get_return));

    // Shipping provider passthrough for operators
    let shiprocket = Router::new()
        .route(
            "/shiprocket/orders",
            axum::routing::post(handlers::shipping::create_shipment_order),
        )
        .route(
            "/shiprocket/awb",
            axum::routing::post(handlers::shipping::assign_awb),
        )
        .route(
            "/shiprocket/label",
            axum::routing::post(handlers::shipping::generate_label),
        )
        .route(
            "/shiprocket/manifest",
            axum::routing::post(handlers::shipping::get_manifest),
        )
        .route(
            "/shiprocket/track/{awb_code}",
            get(handlers::shipping::track_order),
        )
        .route(
            "/shiprocket/cancel",
            axum::routing::post(handlers::shipping::cancel_order),
        )
        .route(
            "/shiprocket/cancel-rto",
            axum::routing::post(handlers::shipping::cancel_rto),
        )
        .route(
            "/shiprocket/pickup-locations",
            get(handlers::shipping::get_pickup_locations),
        )
        .route(
            "/shiprocket/serviceability",
            get(handlers::shipping::check_serviceability),
        )
        .route(
            "/shiprocket/channels",
            get(handlers::shipping::get_channels),
        )
        .route(
            "/shiprocket/account",
            get(handlers::shipping::get_account_details),
        );

    let notifications = Router::new().route(
        "/notifications/health",
        get(handlers::notifications::notification_health),
    );

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(orders)
        .merge(payments)
        .merge(razorpay)
        .merge(returns)
        .merge(shiprocket)
        .merge(notifications)
}

async fn api_status() -> ApiResult<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "herbloom-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_wraps_data() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }
}
