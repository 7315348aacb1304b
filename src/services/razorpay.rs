//! Razorpay REST client.
//!
//! Thin authenticated client for gateway orders, payments and refunds. The
//! client validates inputs before going on the wire and surfaces upstream
//! error bodies verbatim, but performs no retries: payment creation must not
//! be retried blindly, so retry policy stays with the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Hard gateway-side bound: longer receipts are rejected upstream.
pub const MAX_RECEIPT_LEN: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum RazorpayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error calling payment gateway: {0}")]
    Network(#[from] reqwest::Error),

    #[error("gateway rejected the request ({status}): {body}")]
    Gateway { status: u16, body: String },

    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

impl From<RazorpayError> for ServiceError {
    fn from(err: RazorpayError) -> Self {
        match err {
            RazorpayError::InvalidRequest(msg) => ServiceError::ValidationError(msg),
            RazorpayError::Network(e) => ServiceError::NetworkError(e.to_string()),
            RazorpayError::Gateway { status, body } => ServiceError::PaymentGateway {
                message: format!("payment gateway returned status {}", status),
                details: body,
            },
            RazorpayError::Decode(msg) => ServiceError::PaymentGateway {
                message: "unexpected payment gateway response".to_string(),
                details: msg,
            },
        }
    }
}

/// The gateway's view of an order. Amounts are in minor currency units (paise).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCollection<T> {
    pub entity: String,
    pub count: i64,
    pub items: Vec<T>,
}

/// Payment gateway operations consumed by the orchestrator and the
/// passthrough handlers. Trait-shaped so tests can substitute a fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: Option<Value>,
    ) -> Result<GatewayOrder, RazorpayError>;

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, RazorpayError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, RazorpayError>;

    async fn create_refund(
        &self,
        payment_id: &str,
        amount_minor: Option<i64>,
        notes: Option<Value>,
    ) -> Result<GatewayRefund, RazorpayError>;

    async fn list_orders(
        &self,
        count: u32,
        skip: u32,
    ) -> Result<GatewayCollection<GatewayOrder>, RazorpayError>;

    async fn list_payments(
        &self,
        count: u32,
        skip: u32,
    ) -> Result<GatewayCollection<GatewayPayment>, RazorpayError>;
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
}

#[derive(Clone)]
pub struct RazorpayClient {
    http: Client,
    config: RazorpayConfig,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            config,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(RazorpayConfig {
            key_id: cfg.razorpay_key_id.clone(),
            key_secret: cfg.razorpay_key_secret.clone(),
            base_url: cfg.razorpay_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RazorpayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(RazorpayError::Network)?;
            return Err(RazorpayError::Gateway {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RazorpayError::Decode(e.to_string()))
    }
}

pub(crate) fn validate_amount_minor(amount_minor: i64) -> Result<(), RazorpayError> {
    if amount_minor <= 0 {
        return Err(RazorpayError::InvalidRequest(
            "amount must be a positive number of minor currency units".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_currency(currency: &str) -> Result<(), RazorpayError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(RazorpayError::InvalidRequest(
            "currency must be a 3-letter ISO code".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_receipt(receipt: &str) -> Result<(), RazorpayError> {
    if receipt.is_empty() {
        return Err(RazorpayError::InvalidRequest(
            "receipt must not be empty".to_string(),
        ));
    }
    if receipt.len() > MAX_RECEIPT_LEN {
        return Err(RazorpayError::InvalidRequest(format!(
            "receipt must be at most {} characters, got {}",
            MAX_RECEIPT_LEN,
            receipt.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self, notes), fields(amount_minor, currency, receipt))]
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: Option<Value>,
    ) -> Result<GatewayOrder, RazorpayError> {
        validate_amount_minor(amount_minor)?;
        validate_currency(currency)?;
        validate_receipt(receipt)?;

        let mut body = json!({
            "amount": amount_minor,
            "currency": currency,
            "receipt": receipt,
        });
        if let Some(notes) = notes {
            body["notes"] = notes;
        }

        let response = self
            .http
            .post(self.url("/orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        self.parse_response(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, RazorpayError> {
        if order_id.is_empty() {
            return Err(RazorpayError::InvalidRequest(
                "order id must not be empty".to_string(),
            ));
        }

        let response = self
            .http
            .get(self.url(&format!("/orders/{}", order_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        self.parse_response(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, RazorpayError> {
        if payment_id.is_empty() {
            return Err(RazorpayError::InvalidRequest(
                "payment id must not be empty".to_string(),
            ));
        }

        let response = self
            .http
            .get(self.url(&format!("/payments/{}", payment_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        self.parse_response(response).await
    }

    #[instrument(skip(self, notes))]
    async fn create_refund(
        &self,
        payment_id: &str,
        amount_minor: Option<i64>,
        notes: Option<Value>,
    ) -> Result<GatewayRefund, RazorpayError> {
        if payment_id.is_empty() {
            return Err(RazorpayError::InvalidRequest(
                "payment id must not be empty".to_string(),
            ));
        }
        if let Some(amount) = amount_minor {
            validate_amount_minor(amount)?;
        }

        let mut body = json!({});
        if let Some(amount) = amount_minor {
            body["amount"] = json!(amount);
        }
        if let Some(notes) = notes {
            body["notes"] = notes;
        }

        let response = self
            .http
            .post(self.url(&format!("/payments/{}/refund", payment_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        self.parse_response(response).await
    }

    #[instrument(skip(self))]
    async fn list_orders(
        &self,
        count: u32,
        skip: u32,
    ) -> Result<GatewayCollection<GatewayOrder>, RazorpayError> {
        let response = self
            .http
            .get(self.url("/orders"))
            .query(&[("count", count), ("skip", skip)])
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        self.parse_response(response).await
    }

    #[instrument(skip(self))]
    async fn list_payments(
        &self,
        count: u32,
        skip: u32,
    ) -> Result<GatewayCollection<GatewayPayment>, RazorpayError> {
        let response = self
            .http
            .get(self.url("/payments"))
            .query(&[("count", count), ("skip", skip)])
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await?;

        self.parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn receipt_at_bound_is_accepted() {
        let receipt = "r".repeat(MAX_RECEIPT_LEN);
        assert!(validate_receipt(&receipt).is_ok());
    }

    #[test]
    fn receipt_over_bound_is_rejected() {
        let receipt = "r".repeat(MAX_RECEIPT_LEN + 1);
        assert_matches!(
            validate_receipt(&receipt),
            Err(RazorpayError::InvalidRequest(_))
        );
    }

    #[test]
    fn empty_receipt_is_rejected() {
        assert_matches!(validate_receipt(""), Err(RazorpayError::InvalidRequest(_)));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert_matches!(
            validate_amount_minor(0),
            Err(RazorpayError::InvalidRequest(_))
        );
        assert_matches!(
            validate_amount_minor(-100),
            Err(RazorpayError::InvalidRequest(_))
        );
        assert!(validate_amount_minor(42_000).is_ok());
    }

    #[test]
    fn currency_must_be_three_letters() {
        assert!(validate_currency("INR").is_ok());
        assert_matches!(validate_currency("INRR"), Err(RazorpayError::InvalidRequest(_)));
        assert_matches!(validate_currency("IN"), Err(RazorpayError::InvalidRequest(_)));
        assert_matches!(validate_currency("IN1"), Err(RazorpayError::InvalidRequest(_)));
    }

    #[test]
    fn gateway_error_maps_to_service_error_with_details() {
        let err: ServiceError = RazorpayError::Gateway {
            status: 400,
            body: r#"{"error":{"code":"BAD_REQUEST_ERROR"}}"#.to_string(),
        }
        .into();
        assert_matches!(err, ServiceError::PaymentGateway { .. });
    }
}
