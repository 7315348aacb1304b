//! Shiprocket REST client.
//!
//! A thin authenticated pass-through: every operation validates its required
//! fields before calling out and returns the provider's JSON payload without
//! reinterpretation. Business logic stays in the orchestrator.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

use crate::config::AppConfig;
use crate::errors::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum ShiprocketError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("shipping provider is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("network error calling shipping provider: {0}")]
    Network(#[from] reqwest::Error),

    #[error("shipping provider rejected the request ({status}): {details}")]
    Provider { status: u16, details: String },

    #[error("unexpected shipping provider response: {0}")]
    Decode(String),
}

impl From<ShiprocketError> for ServiceError {
    fn from(err: ShiprocketError) -> Self {
        match err {
            ShiprocketError::MissingField(field) => {
                ServiceError::ValidationError(format!("missing required field: {}", field))
            }
            ShiprocketError::NotConfigured(what) => {
                ServiceError::InternalError(format!("shipping provider not configured: {}", what))
            }
            ShiprocketError::Network(e) => ServiceError::NetworkError(e.to_string()),
            ShiprocketError::Provider { status, details } => ServiceError::ShippingProvider {
                message: format!("shipping provider returned status {}", status),
                details,
            },
            ShiprocketError::Decode(msg) => ServiceError::ShippingProvider {
                message: "unexpected shipping provider response".to_string(),
                details: msg,
            },
        }
    }
}

/// Bearer token from `authenticate`. Not persisted: a fresh token is acquired
/// per logical session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiprocketToken(pub String);

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Clone)]
pub struct ShiprocketConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub base_url: String,
}

#[derive(Clone)]
pub struct ShiprocketClient {
    http: Client,
    config: ShiprocketConfig,
}

/// Fields the provider requires on shipment order creation.
const CREATE_ORDER_REQUIRED_FIELDS: &[&str] = &[
    "order_id",
    "order_date",
    "billing_customer_name",
    "billing_address",
    "billing_city",
    "billing_pincode",
    "billing_state",
    "billing_country",
    "billing_email",
    "billing_phone",
    "order_items",
    "payment_method",
    "sub_total",
];

impl ShiprocketClient {
    pub fn new(config: ShiprocketConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            config,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(ShiprocketConfig {
            email: cfg.shiprocket_email.clone(),
            password: cfg.shiprocket_password.clone(),
            base_url: cfg.shiprocket_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn parse_response(&self, response: reqwest::Response) -> Result<Value, ShiprocketError> {
        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.map_err(ShiprocketError::Network)?;
            return Err(ShiprocketError::Provider {
                status: status.as_u16(),
                details,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ShiprocketError::Decode(e.to_string()))
    }

    async fn get_authed(
        &self,
        token: &ShiprocketToken,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ShiprocketError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&token.0)
            .query(query)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn post_authed(
        &self,
        token: &ShiprocketToken,
        path: &str,
        body: &Value,
    ) -> Result<Value, ShiprocketError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&token.0)
            .json(body)
            .send()
            .await?;
        self.parse_response(response).await
    }

    /// Acquires a fresh API token. Tokens are deliberately not cached.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<ShiprocketToken, ShiprocketError> {
        let email = self
            .config
            .email
            .as_deref()
            .ok_or(ShiprocketError::NotConfigured("email"))?;
        let password = self
            .config
            .password
            .as_deref()
            .ok_or(ShiprocketError::NotConfigured("password"))?;

        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.map_err(ShiprocketError::Network)?;
            return Err(ShiprocketError::Provider {
                status: status.as_u16(),
                details,
            });
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ShiprocketError::Decode(e.to_string()))?;
        Ok(ShiprocketToken(auth.token))
    }

    /// Creates a shipment order from a provider-shaped payload.
    #[instrument(skip(self, token, payload))]
    pub async fn create_order(
        &self,
        token: &ShiprocketToken,
        payload: &Value,
    ) -> Result<Value, ShiprocketError> {
        for field in CREATE_ORDER_REQUIRED_FIELDS {
            let missing = match payload.get(field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(Value::Array(a)) => a.is_empty(),
                Some(_) => false,
            };
            if missing {
                return Err(ShiprocketError::MissingField((*field).to_string()));
            }
        }
        self.post_authed(token, "/orders/create/adhoc", payload)
            .await
    }

    /// Assigns a courier and waybill number to a shipment.
    #[instrument(skip(self, token))]
    pub async fn assign_awb(
        &self,
        token: &ShiprocketToken,
        shipment_id: i64,
        courier_id: Option<i64>,
    ) -> Result<Value, ShiprocketError> {
        let mut body = json!({ "shipment_id": shipment_id });
        if let Some(courier_id) = courier_id {
            body["courier_id"] = json!(courier_id);
        }
        self.post_authed(token, "/courier/assign/awb", &body).await
    }

    #[instrument(skip(self, token))]
    pub async fn generate_label(
        &self,
        token: &ShiprocketToken,
        shipment_ids: &[i64],
    ) -> Result<Value, ShiprocketError> {
        if shipment_ids.is_empty() {
            return Err(ShiprocketError::MissingField("shipment_id".to_string()));
        }
        self.post_authed(
            token,
            "/courier/generate/label",
            &json!({ "shipment_id": shipment_ids }),
        )
        .await
    }

    #[instrument(skip(self, token))]
    pub async fn get_manifest(
        &self,
        token: &ShiprocketToken,
        shipment_ids: &[i64],
    ) -> Result<Value, ShiprocketError> {
        if shipment_ids.is_empty() {
            return Err(ShiprocketError::MissingField("shipment_id".to_string()));
        }
        self.post_authed(
            token,
            "/manifests/generate",
            &json!({ "shipment_id": shipment_ids }),
        )
        .await
    }

    /// Tracks a shipment by waybill number.
    #[instrument(skip(self, token))]
    pub async fn track_order(
        &self,
        token: &ShiprocketToken,
        awb_code: &str,
    ) -> Result<Value, ShiprocketError> {
        if awb_code.is_empty() {
            return Err(ShiprocketError::MissingField("awb_code".to_string()));
        }
        self.get_authed(token, &format!("/courier/track/awb/{}", awb_code), &[])
            .await
    }

    #[instrument(skip(self, token))]
    pub async fn cancel_order(
        &self,
        token: &ShiprocketToken,
        order_ids: &[i64],
    ) -> Result<Value, ShiprocketError> {
        if order_ids.is_empty() {
            return Err(ShiprocketError::MissingField("ids".to_string()));
        }
        self.post_authed(token, "/orders/cancel", &json!({ "ids": order_ids }))
            .await
    }

    /// Cancels a return-to-origin for the given waybill numbers.
    #[instrument(skip(self, token))]
    pub async fn cancel_rto(
        &self,
        token: &ShiprocketToken,
        awb_codes: &[String],
    ) -> Result<Value, ShiprocketError> {
        if awb_codes.is_empty() {
            return Err(ShiprocketError::MissingField("awbs".to_string()));
        }
        self.post_authed(token, "/orders/cancel/rto", &json!({ "awbs": awb_codes }))
            .await
    }

    #[instrument(skip(self, token))]
    pub async fn get_pickup_locations(
        &self,
        token: &ShiprocketToken,
    ) -> Result<Value, ShiprocketError> {
        self.get_authed(token, "/settings/company/pickup", &[]).await
    }

    #[instrument(skip(self, token))]
    pub async fn check_serviceability(
        &self,
        token: &ShiprocketToken,
        pickup_postcode: &str,
        delivery_postcode: &str,
        weight_kg: f64,
        cod: bool,
    ) -> Result<Value, ShiprocketError> {
        if pickup_postcode.is_empty() {
            return Err(ShiprocketError::MissingField("pickup_postcode".to_string()));
        }
        if delivery_postcode.is_empty() {
            return Err(ShiprocketError::MissingField(
                "delivery_postcode".to_string(),
            ));
        }
        let query = [
            ("pickup_postcode", pickup_postcode.to_string()),
            ("delivery_postcode", delivery_postcode.to_string()),
            ("weight", weight_kg.to_string()),
            ("cod", if cod { "1" } else { "0" }.to_string()),
        ];
        self.get_authed(token, "/courier/serviceability/", &query)
            .await
    }

    #[instrument(skip(self, token))]
    pub async fn get_channels(&self, token: &ShiprocketToken) -> Result<Value, ShiprocketError> {
        self.get_authed(token, "/channels", &[]).await
    }

    #[instrument(skip(self, token))]
    pub async fn get_account_details(
        &self,
        token: &ShiprocketToken,
    ) -> Result<Value, ShiprocketError> {
        self.get_authed(token, "/account/details", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn client() -> ShiprocketClient {
        ShiprocketClient::new(ShiprocketConfig {
            email: None,
            password: None,
            base_url: "http://127.0.0.1:9".to_string(),
        })
    }

    #[tokio::test]
    async fn authenticate_without_credentials_fails_fast() {
        let result = client().authenticate().await;
        assert_matches!(result, Err(ShiprocketError::NotConfigured("email")));
    }

    #[tokio::test]
    async fn create_order_rejects_missing_required_fields() {
        let token = ShiprocketToken("t".to_string());
        let payload = json!({
            "order_id": "HB-1",
            "order_date": "2026-01-09",
            // billing fields absent
        });
        let result = client().create_order(&token, &payload).await;
        assert_matches!(result, Err(ShiprocketError::MissingField(_)));
    }

    #[tokio::test]
    async fn create_order_rejects_empty_item_list() {
        let token = ShiprocketToken("t".to_string());
        let mut payload = json!({});
        for field in CREATE_ORDER_REQUIRED_FIELDS {
            payload[*field] = json!("x");
        }
        payload["order_items"] = json!([]);
        let result = client().create_order(&token, &payload).await;
        assert_matches!(result, Err(ShiprocketError::MissingField(field)) if field == "order_items");
    }

    #[tokio::test]
    async fn track_order_requires_awb() {
        let token = ShiprocketToken("t".to_string());
        let result = client().track_order(&token, "").await;
        assert_matches!(result, Err(ShiprocketError::MissingField(_)));
    }

    #[tokio::test]
    async fn serviceability_requires_postcodes() {
        let token = ShiprocketToken("t".to_string());
        let result = client()
            .check_serviceability(&token, "", "560001", 0.5, false)
            .await;
        assert_matches!(result, Err(ShiprocketError::MissingField(_)));
    }
}
