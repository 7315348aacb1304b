//! Notification dispatch.
//!
//! Two independent delivery paths: transactional customer email through an
//! ordered list of HTTP transport strategies (primary first, fallback next),
//! and administrative alerts through a webhook form relay. Both paths are
//! best-effort: the `*_safe` entry points capture failures in the returned
//! outcome and never propagate an error to the caller, because callers
//! (payment verification, status updates, returns) must not fail or roll
//! back over a notification outage.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("transport not configured: {0}")]
    NotConfigured(&'static str),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("transport rejected the message ({status}): {body}")]
    Transport { status: u16, body: String },
}

/// A customer-facing email message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
}

/// Result of a best-effort delivery attempt. Failures are data, not errors.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailOutcome {
    pub success: bool,
    /// Tag of the transport strategy that succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailOutcome {
    pub fn delivered(method: &str) -> Self {
        Self {
            success: true,
            method: Some(method.to_string()),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            method: None,
            error: Some(error),
        }
    }
}

/// One email delivery strategy. Strategies are tried in order; the first
/// success wins and its tag is reported back to the caller.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    fn tag(&self) -> &str;

    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;

    /// Reports reachability without sending a real message.
    async fn health_check(&self) -> bool;
}

/// Transport backed by an HTTP transactional-email endpoint.
pub struct HttpEmailTransport {
    tag: String,
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    from_address: String,
}

impl HttpEmailTransport {
    pub fn new(
        tag: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            endpoint: endpoint.into(),
            api_key,
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let body = json!({
            "from": self.from_address,
            "to": message.to,
            "subject": message.subject,
            "text": message.text_body,
        });

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Transport {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        // Reachability only: any HTTP response means the endpoint is up.
        self.http.head(&self.endpoint).send().await.is_ok()
    }
}

/// Dispatcher over the ordered transport list plus the admin relay.
pub struct EmailDispatcher {
    transports: Vec<Arc<dyn EmailTransport>>,
    admin_relay_url: Option<String>,
    http: Client,
}

impl EmailDispatcher {
    pub fn new(transports: Vec<Arc<dyn EmailTransport>>, admin_relay_url: Option<String>) -> Self {
        Self {
            transports,
            admin_relay_url,
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        let mut transports: Vec<Arc<dyn EmailTransport>> = Vec::new();
        if let Some(endpoint) = &cfg.email_primary_endpoint {
            transports.push(Arc::new(HttpEmailTransport::new(
                "primary",
                endpoint.clone(),
                cfg.email_primary_api_key.clone(),
                cfg.email_from_address.clone(),
            )));
        }
        if let Some(endpoint) = &cfg.email_fallback_endpoint {
            transports.push(Arc::new(HttpEmailTransport::new(
                "fallback",
                endpoint.clone(),
                cfg.email_fallback_api_key.clone(),
                cfg.email_from_address.clone(),
            )));
        }
        Self::new(transports, cfg.admin_alert_webhook_url.clone())
    }

    /// Attempts delivery through each transport in order and reports which
    /// one succeeded. Never returns an error past this boundary.
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    pub async fn send_email_safe(&self, message: &EmailMessage) -> EmailOutcome {
        if self.transports.is_empty() {
            warn!("no email transport configured; dropping message");
            return EmailOutcome::failed("no email transport configured".to_string());
        }

        let mut last_error = String::new();
        for transport in &self.transports {
            match transport.send(message).await {
                Ok(()) => {
                    info!(method = transport.tag(), "email delivered");
                    return EmailOutcome::delivered(transport.tag());
                }
                Err(e) => {
                    warn!(method = transport.tag(), error = %e, "email transport failed");
                    last_error = e.to_string();
                }
            }
        }

        EmailOutcome::failed(last_error)
    }

    /// Posts a structured alert to the admin form relay. Best-effort.
    #[instrument(skip(self, payload))]
    pub async fn notify_admin_safe(&self, subject: &str, payload: Value) -> EmailOutcome {
        let Some(url) = &self.admin_relay_url else {
            warn!("admin webhook not configured; dropping alert");
            return EmailOutcome::failed("admin webhook not configured".to_string());
        };

        let body = json!({
            "subject": subject,
            "payload": payload,
        });

        match self.http.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                info!("admin alert delivered");
                EmailOutcome::delivered("admin_webhook")
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(status = status, "admin relay rejected the alert");
                EmailOutcome::failed(format!("admin relay returned status {}", status))
            }
            Err(e) => {
                warn!(error = %e, "admin relay unreachable");
                EmailOutcome::failed(e.to_string())
            }
        }
    }

    /// Verifies connectivity of the primary transport without sending a
    /// message. Used by operational diagnostics.
    pub async fn health_check(&self) -> bool {
        match self.transports.first() {
            Some(primary) => primary.health_check().await,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTransport {
        tag: &'static str,
        ok: bool,
        calls: AtomicUsize,
    }

    impl FixedTransport {
        fn new(tag: &'static str, ok: bool) -> Arc<Self> {
            Arc::new(Self {
                tag,
                ok,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EmailTransport for FixedTransport {
        fn tag(&self) -> &str {
            self.tag
        }

        async fn send(&self, _message: &EmailMessage) -> Result<(), NotificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.ok {
                Ok(())
            } else {
                Err(NotificationError::Transport {
                    status: 500,
                    body: "boom".to_string(),
                })
            }
        }

        async fn health_check(&self) -> bool {
            self.ok
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "customer@example.com".to_string(),
            subject: "Order confirmed".to_string(),
            text_body: "Thanks for your order".to_string(),
        }
    }

    #[tokio::test]
    async fn primary_success_reports_primary_tag() {
        let primary = FixedTransport::new("primary", true);
        let fallback = FixedTransport::new("fallback", true);
        let dispatcher =
            EmailDispatcher::new(vec![primary.clone(), fallback.clone()], None);

        let outcome = dispatcher.send_email_safe(&message()).await;
        assert!(outcome.success);
        assert_eq!(outcome.method.as_deref(), Some("primary"));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_is_tried_after_primary_failure() {
        let primary = FixedTransport::new("primary", false);
        let fallback = FixedTransport::new("fallback", true);
        let dispatcher =
            EmailDispatcher::new(vec![primary.clone(), fallback.clone()], None);

        let outcome = dispatcher.send_email_safe(&message()).await;
        assert!(outcome.success);
        assert_eq!(outcome.method.as_deref(), Some("fallback"));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn total_failure_is_captured_not_thrown() {
        let primary = FixedTransport::new("primary", false);
        let fallback = FixedTransport::new("fallback", false);
        let dispatcher = EmailDispatcher::new(vec![primary, fallback], None);

        let outcome = dispatcher.send_email_safe(&message()).await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
        assert!(outcome.method.is_none());
    }

    #[tokio::test]
    async fn no_transports_configured_is_a_captured_failure() {
        let dispatcher = EmailDispatcher::new(vec![], None);
        let outcome = dispatcher.send_email_safe(&message()).await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn admin_alert_without_relay_is_a_captured_failure() {
        let dispatcher = EmailDispatcher::new(vec![], None);
        let outcome = dispatcher
            .notify_admin_safe("New order", json!({"order_id": "x"}))
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn health_check_uses_primary_transport() {
        let dispatcher = EmailDispatcher::new(vec![FixedTransport::new("primary", true)], None);
        assert!(dispatcher.health_check().await);

        let dispatcher = EmailDispatcher::new(vec![FixedTransport::new("primary", false)], None);
        assert!(!dispatcher.health_check().await);

        let dispatcher = EmailDispatcher::new(vec![], None);
        assert!(!dispatcher.health_check().await);
    }
}
