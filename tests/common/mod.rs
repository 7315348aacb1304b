//! Shared test harness: in-memory SQLite application state with a fake
//! payment gateway and a transport-less notification dispatcher, so tests
//! exercise the real orchestration logic with no network.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use herbloom_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{order, product, profile},
    events::EventSender,
    handlers::AppServices,
    services::notifications::EmailDispatcher,
    services::orders::{OrderStatus, PaymentStatus},
    services::razorpay::{
        GatewayCollection, GatewayOrder, GatewayPayment, GatewayRefund, PaymentGateway,
        RazorpayError,
    },
    services::signature::PaymentSignatureVerifier,
    AppState,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_GATEWAY_SECRET: &str = "rzp_test_secret_0123456789abcdef";

/// In-memory stand-in for the payment gateway. Records created orders and
/// can be flipped into failure mode.
pub struct FakeGateway {
    pub fail_create: AtomicBool,
    pub created: Mutex<Vec<GatewayOrder>>,
    counter: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_create: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        })
    }

    pub fn last_created(&self) -> Option<GatewayOrder> {
        self.created.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: Option<Value>,
    ) -> Result<GatewayOrder, RazorpayError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RazorpayError::Gateway {
                status: 500,
                body: r#"{"error":{"description":"gateway down"}}"#.to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let order = GatewayOrder {
            id: format!("order_test_{:04}", n),
            amount: amount_minor,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: Some("created".to_string()),
            notes,
        };
        self.created.lock().unwrap().push(order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, RazorpayError> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or(RazorpayError::Gateway {
                status: 404,
                body: r#"{"error":{"description":"order not found"}}"#.to_string(),
            })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, RazorpayError> {
        Ok(GatewayPayment {
            id: payment_id.to_string(),
            order_id: None,
            amount: 0,
            currency: "INR".to_string(),
            status: "captured".to_string(),
            method: None,
            email: None,
        })
    }

    async fn create_refund(
        &self,
        payment_id: &str,
        amount_minor: Option<i64>,
        _notes: Option<Value>,
    ) -> Result<GatewayRefund, RazorpayError> {
        Ok(GatewayRefund {
            id: "rfnd_test_0001".to_string(),
            payment_id: payment_id.to_string(),
            amount: amount_minor,
            currency: Some("INR".to_string()),
            status: "processed".to_string(),
        })
    }

    async fn list_orders(
        &self,
        count: u32,
        skip: u32,
    ) -> Result<GatewayCollection<GatewayOrder>, RazorpayError> {
        let created = self.created.lock().unwrap();
        let items: Vec<GatewayOrder> = created
            .iter()
            .skip(skip as usize)
            .take(count as usize)
            .cloned()
            .collect();
        Ok(GatewayCollection {
            entity: "collection".to_string(),
            count: items.len() as i64,
            items,
        })
    }

    async fn list_payments(
        &self,
        _count: u32,
        _skip: u32,
    ) -> Result<GatewayCollection<GatewayPayment>, RazorpayError> {
        Ok(GatewayCollection {
            entity: "collection".to_string(),
            count: 0,
            items: vec![],
        })
    }
}

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database.
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    auth: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.razorpay_key_secret = TEST_GATEWAY_SECRET.to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool).await.expect("migrations failed");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(herbloom_api::events::process_events(event_rx));

        let gateway = FakeGateway::new();
        // No transports configured: notification outcomes report captured
        // failures, which is exactly the best-effort contract under test.
        let notifications = Arc::new(EmailDispatcher::new(vec![], None));

        let auth = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(3600),
        )));

        let services = AppServices::new(
            db_arc.clone(),
            Some(Arc::new(event_sender.clone())),
            &cfg,
            gateway.clone(),
            notifications,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth: auth.clone(),
        };

        Self {
            state,
            gateway,
            auth,
            _event_task: event_task,
        }
    }

    /// Signature verifier matching the application's gateway secret.
    pub fn verifier(&self) -> PaymentSignatureVerifier {
        PaymentSignatureVerifier::new(TEST_GATEWAY_SECRET)
    }

    pub fn token_for(&self, user_id: Uuid, roles: &[&str]) -> String {
        self.auth
            .issue_token(user_id, roles.iter().map(|r| r.to_string()).collect())
            .expect("token issuance failed")
    }

    /// Router equivalent to the production composition in main.rs.
    pub fn router(&self) -> Router {
        let auth = self.auth.clone();
        Router::new()
            .nest("/api/v1", herbloom_api::api_v1_routes())
            .layer(axum::middleware::from_fn_with_state(
                auth,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::extract::Request,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(self.state.clone())
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn seed_profile(&self, email: &str) -> profile::Model {
        profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            full_name: Set(Some("Test Customer".to_string())),
            phone: Set(Some("+919900112233".to_string())),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed profile")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            stock_quantity: Set(stock),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed product")
    }

    /// Inserts a paid, confirmed order directly, with a controllable
    /// creation timestamp for return-window tests.
    pub async fn seed_paid_order(
        &self,
        user_id: Uuid,
        total_amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> order::Model {
        order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            customer_name: Set("Test Customer".to_string()),
            customer_email: Set("customer@example.com".to_string()),
            customer_phone: Set("+919900112233".to_string()),
            shipping_address: Set("12 MG Road, Bengaluru".to_string()),
            billing_address: Set("12 MG Road, Bengaluru".to_string()),
            total_amount: Set(total_amount),
            currency: Set("INR".to_string()),
            status: Set(OrderStatus::Confirmed.as_str().to_string()),
            payment_status: Set(PaymentStatus::Completed.as_str().to_string()),
            payment_method: Set(None),
            receipt_id: Set(format!(
                "rcpt_seeded_{}",
                &Uuid::new_v4().simple().to_string()[..8]
            )),
            razorpay_order_id: Set(Some(format!("order_seeded_{}", Uuid::new_v4().simple()))),
            razorpay_payment_id: Set(Some("pay_seeded".to_string())),
            razorpay_signature: Set(Some("sig_seeded".to_string())),
            shiprocket_order_id: Set(None),
            tracking_number: Set(None),
            invoice_url: Set(None),
            created_at: Set(created_at),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed order")
    }
}
