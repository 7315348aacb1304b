pub mod common;
pub mod invoices;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod returns;
pub mod shipping;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::invoices::InvoiceService;
use crate::services::notifications::EmailDispatcher;
use crate::services::orders::OrderService;
use crate::services::razorpay::PaymentGateway;
use crate::services::returns::ReturnService;
use crate::services::shiprocket::ShiprocketClient;
use crate::services::signature::PaymentSignatureVerifier;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
///
/// Every external collaborator (gateway, shipping provider, notifier) is an
/// explicitly constructed, injected object so tests can substitute fakes.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub returns: Arc<ReturnService>,
    pub invoices: Arc<InvoiceService>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub shiprocket: Arc<ShiprocketClient>,
    pub notifications: Arc<EmailDispatcher>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        cfg: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<EmailDispatcher>,
    ) -> Self {
        let verifier = PaymentSignatureVerifier::new(cfg.razorpay_key_secret.clone());
        let shiprocket = Arc::new(ShiprocketClient::from_app_config(cfg));

        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            gateway.clone(),
            verifier,
            notifications.clone(),
            event_sender.clone(),
            cfg.default_currency.clone(),
        ));
        let returns = Arc::new(ReturnService::new(
            db_pool.clone(),
            notifications.clone(),
            event_sender,
            cfg.return_window_hours,
        ));
        let invoices = Arc::new(InvoiceService::new(db_pool));

        Self {
            orders,
            returns,
            invoices,
            gateway,
            shiprocket,
            notifications,
        }
    }
}
