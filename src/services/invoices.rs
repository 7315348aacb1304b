//! Invoice rendering.
//!
//! Invoices are templated text over the persisted order; layout and PDF
//! conversion belong to the presentation layer. Generation is only allowed
//! once payment has completed.

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::order_item::Entity as OrderItemEntity,
    errors::ServiceError,
    services::orders::PaymentStatus,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvoiceDocument {
    pub order_id: Uuid,
    pub invoice_number: String,
    pub invoice_url: String,
    pub rendered: String,
}

#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Renders the invoice for a paid order and records its URL on the order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn generate_invoice(&self, order_id: Uuid) -> Result<InvoiceDocument, ServiceError> {
        let db = &*self.db_pool;
        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.payment_status != PaymentStatus::Completed.as_str() {
            return Err(ServiceError::ValidationError(
                "invoice is only available once payment has completed".to_string(),
            ));
        }

        let items = order
            .find_related(OrderItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let invoice_number = format!("INV-{}", order.receipt_id);
        let invoice_url = format!("/api/v1/orders/{}/invoice", order.id);

        let mut lines = Vec::new();
        lines.push("Herbloom Tax Invoice".to_string());
        lines.push(format!("Invoice: {}", invoice_number));
        lines.push(format!("Order: {}", order.id));
        lines.push(format!(
            "Date: {}",
            order.created_at.format("%Y-%m-%d %H:%M UTC")
        ));
        lines.push(format!("Billed to: {} <{}>", order.customer_name, order.customer_email));
        lines.push(format!("Ship to: {}", order.shipping_address));
        lines.push(String::new());
        for item in &items {
            lines.push(format!(
                "{} x{} @ {} {}",
                item.product_name, item.quantity, order.currency, item.unit_price
            ));
        }
        lines.push(String::new());
        lines.push(format!("Total: {} {}", order.currency, order.total_amount));
        let rendered = lines.join("\n");

        if order.invoice_url.as_deref() != Some(invoice_url.as_str()) {
            let mut active: order::ActiveModel = order.into();
            active.invoice_url = Set(Some(invoice_url.clone()));
            active.updated_at = Set(Some(Utc::now()));
            active.update(db).await.map_err(ServiceError::db_error)?;
        }

        info!(order_id = %order_id, invoice_number = %invoice_number, "invoice generated");

        Ok(InvoiceDocument {
            order_id,
            invoice_number,
            invoice_url,
            rendered,
        })
    }
}
