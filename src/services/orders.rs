//! Order orchestration: checkout creation, payment reconciliation and
//! fulfillment status transitions.
//!
//! Order creation is a short saga: the gateway call cannot join a local
//! database transaction, so a failed step after it compensates explicitly
//! (the order row is deleted if its items cannot be inserted). Stock
//! decrement and notifications are best-effort side channels and never fail
//! the primary operation.

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    entities::profile::Entity as ProfileEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    services::notifications::{EmailDispatcher, EmailMessage, EmailOutcome},
    services::razorpay::{PaymentGateway, MAX_RECEIPT_LEN},
    services::signature::PaymentSignatureVerifier,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Orders whose recomputed total differs from the submitted one by more than
/// this are rejected; anything inside absorbs floating-point rounding from
/// the storefront.
pub const AMOUNT_TOLERANCE: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(ServiceError::InvalidStatus(format!(
                "Unknown order status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate_positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must be greater than 0".into());
        Err(err)
    }
}

fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must not be negative".into());
        Err(err)
    }
}

/// Request/Response types for the order service
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Customer email must be valid"))]
    pub customer_email: String,
    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub customer_phone: String,
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, message = "Billing address is required"))]
    pub billing_address: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CreateOrderItemInput>,
    #[validate(custom = "validate_positive_decimal")]
    pub total_amount: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_decimal")]
    pub shipping_charges: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_decimal")]
    pub tax_amount: Decimal,
    pub payment_method: Option<String>,
}

/// The gateway order handed back to the storefront for checkout completion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayOrderSummary {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    pub razorpay_order: GatewayOrderSummary,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, message = "Gateway order id is required"))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1, message = "Gateway payment id is required"))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1, message = "Signature is required"))]
    pub razorpay_signature: String,
}

/// Best-effort notification outcomes attached to the operation result so
/// callers can inspect side-channel failures without blocking on them.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationSummary {
    pub customer: EmailOutcome,
    pub admin: EmailOutcome,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub notifications: NotificationSummary,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusResponse {
    pub order_id: Uuid,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub notification: EmailOutcome,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: Decimal,
    pub currency: String,
    pub receipt_id: String,
    pub razorpay_order_id: Option<String>,
    pub tracking_number: Option<String>,
    pub invoice_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Generates a gateway receipt id: unique with high probability and inside
/// the gateway's 40-character bound.
pub fn generate_receipt_id() -> String {
    let receipt = format!(
        "rcpt_{}_{:08x}",
        Utc::now().timestamp_millis(),
        rand::thread_rng().gen::<u32>()
    );
    debug_assert!(receipt.len() <= MAX_RECEIPT_LEN);
    receipt
}

/// Converts a decimal rupee amount to paise for the gateway boundary.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * dec!(100)).round().to_i64().ok_or_else(|| {
        ServiceError::InvalidInput(format!("amount {} cannot be expressed in paise", amount))
    })
}

/// Orchestrates the order lifecycle against the database, the payment
/// gateway, and the notification dispatcher.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: PaymentSignatureVerifier,
    notifier: Arc<EmailDispatcher>,
    event_sender: Option<Arc<EventSender>>,
    currency: String,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: PaymentSignatureVerifier,
        notifier: Arc<EmailDispatcher>,
        event_sender: Option<Arc<EventSender>>,
        currency: String,
    ) -> Self {
        Self {
            db_pool,
            gateway,
            verifier,
            notifier,
            event_sender,
            currency,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send lifecycle event");
            }
        }
    }

    /// Creates an order: validates stock and pricing, opens a gateway order,
    /// persists the order and its items, and decrements stock best-effort.
    ///
    /// No partial order survives a failure: a gateway error aborts before
    /// anything is persisted, and an item-insert failure deletes the order
    /// row that was just created.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;

        let user = ProfileEntity::find_by_id(request.user_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if user.is_none() {
            return Err(ServiceError::InvalidUser(format!(
                "User {} does not exist",
                request.user_id
            )));
        }

        // Batch-load every referenced product, then check existence and stock
        let product_ids: Vec<Uuid> = request.items.iter().map(|i| i.product_id).collect();
        let products = ProductEntity::find()
            .filter(product::Column::Id.is_in(product_ids.clone()))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut calculated_total = request.shipping_charges + request.tax_amount;
        let mut line_items: Vec<(product::Model, i32)> = Vec::with_capacity(request.items.len());
        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
            let product = products
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;
            if !product.is_active {
                return Err(ServiceError::NotFound(format!(
                    "Product {} is no longer available",
                    item.product_id
                )));
            }
            if product.stock_quantity < item.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "{}: requested {}, available {}",
                    product.name, item.quantity, product.stock_quantity
                )));
            }
            calculated_total += product.price * Decimal::from(item.quantity);
            line_items.push((product.clone(), item.quantity));
        }

        if (calculated_total - request.total_amount).abs() > AMOUNT_TOLERANCE {
            return Err(ServiceError::AmountMismatch(format!(
                "submitted total {} does not match calculated total {}",
                request.total_amount, calculated_total
            )));
        }

        let receipt_id = generate_receipt_id();
        let amount_minor = to_minor_units(request.total_amount)?;

        // The gateway call happens before any row exists, so a gateway
        // failure aborts the whole operation with nothing to clean up.
        let gateway_order = self
            .gateway
            .create_order(
                amount_minor,
                &self.currency,
                &receipt_id,
                Some(json!({
                    "customer_email": request.customer_email,
                    "customer_name": request.customer_name,
                })),
            )
            .await
            .map_err(|e| {
                error!(error = %e, "payment gateway order creation failed");
                ServiceError::from(e)
            })?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let order_model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(request.user_id),
            customer_name: Set(request.customer_name.clone()),
            customer_email: Set(request.customer_email.clone()),
            customer_phone: Set(request.customer_phone.clone()),
            shipping_address: Set(request.shipping_address.clone()),
            billing_address: Set(request.billing_address.clone()),
            total_amount: Set(request.total_amount),
            currency: Set(self.currency.clone()),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
            payment_method: Set(request.payment_method.clone()),
            receipt_id: Set(receipt_id.clone()),
            razorpay_order_id: Set(Some(gateway_order.id.clone())),
            razorpay_payment_id: Set(None),
            razorpay_signature: Set(None),
            shiprocket_order_id: Set(None),
            tracking_number: Set(None),
            invoice_url: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        order_model.insert(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to persist order");
            ServiceError::db_error(e)
        })?;

        let item_models: Vec<order_item::ActiveModel> = line_items
            .iter()
            .map(|(product, quantity)| order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                unit_price: Set(product.price),
                quantity: Set(*quantity),
                created_at: Set(now),
            })
            .collect();

        if let Err(e) = OrderItemEntity::insert_many(item_models).exec(db).await {
            // Items are mandatory for a valid order: compensate by removing
            // the order row that was just created.
            error!(error = %e, order_id = %order_id, "order item insert failed; rolling back order");
            if let Err(del) = OrderEntity::delete_by_id(order_id).exec(db).await {
                error!(error = %del, order_id = %order_id, "compensating order delete failed");
            }
            return Err(ServiceError::OrderItemsCreationFailed(e.to_string()));
        }

        // Stock accuracy is eventually consistent: a decrement failure is
        // logged and reported, never rolled into the checkout result.
        for (product_model, quantity) in &line_items {
            let result = ProductEntity::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(*quantity),
                )
                .filter(product::Column::Id.eq(product_model.id))
                .filter(product::Column::StockQuantity.gte(*quantity))
                .exec(db)
                .await;

            let failed = match result {
                Ok(res) => res.rows_affected == 0,
                Err(e) => {
                    warn!(error = %e, product_id = %product_model.id, "stock decrement errored");
                    true
                }
            };
            if failed {
                warn!(
                    order_id = %order_id,
                    product_id = %product_model.id,
                    quantity = quantity,
                    "stock decrement skipped; counts may drift"
                );
                self.emit(Event::StockDecrementFailed {
                    order_id,
                    product_id: product_model.id,
                    quantity: *quantity,
                })
                .await;
            }
        }

        info!(order_id = %order_id, gateway_order_id = %gateway_order.id, "order created");
        self.emit(Event::OrderCreated(order_id)).await;

        Ok(CreateOrderResponse {
            order_id,
            razorpay_order: GatewayOrderSummary {
                id: gateway_order.id,
                amount: amount_minor,
                currency: self.currency.clone(),
                receipt: receipt_id,
            },
        })
    }

    /// Reconciles a payment callback.
    ///
    /// The signature check is the sole authenticity gate on this path; on
    /// mismatch the order is left untouched. The confirming update writes
    /// idempotent values, so a redelivered callback converges on the same
    /// state without error.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn verify_payment(
        &self,
        request: VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        request.validate()?;

        if !self.verifier.verify(
            &request.razorpay_order_id,
            &request.razorpay_payment_id,
            &request.razorpay_signature,
        ) {
            warn!(order_id = %request.order_id, "payment signature mismatch");
            return Err(ServiceError::InvalidSignature);
        }

        let db = &*self.db_pool;
        let order = OrderEntity::find_by_id(request.order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", request.order_id))
            })?;

        if let Some(existing) = &order.razorpay_order_id {
            if existing != &request.razorpay_order_id {
                return Err(ServiceError::ValidationError(format!(
                    "gateway order id does not belong to order {}",
                    request.order_id
                )));
            }
        }

        let current_status =
            OrderStatus::from_str(&order.status).unwrap_or(OrderStatus::Pending);

        let mut active: order::ActiveModel = order.clone().into();
        active.payment_status = Set(PaymentStatus::Completed.as_str().to_string());
        // Status only moves forward: a late duplicate callback on an order
        // that already shipped must not drag it back to confirmed.
        if current_status == OrderStatus::Pending {
            active.status = Set(OrderStatus::Confirmed.as_str().to_string());
        }
        active.razorpay_payment_id = Set(Some(request.razorpay_payment_id.clone()));
        active.razorpay_signature = Set(Some(request.razorpay_signature.clone()));
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, order_id = %request.order_id, "failed to confirm order");
            ServiceError::db_error(e)
        })?;

        info!(order_id = %updated.id, payment_id = %request.razorpay_payment_id, "payment verified");
        self.emit(Event::PaymentVerified(updated.id)).await;

        // Notifications are a side channel: partial or total failure is
        // captured in the response and never rolls back the confirmation.
        let customer = self
            .notifier
            .send_email_safe(&EmailMessage {
                to: updated.customer_email.clone(),
                subject: format!("Your Herbloom order is confirmed ({})", updated.receipt_id),
                text_body: format!(
                    "Hi {},\n\nWe received your payment of {} {}. Your order is confirmed and will ship soon.\n\nWith love,\nHerbloom",
                    updated.customer_name, updated.currency, updated.total_amount
                ),
            })
            .await;
        let admin = self
            .notifier
            .notify_admin_safe(
                "Order paid",
                json!({
                    "order_id": updated.id,
                    "amount": updated.total_amount,
                    "currency": updated.currency,
                    "customer_email": updated.customer_email,
                }),
            )
            .await;

        Ok(VerifyPaymentResponse {
            order_id: updated.id,
            status: OrderStatus::from_str(&updated.status)?,
            payment_status: PaymentStatus::Completed,
            total_amount: updated.total_amount,
            notifications: NotificationSummary { customer, admin },
        })
    }

    /// Moves a paid, confirmed order into fulfillment or cancellation.
    ///
    /// Eligibility is enforced by the query filter rather than a lock: an
    /// order that is unpaid, unknown, or already terminal simply does not
    /// match, which also makes concurrent duplicate updates converge.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<UpdateOrderStatusResponse, ServiceError> {
        if !matches!(
            new_status,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "status must be one of shipped, delivered, cancelled; got {}",
                new_status
            )));
        }

        let db = &*self.db_pool;
        let order = OrderEntity::find()
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Confirmed.as_str()))
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::Completed.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotEligibleForUpdate(format!(
                    "Order {} is missing, unpaid, or already in a terminal state",
                    order_id
                ))
            })?;

        let old_status = OrderStatus::from_str(&order.status)?;
        let customer_name = order.customer_name.clone();
        let customer_email = order.customer_email.clone();
        let total_amount = order.total_amount;
        let currency = order.currency.clone();
        let item_count = order
            .find_related(OrderItemEntity)
            .count(db)
            .await
            .unwrap_or(0);

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to update order status");
            ServiceError::db_error(e)
        })?;

        info!(order_id = %order_id, old_status = %old_status, new_status = %new_status, "order status updated");
        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status: old_status.to_string(),
            new_status: new_status.to_string(),
        })
        .await;
        if new_status == OrderStatus::Cancelled {
            self.emit(Event::OrderCancelled(order_id)).await;
        }

        let notification = self
            .notifier
            .send_email_safe(&EmailMessage {
                to: customer_email,
                subject: format!("Your Herbloom order is {}", new_status),
                text_body: format!(
                    "Hi {},\n\nYour order ({} item(s), {} {}) moved from {} to {}.\n\nWith love,\nHerbloom",
                    customer_name, item_count, currency, total_amount, old_status, new_status
                ),
            })
            .await;

        Ok(UpdateOrderStatusResponse {
            order_id: updated.id,
            old_status,
            new_status,
            notification,
        })
    }

    /// Retrieves an order with its line items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order
            .find_related(OrderItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Self::model_to_response(order, items))
    }

    /// Lists orders belonging to a user, newest first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = order
                .find_related(OrderItemEntity)
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            responses.push(Self::model_to_response(order, items));
        }

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }

    fn model_to_response(model: order::Model, items: Vec<order_item::Model>) -> OrderResponse {
        OrderResponse {
            id: model.id,
            user_id: model.user_id,
            customer_name: model.customer_name,
            customer_email: model.customer_email,
            status: model.status,
            payment_status: model.payment_status,
            total_amount: model.total_amount,
            currency: model.currency,
            receipt_id: model.receipt_id,
            razorpay_order_id: model.razorpay_order_id,
            tracking_number: model.tracking_number,
            invoice_url: model.invoice_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
            items: items
                .into_iter()
                .map(|item| OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_id_stays_inside_gateway_bound() {
        for _ in 0..32 {
            let receipt = generate_receipt_id();
            assert!(receipt.len() <= MAX_RECEIPT_LEN, "{} too long", receipt);
            assert!(receipt.starts_with("rcpt_"));
        }
    }

    #[test]
    fn receipt_ids_differ_between_calls() {
        let a = generate_receipt_id();
        let b = generate_receipt_id();
        assert_ne!(a, b);
    }

    #[test]
    fn rupees_convert_to_paise_at_the_gateway_boundary() {
        assert_eq!(to_minor_units(dec!(420)).unwrap(), 42_000);
        assert_eq!(to_minor_units(dec!(499.50)).unwrap(), 49_950);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    }

    #[test]
    fn amount_tolerance_boundary() {
        let calculated = dec!(420.00);
        assert!((calculated - dec!(420.009)).abs() <= AMOUNT_TOLERANCE);
        assert!((calculated - dec!(419.995)).abs() <= AMOUNT_TOLERANCE);
        assert!((calculated - dec!(420.02)).abs() > AMOUNT_TOLERANCE);
        assert!((calculated - dec!(419.98)).abs() > AMOUNT_TOLERANCE);
    }

    #[test]
    fn order_status_parses_both_spellings_of_cancelled() {
        assert_eq!(
            OrderStatus::from_str("canceled").unwrap(),
            OrderStatus::Cancelled
        );
        assert_eq!(
            OrderStatus::from_str("CANCELLED").unwrap(),
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(OrderStatus::from_str("refunded").is_err());
    }

    #[test]
    fn create_order_request_requires_items_and_positive_total() {
        let request = CreateOrderRequest {
            user_id: Uuid::new_v4(),
            customer_name: "Asha".to_string(),
            customer_email: "asha@example.com".to_string(),
            customer_phone: "+919900112233".to_string(),
            shipping_address: "12 MG Road, Bengaluru".to_string(),
            billing_address: "12 MG Road, Bengaluru".to_string(),
            items: vec![],
            total_amount: dec!(100),
            shipping_charges: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            payment_method: None,
        };
        assert!(request.validate().is_err());

        let request = CreateOrderRequest {
            items: vec![CreateOrderItemInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
            }],
            total_amount: Decimal::ZERO,
            ..request
        };
        assert!(request.validate().is_err());
    }
}
