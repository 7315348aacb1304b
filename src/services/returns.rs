//! Return request workflow.
//!
//! The reason code is the single source of truth for refund policy: the
//! percentage and the photo-evidence requirement are derived server-side
//! from the table below, and any client-supplied percentage is ignored.

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::return_request::{self, Entity as ReturnEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::notifications::{EmailDispatcher, EmailMessage},
    services::orders::NotificationSummary,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Return reasons. Carrier/seller-fault reasons refund in full and require
/// photo evidence; customer-fault reasons refund at 60%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    DamagedShipping,
    DefectiveProduct,
    WrongItem,
    ChangeOfMind,
    WrongOrder,
}

impl ReturnReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DamagedShipping => "damaged_shipping",
            Self::DefectiveProduct => "defective_product",
            Self::WrongItem => "wrong_item",
            Self::ChangeOfMind => "change_of_mind",
            Self::WrongOrder => "wrong_order",
        }
    }

    /// Authoritative refund percentage for this reason.
    pub fn refund_percentage(&self) -> i32 {
        match self {
            Self::DamagedShipping | Self::DefectiveProduct | Self::WrongItem => 100,
            Self::ChangeOfMind | Self::WrongOrder => 60,
        }
    }

    /// Whether photo evidence must accompany the request.
    pub fn requires_photos(&self) -> bool {
        matches!(
            self,
            Self::DamagedShipping | Self::DefectiveProduct | Self::WrongItem
        )
    }

    /// Carrier-fault reasons get routed to expedited human review.
    pub fn is_carrier_fault(&self) -> bool {
        matches!(self, Self::DamagedShipping | Self::DefectiveProduct)
    }
}

impl fmt::Display for ReturnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReturnRequest {
    pub order_id: Uuid,
    pub reason: ReturnReason,
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Customer email must be valid"))]
    pub customer_email: String,
    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub customer_phone: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    /// Advisory only; the percentage is re-derived from the reason code.
    #[serde(default)]
    pub refund_percentage: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReturnResponse {
    pub return_id: Uuid,
    pub refund_percentage: i32,
    pub refund_amount: Decimal,
    pub notifications: NotificationSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReturnResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub photo_urls: Vec<String>,
    pub refund_percentage: i32,
    pub refund_amount: Decimal,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReturnListResponse {
    pub returns: Vec<ReturnResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing return requests
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    notifier: Arc<EmailDispatcher>,
    event_sender: Option<Arc<EventSender>>,
    return_window: Duration,
}

impl ReturnService {
    pub fn new(
        db_pool: Arc<DbPool>,
        notifier: Arc<EmailDispatcher>,
        event_sender: Option<Arc<EventSender>>,
        return_window_hours: i64,
    ) -> Self {
        Self {
            db_pool,
            notifier,
            event_sender,
            return_window: Duration::hours(return_window_hours),
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send lifecycle event");
            }
        }
    }

    /// Creates a return request against an order the requester owns, inside
    /// the return window.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, user_id = %user_id))]
    pub async fn create_return(
        &self,
        user_id: Uuid,
        request: CreateReturnRequest,
    ) -> Result<CreateReturnResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let order = OrderEntity::find_by_id(request.order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", request.order_id))
            })?;

        if order.user_id != user_id {
            return Err(ServiceError::Unauthorized(
                "order does not belong to the requesting user".to_string(),
            ));
        }

        let age = Utc::now() - order.created_at;
        if age > self.return_window {
            return Err(ServiceError::ReturnWindowExpired(format!(
                "returns are accepted within {} hours of order creation",
                self.return_window.num_hours()
            )));
        }

        // Server-side policy derivation; request.refund_percentage is ignored
        let refund_percentage = request.reason.refund_percentage();
        if request.reason.requires_photos() && request.photo_urls.is_empty() {
            return Err(ServiceError::PhotosRequired(format!(
                "reason {} requires photo evidence",
                request.reason
            )));
        }

        let refund_amount =
            (order.total_amount * Decimal::from(refund_percentage) / dec!(100)).round_dp(2);

        let admin_notes = if request.reason.is_carrier_fault() {
            // Routing hint for expedited human review, not an automatic refund
            Some(format!(
                "PRIORITY: carrier-fault reason ({}); expedite review",
                request.reason
            ))
        } else {
            None
        };

        let now = Utc::now();
        let return_id = Uuid::new_v4();
        let model = return_request::ActiveModel {
            id: Set(return_id),
            order_id: Set(order.id),
            user_id: Set(user_id),
            customer_name: Set(request.customer_name.clone()),
            customer_email: Set(request.customer_email.clone()),
            customer_phone: Set(request.customer_phone.clone()),
            reason: Set(request.reason.as_str().to_string()),
            photo_urls: Set(json!(request.photo_urls)),
            refund_percentage: Set(refund_percentage),
            refund_amount: Set(refund_amount),
            status: Set("pending".to_string()),
            admin_notes: Set(admin_notes.clone()),
            created_at: Set(now),
            updated_at: Set(None),
        };

        model.insert(db).await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "failed to persist return request");
            ServiceError::db_error(e)
        })?;

        info!(return_id = %return_id, order_id = %order.id, reason = %request.reason, "return request created");
        self.emit(Event::ReturnCreated(return_id)).await;

        let customer = self
            .notifier
            .send_email_safe(&EmailMessage {
                to: request.customer_email.clone(),
                subject: "We received your return request".to_string(),
                text_body: format!(
                    "Hi {},\n\nYour return for order {} was received and is pending review. Expected refund: {} {} ({}%).\n\nWith love,\nHerbloom",
                    request.customer_name, order.receipt_id, order.currency, refund_amount, refund_percentage
                ),
            })
            .await;
        let admin = self
            .notifier
            .notify_admin_safe(
                "Return requested",
                json!({
                    "return_id": return_id,
                    "order_id": order.id,
                    "reason": request.reason.as_str(),
                    "refund_amount": refund_amount,
                    "priority": request.reason.is_carrier_fault(),
                    "admin_notes": admin_notes,
                }),
            )
            .await;

        Ok(CreateReturnResponse {
            return_id,
            refund_percentage,
            refund_amount,
            notifications: NotificationSummary { customer, admin },
        })
    }

    /// Gets a return request by id.
    #[instrument(skip(self))]
    pub async fn get_return(&self, return_id: Uuid) -> Result<ReturnResponse, ServiceError> {
        let db = &*self.db_pool;
        let model = ReturnEntity::find_by_id(return_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))?;

        Ok(Self::model_to_response(model))
    }

    /// Lists return requests, newest first.
    #[instrument(skip(self))]
    pub async fn list_returns(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ReturnListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = ReturnEntity::find()
            .order_by_desc(return_request::Column::CreatedAt)
            .paginate(db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let returns = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok(ReturnListResponse {
            returns: returns.into_iter().map(Self::model_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Lists return requests filed against one order.
    #[instrument(skip(self))]
    pub async fn list_returns_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<ReturnResponse>, ServiceError> {
        let db = &*self.db_pool;
        let returns = ReturnEntity::find()
            .filter(return_request::Column::OrderId.eq(order_id))
            .order_by_desc(return_request::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(returns.into_iter().map(Self::model_to_response).collect())
    }

    fn model_to_response(model: return_request::Model) -> ReturnResponse {
        let photo_urls = serde_json::from_value(model.photo_urls.clone()).unwrap_or_default();
        ReturnResponse {
            id: model.id,
            order_id: model.order_id,
            user_id: model.user_id,
            reason: model.reason,
            photo_urls,
            refund_percentage: model.refund_percentage,
            refund_amount: model.refund_amount,
            status: model.status,
            admin_notes: model.admin_notes,
            created_at: model.created_at,
        }
    }
}
