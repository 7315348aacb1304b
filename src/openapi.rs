use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::services::invoices::InvoiceDocument;
use crate::services::orders::{
    CreateOrderItemInput, CreateOrderRequest, CreateOrderResponse, GatewayOrderSummary,
    NotificationSummary, OrderItemResponse, OrderResponse, OrderStatus, PaymentStatus,
    UpdateOrderStatusRequest, UpdateOrderStatusResponse, VerifyPaymentRequest,
    VerifyPaymentResponse,
};
use crate::services::returns::{
    CreateReturnRequest, CreateReturnResponse, ReturnReason, ReturnResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Herbloom Commerce API",
        description = "Order lifecycle, payment reconciliation, returns, shipping and notifications for the Herbloom storefront"
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::payments::verify_payment,
        crate::handlers::returns::create_return,
        crate::handlers::invoices::generate_invoice,
    ),
    components(schemas(
        ErrorResponse,
        crate::handlers::orders::CreateOrderBody,
        crate::handlers::orders::CreateOrderItemBody,
        CreateOrderRequest,
        CreateOrderItemInput,
        CreateOrderResponse,
        GatewayOrderSummary,
        VerifyPaymentRequest,
        VerifyPaymentResponse,
        NotificationSummary,
        UpdateOrderStatusRequest,
        UpdateOrderStatusResponse,
        OrderResponse,
        OrderItemResponse,
        OrderStatus,
        PaymentStatus,
        CreateReturnRequest,
        CreateReturnResponse,
        ReturnReason,
        ReturnResponse,
        InvoiceDocument,
    )),
    tags(
        (name = "Orders", description = "Order creation and fulfillment"),
        (name = "Payments", description = "Payment verification and gateway passthrough"),
        (name = "Returns", description = "Return requests"),
        (name = "Invoices", description = "Invoice rendering"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs with the generated document at
/// /api-docs/openapi.json
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
