//! Payment reconciliation tests: signature gating, idempotent redelivery,
//! and state protection on rejection.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use herbloom_api::entities::order;
use herbloom_api::errors::ServiceError;
use herbloom_api::services::orders::{
    CreateOrderItemInput, CreateOrderRequest, CreateOrderResponse, OrderStatus,
    VerifyPaymentRequest,
};

async fn checkout(app: &TestApp) -> CreateOrderResponse {
    let user = app.seed_profile("verify@example.com").await;
    let product = app.seed_product("Shikakai Bar", dec!(200), 10).await;
    app.state
        .services
        .orders
        .create_order(CreateOrderRequest {
            user_id: user.id,
            customer_name: "Meera Iyer".to_string(),
            customer_email: "verify@example.com".to_string(),
            customer_phone: "+919900112233".to_string(),
            shipping_address: "4 Residency Road, Bengaluru".to_string(),
            billing_address: "4 Residency Road, Bengaluru".to_string(),
            items: vec![CreateOrderItemInput {
                product_id: product.id,
                quantity: 1,
            }],
            total_amount: dec!(220),
            shipping_charges: dec!(20),
            tax_amount: dec!(0),
            payment_method: None,
        })
        .await
        .expect("checkout should succeed")
}

#[tokio::test]
async fn verification_is_idempotent_under_redelivery() {
    let app = TestApp::new().await;
    let created = checkout(&app).await;

    let signature = app
        .verifier()
        .sign(&created.razorpay_order.id, "pay_idem_01");
    let request = || VerifyPaymentRequest {
        order_id: created.order_id,
        razorpay_order_id: created.razorpay_order.id.clone(),
        razorpay_payment_id: "pay_idem_01".to_string(),
        razorpay_signature: signature.clone(),
    };

    let first = app
        .state
        .services
        .orders
        .verify_payment(request())
        .await
        .expect("first verification succeeds");

    // The gateway may redeliver the callback; the second call converges on
    // the same state with no error.
    let second = app
        .state
        .services
        .orders
        .verify_payment(request())
        .await
        .expect("second verification succeeds");

    assert_eq!(first.status, second.status);
    assert_eq!(first.payment_status, second.payment_status);
    assert_eq!(first.total_amount, second.total_amount);

    let stored = order::Entity::find_by_id(created.order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "confirmed");
    assert_eq!(stored.payment_status, "completed");
    assert_eq!(stored.razorpay_payment_id.as_deref(), Some("pay_idem_01"));
}

#[tokio::test]
async fn tampered_signature_is_rejected_and_order_untouched() {
    let app = TestApp::new().await;
    let created = checkout(&app).await;

    let mut signature = app
        .verifier()
        .sign(&created.razorpay_order.id, "pay_tamper_01");
    // Flip one character
    let last = signature.pop().unwrap();
    signature.push(if last == '0' { '1' } else { '0' });

    let result = app
        .state
        .services
        .orders
        .verify_payment(VerifyPaymentRequest {
            order_id: created.order_id,
            razorpay_order_id: created.razorpay_order.id.clone(),
            razorpay_payment_id: "pay_tamper_01".to_string(),
            razorpay_signature: signature,
        })
        .await;
    assert_matches!(result, Err(ServiceError::InvalidSignature));

    // The order was not mutated on the failed path
    let stored = order::Entity::find_by_id(created.order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "pending");
    assert_eq!(stored.payment_status, "pending");
    assert_eq!(stored.razorpay_payment_id, None);
}

#[tokio::test]
async fn missing_fields_fail_validation_before_any_check() {
    let app = TestApp::new().await;
    let created = checkout(&app).await;

    let result = app
        .state
        .services
        .orders
        .verify_payment(VerifyPaymentRequest {
            order_id: created.order_id,
            razorpay_order_id: created.razorpay_order.id.clone(),
            razorpay_payment_id: String::new(),
            razorpay_signature: "sig".to_string(),
        })
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_order_id_fails_not_found_after_signature_passes() {
    let app = TestApp::new().await;
    let _ = checkout(&app).await;

    let signature = app.verifier().sign("order_unknown", "pay_x");
    let result = app
        .state
        .services
        .orders
        .verify_payment(VerifyPaymentRequest {
            order_id: uuid::Uuid::new_v4(),
            razorpay_order_id: "order_unknown".to_string(),
            razorpay_payment_id: "pay_x".to_string(),
            razorpay_signature: signature,
        })
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn signature_from_a_different_gateway_order_is_rejected() {
    let app = TestApp::new().await;
    let created = checkout(&app).await;

    // Validly signed pair, but for a gateway order that is not the one
    // attached to this order row.
    let signature = app.verifier().sign("order_other", "pay_cross_01");
    let result = app
        .state
        .services
        .orders
        .verify_payment(VerifyPaymentRequest {
            order_id: created.order_id,
            razorpay_order_id: "order_other".to_string(),
            razorpay_payment_id: "pay_cross_01".to_string(),
            razorpay_signature: signature,
        })
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn late_duplicate_does_not_regress_a_shipped_order() {
    let app = TestApp::new().await;
    let created = checkout(&app).await;

    let signature = app.verifier().sign(&created.razorpay_order.id, "pay_late");
    let request = || VerifyPaymentRequest {
        order_id: created.order_id,
        razorpay_order_id: created.razorpay_order.id.clone(),
        razorpay_payment_id: "pay_late".to_string(),
        razorpay_signature: signature.clone(),
    };

    app.state
        .services
        .orders
        .verify_payment(request())
        .await
        .unwrap();
    app.state
        .services
        .orders
        .update_order_status(created.order_id, OrderStatus::Shipped)
        .await
        .unwrap();

    // Redelivered callback after shipping: payment stays completed, status
    // stays shipped.
    let response = app
        .state
        .services
        .orders
        .verify_payment(request())
        .await
        .expect("late duplicate still succeeds");
    assert_eq!(response.status, OrderStatus::Shipped);

    let stored = order::Entity::find_by_id(created.order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "shipped");
}
