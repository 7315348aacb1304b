//! End-to-end tests for the order lifecycle: checkout creation (with its
//! compensating rollback), payment verification, and fulfillment status
//! transitions.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use std::str::FromStr;
use std::sync::atomic::Ordering;

use herbloom_api::entities::{order, order_item, product};
use herbloom_api::errors::ServiceError;
use herbloom_api::services::orders::{
    CreateOrderItemInput, CreateOrderRequest, OrderStatus, VerifyPaymentRequest,
};

fn order_request(
    user_id: uuid::Uuid,
    items: Vec<CreateOrderItemInput>,
    total: rust_decimal::Decimal,
) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id,
        customer_name: "Asha Rao".to_string(),
        customer_email: "asha@example.com".to_string(),
        customer_phone: "+919900112233".to_string(),
        shipping_address: "12 MG Road, Bengaluru 560001".to_string(),
        billing_address: "12 MG Road, Bengaluru 560001".to_string(),
        items,
        total_amount: total,
        shipping_charges: dec!(20),
        tax_amount: dec!(0),
        payment_method: Some("razorpay".to_string()),
    }
}

#[tokio::test]
async fn full_lifecycle_from_checkout_to_shipped() {
    let app = TestApp::new().await;
    let user = app.seed_profile("asha@example.com").await;
    let shampoo = app.seed_product("Amla Shampoo", dec!(150), 10).await;
    let oil = app.seed_product("Bhringraj Oil", dec!(100), 5).await;

    // ₹150 × 2 + ₹100 × 1 + ₹20 shipping = ₹420
    let request = order_request(
        user.id,
        vec![
            CreateOrderItemInput {
                product_id: shampoo.id,
                quantity: 2,
            },
            CreateOrderItemInput {
                product_id: oil.id,
                quantity: 1,
            },
        ],
        dec!(420),
    );

    let created = app
        .state
        .services
        .orders
        .create_order(request)
        .await
        .expect("order creation should succeed");

    // Gateway order opened for 42000 paise
    assert_eq!(created.razorpay_order.amount, 42_000);
    assert_eq!(created.razorpay_order.currency, "INR");
    assert!(created.razorpay_order.receipt.len() <= 40);
    let gateway_order = app.gateway.last_created().expect("gateway order recorded");
    assert_eq!(gateway_order.id, created.razorpay_order.id);

    // Order persisted as pending/pending with items attached
    let stored = order::Entity::find_by_id(created.order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("order row exists");
    assert_eq!(stored.status, "pending");
    assert_eq!(stored.payment_status, "pending");
    assert_eq!(stored.total_amount, dec!(420));
    let items = order_item::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(items.len(), 2);

    // Stock decremented best-effort
    let shampoo_after = product::Entity::find_by_id(shampoo.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shampoo_after.stock_quantity, 8);
    let oil_after = product::Entity::find_by_id(oil.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(oil_after.stock_quantity, 4);

    // Fulfillment before payment is rejected by the eligibility filter
    let premature = app
        .state
        .services
        .orders
        .update_order_status(created.order_id, OrderStatus::Shipped)
        .await;
    assert_matches!(premature, Err(ServiceError::NotEligibleForUpdate(_)));

    // Verify payment with a correctly signed callback
    let signature = app
        .verifier()
        .sign(&created.razorpay_order.id, "pay_test_0001");
    let verified = app
        .state
        .services
        .orders
        .verify_payment(VerifyPaymentRequest {
            order_id: created.order_id,
            razorpay_order_id: created.razorpay_order.id.clone(),
            razorpay_payment_id: "pay_test_0001".to_string(),
            razorpay_signature: signature,
        })
        .await
        .expect("verification should succeed");

    assert_eq!(verified.status, OrderStatus::Confirmed);
    assert_eq!(verified.total_amount, dec!(420));
    // Notification failure is captured, never fatal: no transports configured
    assert!(!verified.notifications.customer.success);

    // The same call now succeeds
    let shipped = app
        .state
        .services
        .orders
        .update_order_status(created.order_id, OrderStatus::Shipped)
        .await
        .expect("status update should succeed");
    assert_eq!(shipped.old_status, OrderStatus::Confirmed);
    assert_eq!(shipped.new_status, OrderStatus::Shipped);

    // A shipped order is terminal for this endpoint
    let second = app
        .state
        .services
        .orders
        .update_order_status(created.order_id, OrderStatus::Delivered)
        .await;
    assert_matches!(second, Err(ServiceError::NotEligibleForUpdate(_)));
}

#[tokio::test]
async fn amount_mismatch_is_rejected_within_tolerance_rules() {
    let app = TestApp::new().await;
    let user = app.seed_profile("amount@example.com").await;
    let product = app.seed_product("Neem Comb", dec!(100), 10).await;

    let items = |qty| {
        vec![CreateOrderItemInput {
            product_id: product.id,
            quantity: qty,
        }]
    };

    // calculated = 100 + 20 shipping = 120; off by 0.02 → rejected
    let result = app
        .state
        .services
        .orders
        .create_order(order_request(user.id, items(1), dec!(120.02)))
        .await;
    assert_matches!(result, Err(ServiceError::AmountMismatch(_)));

    // off by less than a paisa → accepted
    app.state
        .services
        .orders
        .create_order(order_request(user.id, items(1), dec!(120.009)))
        .await
        .expect("within tolerance should be accepted");
}

#[tokio::test]
async fn insufficient_stock_and_unknown_references_fail_closed() {
    let app = TestApp::new().await;
    let user = app.seed_profile("stock@example.com").await;
    let product = app.seed_product("Hibiscus Mask", dec!(50), 2).await;

    let result = app
        .state
        .services
        .orders
        .create_order(order_request(
            user.id,
            vec![CreateOrderItemInput {
                product_id: product.id,
                quantity: 3,
            }],
            dec!(170),
        ))
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    let result = app
        .state
        .services
        .orders
        .create_order(order_request(
            user.id,
            vec![CreateOrderItemInput {
                product_id: uuid::Uuid::new_v4(),
                quantity: 1,
            }],
            dec!(70),
        ))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));

    let result = app
        .state
        .services
        .orders
        .create_order(order_request(
            uuid::Uuid::new_v4(),
            vec![CreateOrderItemInput {
                product_id: product.id,
                quantity: 1,
            }],
            dec!(70),
        ))
        .await;
    assert_matches!(result, Err(ServiceError::InvalidUser(_)));
}

#[tokio::test]
async fn gateway_failure_aborts_without_persisting_anything() {
    let app = TestApp::new().await;
    let user = app.seed_profile("gateway@example.com").await;
    let product = app.seed_product("Rosemary Spray", dec!(250), 4).await;

    app.gateway.fail_create.store(true, Ordering::SeqCst);

    let result = app
        .state
        .services
        .orders
        .create_order(order_request(
            user.id,
            vec![CreateOrderItemInput {
                product_id: product.id,
                quantity: 1,
            }],
            dec!(270),
        ))
        .await;
    assert_matches!(result, Err(ServiceError::PaymentGateway { .. }));

    // No partial order survived the gateway failure
    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
    let stock = product::Entity::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity;
    assert_eq!(stock, 4);
}

#[tokio::test]
async fn cancellation_is_a_valid_transition_from_confirmed() {
    let app = TestApp::new().await;
    let user = app.seed_profile("cancel@example.com").await;
    let order = app
        .seed_paid_order(user.id, dec!(300), chrono::Utc::now())
        .await;

    let cancelled = app
        .state
        .services
        .orders
        .update_order_status(order.id, OrderStatus::Cancelled)
        .await
        .expect("cancellation should succeed");
    assert_eq!(cancelled.new_status, OrderStatus::Cancelled);

    // Pending/confirmed are not reachable through this endpoint
    let result = app
        .state
        .services
        .orders
        .update_order_status(order.id, OrderStatus::from_str("confirmed").unwrap())
        .await;
    assert_matches!(result, Err(ServiceError::InvalidStatus(_)));
}
