//! End-to-end checkout pipeline tests over SQLite storage.
//!
//! Run with: cargo test --test checkout_sqlite --features sqlite
//!
//! Uses in-memory databases, no external dependencies required.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use till::checkout::{CheckoutError, CheckoutService, CheckoutSettings};
use till::gateway::mock::MockPaymentGateway;
use till::interfaces::{
    CartStorage, Catalog, GatewayError, OrderNotifications, OrderStorage, PaymentGateway,
};
use till::storage::{SqliteCartStorage, SqliteCatalog, SqliteOrderStorage};
use till::sync::CartSyncService;
use till::types::{
    CartLine, CatalogEntry, OrderStatus, PaymentIntent, PaymentStatus, ValidationWarning,
};

async fn connect() -> SqlitePool {
    // One connection: every handle must see the same in-memory database.
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite")
}

struct Fixture {
    cart: Arc<SqliteCartStorage>,
    orders: Arc<SqliteOrderStorage>,
    catalog: Arc<SqliteCatalog>,
}

async fn setup(pool: &SqlitePool) -> Fixture {
    let cart = Arc::new(SqliteCartStorage::new(pool.clone()));
    cart.init().await.expect("Failed to init cart storage");

    let orders = Arc::new(SqliteOrderStorage::new(pool.clone()));
    orders.init().await.expect("Failed to init order storage");

    let catalog = Arc::new(SqliteCatalog::new(pool.clone()));
    catalog
        .seed_products(&[
            entry("mug", 1500, true),
            entry("kettle", 2000, true),
            entry("spoon", 300, false),
        ])
        .await
        .expect("Failed to seed catalog");

    Fixture {
        cart,
        orders,
        catalog,
    }
}

fn entry(product_id: &str, price: i64, in_stock: bool) -> CatalogEntry {
    CatalogEntry {
        product_id: product_id.to_string(),
        price_cents: price,
        in_stock,
        name: format!("Product {product_id}"),
        image_url: None,
    }
}

fn client_line(product_id: &str, price: i64, quantity: i64) -> CartLine {
    CartLine {
        product_id: product_id.to_string(),
        name: format!("Product {product_id}"),
        image_url: None,
        unit_price_cents: price,
        original_price_cents: None,
        quantity,
    }
}

fn checkout_service(fixture: &Fixture, gateway: Arc<MockPaymentGateway>) -> CheckoutService {
    CheckoutService::new(
        Arc::clone(&fixture.catalog) as Arc<dyn Catalog>,
        Arc::clone(&fixture.orders) as Arc<dyn OrderStorage>,
        gateway,
        CheckoutSettings::default(),
    )
}

#[tokio::test]
async fn test_persist_hydrate_checkout_round_trip() {
    let pool = connect().await;
    let fixture = setup(&pool).await;

    let sync = CartSyncService::new(
        Arc::clone(&fixture.cart) as Arc<dyn CartStorage>,
        Arc::clone(&fixture.catalog) as Arc<dyn Catalog>,
    );

    // Client prices are stale on purpose; hydration must refresh them.
    sync.persist(
        "u1",
        &[client_line("mug", 999, 2), client_line("kettle", 999, 1)],
        None,
    )
    .await
    .expect("Failed to persist cart");

    let lines = sync.hydrate("u1").await.expect("Failed to hydrate cart");
    assert_eq!(lines.len(), 2);
    let mug = lines
        .iter()
        .find(|l| l.product_id == "mug")
        .expect("mug missing after hydration");
    assert_eq!(mug.unit_price_cents, 1500);
    assert_eq!(mug.quantity, 2);

    let gateway = Arc::new(MockPaymentGateway::new());
    gateway
        .push_response(Ok(PaymentIntent {
            intent_id: "pi_1".to_string(),
            client_secret: "pi_1_secret".to_string(),
        }))
        .await;

    let service = checkout_service(&fixture, Arc::clone(&gateway));
    let receipt = service
        .checkout("u1", &lines, None)
        .await
        .expect("Checkout failed");

    // 2 * 1500 + 2000 = 5000 subtotal, 500 discount at the $50 tier.
    assert_eq!(receipt.total_cents, 4500);
    assert_eq!(receipt.intent_id, "pi_1");
    assert!(receipt.warnings.is_empty());

    // Gateway was asked for the discounted amount, not the subtotal.
    let calls = gateway.take_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, 4500);
    assert_eq!(calls[0].2, "usd");

    let order = fixture
        .orders
        .read_order(&receipt.order_id)
        .await
        .expect("Failed to read order");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.subtotal_cents, 5000);
    assert_eq!(order.discount_cents, 500);
    assert_eq!(order.total_cents, 4500);
    assert_eq!(order.payment_intent_ref.as_deref(), Some("pi_1"));

    let order_lines = fixture
        .orders
        .read_order_lines(&receipt.order_id)
        .await
        .expect("Failed to read order lines");
    assert_eq!(order_lines.len(), 2);
    let mug_line = order_lines
        .iter()
        .find(|l| l.product_id == "mug")
        .expect("mug line missing");
    assert_eq!(mug_line.unit_price_cents, 1500);
    assert_eq!(mug_line.line_total_cents, 3000);
}

#[tokio::test]
async fn test_stale_price_and_out_of_stock_warnings() {
    let pool = connect().await;
    let fixture = setup(&pool).await;

    let gateway = Arc::new(MockPaymentGateway::new());
    let service = checkout_service(&fixture, Arc::clone(&gateway));

    // Stale client price on the mug, out-of-stock spoon, unknown product.
    let lines = vec![
        client_line("mug", 1200, 1),
        client_line("spoon", 300, 2),
        client_line("ghost", 100, 1),
    ];

    let receipt = service
        .checkout("u1", &lines, None)
        .await
        .expect("Checkout failed");

    // The unknown product is dropped; the out-of-stock spoon is kept; the
    // mug is charged at the catalog price. 1500 + 2 * 300 = 2100.
    assert_eq!(receipt.total_cents, 2100);
    assert_eq!(receipt.warnings.len(), 3);
    assert!(receipt.warnings.iter().any(|w| matches!(
        w,
        ValidationWarning::StalePrice {
            client_price_cents: 1200,
            catalog_price_cents: 1500,
            ..
        }
    )));
    assert!(receipt
        .warnings
        .iter()
        .any(|w| matches!(w, ValidationWarning::OutOfStock { .. })));
    assert!(receipt
        .warnings
        .iter()
        .any(|w| matches!(w, ValidationWarning::MissingProduct { .. })));

    let order = fixture
        .orders
        .read_order(&receipt.order_id)
        .await
        .expect("Failed to read order");
    assert_eq!(order.total_cents, 2100);

    let order_lines = fixture
        .orders
        .read_order_lines(&receipt.order_id)
        .await
        .expect("Failed to read order lines");
    assert_eq!(order_lines.len(), 2);
}

#[tokio::test]
async fn test_subset_checkout_charges_selected_lines_only() {
    let pool = connect().await;
    let fixture = setup(&pool).await;

    let gateway = Arc::new(MockPaymentGateway::new());
    let service = checkout_service(&fixture, Arc::clone(&gateway));

    let lines = vec![client_line("mug", 1500, 2), client_line("kettle", 2000, 1)];
    let subset = vec!["kettle".to_string()];

    let receipt = service
        .checkout("u1", &lines, Some(&subset))
        .await
        .expect("Checkout failed");

    assert_eq!(receipt.total_cents, 2000);

    let order_lines = fixture
        .orders
        .read_order_lines(&receipt.order_id)
        .await
        .expect("Failed to read order lines");
    assert_eq!(order_lines.len(), 1);
    assert_eq!(order_lines[0].product_id, "kettle");
}

#[tokio::test]
async fn test_gateway_rejection_leaves_draft_order() {
    let pool = connect().await;
    let fixture = setup(&pool).await;

    let gateway = Arc::new(MockPaymentGateway::new());
    gateway
        .push_response(Err(GatewayError::Rejected("card declined".to_string())))
        .await;

    let service = checkout_service(&fixture, Arc::clone(&gateway));
    let lines = vec![client_line("mug", 1500, 1)];

    let err = service
        .checkout("u1", &lines, None)
        .await
        .expect_err("Checkout should fail on gateway rejection");

    let order_id = match err {
        CheckoutError::Gateway { order_id, .. } => order_id,
        other => panic!("Expected gateway error, got {other:?}"),
    };

    // Rejections are not retried.
    assert_eq!(gateway.call_count().await, 1);

    // The draft stays behind for audit, untouched by payment state.
    let order = fixture
        .orders
        .read_order(&order_id)
        .await
        .expect("Draft order missing");
    assert_eq!(order.status, OrderStatus::Draft);
    assert_eq!(order.payment_status, PaymentStatus::None);
    assert_eq!(order.payment_intent_ref, None);

    // A retried checkout is a fresh attempt with its own order.
    gateway
        .push_response(Ok(PaymentIntent {
            intent_id: "pi_2".to_string(),
            client_secret: "pi_2_secret".to_string(),
        }))
        .await;
    let receipt = service
        .checkout("u1", &lines, None)
        .await
        .expect("Retried checkout failed");
    assert_ne!(receipt.order_id, order_id);
}

#[tokio::test]
async fn test_transient_gateway_failure_is_retried() {
    let pool = connect().await;
    let fixture = setup(&pool).await;

    let gateway = Arc::new(MockPaymentGateway::new());
    gateway
        .push_response(Err(GatewayError::Transport("connection reset".to_string())))
        .await;
    gateway
        .push_response(Ok(PaymentIntent {
            intent_id: "pi_3".to_string(),
            client_secret: "pi_3_secret".to_string(),
        }))
        .await;

    let service = checkout_service(&fixture, Arc::clone(&gateway));
    let receipt = service
        .checkout("u1", &[client_line("mug", 1500, 1)], None)
        .await
        .expect("Checkout failed");

    assert_eq!(receipt.intent_id, "pi_3");
    assert_eq!(gateway.call_count().await, 2);
}

#[tokio::test]
async fn test_empty_verified_selection_writes_nothing() {
    let pool = connect().await;
    let fixture = setup(&pool).await;

    let gateway = Arc::new(MockPaymentGateway::new());
    let service = checkout_service(&fixture, Arc::clone(&gateway));

    // Nothing survives verification.
    let err = service
        .checkout("u1", &[client_line("ghost", 100, 1)], None)
        .await
        .expect_err("Checkout should fail with nothing to charge");

    assert!(matches!(err, CheckoutError::EmptyCheckout { .. }));
    assert_eq!(gateway.call_count().await, 0);
}

#[tokio::test]
async fn test_intent_ref_set_at_most_once() {
    let pool = connect().await;
    let fixture = setup(&pool).await;

    let gateway = Arc::new(MockPaymentGateway::new());
    let service = checkout_service(&fixture, Arc::clone(&gateway));

    let receipt = service
        .checkout("u1", &[client_line("mug", 1500, 1)], None)
        .await
        .expect("Checkout failed");

    let err = fixture
        .orders
        .update_order(
            &receipt.order_id,
            till::interfaces::OrderPatch {
                status: None,
                payment_status: None,
                payment_intent_ref: Some("pi_other".to_string()),
            },
        )
        .await
        .expect_err("Second intent write should be rejected");
    assert!(matches!(
        err,
        till::interfaces::StorageError::IntentAlreadySet { .. }
    ));

    let order = fixture
        .orders
        .read_order(&receipt.order_id)
        .await
        .expect("Failed to read order");
    assert_eq!(
        order.payment_intent_ref.as_deref(),
        Some(receipt.intent_id.as_str())
    );
}

#[tokio::test]
async fn test_facade_end_to_end_with_reconciliation() {
    use till::notify::ChannelOrderNotifications;
    use till::reconcile::WatchEnd;
    use till::Till;

    let pool = connect().await;
    let fixture = setup(&pool).await;

    let gateway = Arc::new(MockPaymentGateway::new());
    let hub = Arc::new(ChannelOrderNotifications::new());

    let till = Till::builder()
        .with_cart_storage(Arc::clone(&fixture.cart) as Arc<dyn CartStorage>)
        .with_order_storage(Arc::clone(&fixture.orders) as Arc<dyn OrderStorage>)
        .with_catalog(Arc::clone(&fixture.catalog) as Arc<dyn Catalog>)
        .with_gateway(Arc::clone(&gateway) as Arc<dyn PaymentGateway>)
        .with_notifications(Arc::clone(&hub) as Arc<dyn OrderNotifications>)
        .build()
        .await
        .expect("Failed to build facade");

    till.persist_cart("u1", &[client_line("mug", 1500, 1)], None)
        .await
        .expect("Failed to persist cart");

    let receipt = till
        .prepare_and_draft("u1", None)
        .await
        .expect("Checkout failed");
    assert_eq!(receipt.total_cents, 1500);

    let handle = till.watch(&receipt.order_id);

    // Wait for the push observer to subscribe before finalizing.
    while hub.subscriber_count(&receipt.order_id).await == 0 {
        tokio::task::yield_now().await;
    }

    // Play the external finalizer: mark the order paid, then notify.
    fixture
        .orders
        .update_order(
            &receipt.order_id,
            till::interfaces::OrderPatch {
                status: Some(OrderStatus::Confirmed),
                payment_status: Some(PaymentStatus::Paid),
                payment_intent_ref: None,
            },
        )
        .await
        .expect("Failed to finalize order");
    let paid = fixture
        .orders
        .read_order(&receipt.order_id)
        .await
        .expect("Failed to read order");
    hub.publish(paid.snapshot()).await;

    let view = handle.wait().await;
    assert_eq!(view.end, Some(WatchEnd::Terminal));
    let snapshot = view.order.expect("Ended view must carry a snapshot");
    assert_eq!(snapshot.payment_status, PaymentStatus::Paid);
    assert_eq!(snapshot.status, OrderStatus::Confirmed);
    assert_eq!(snapshot.total_cents, 1500);
}
