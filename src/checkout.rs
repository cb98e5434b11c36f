//! Checkout orchestration service.
//!
//! Walks one checkout attempt through
//! `prepare → verify → totals → draft → intent-requested → intent-persisted`.
//!
//! Verification is the integrity boundary: every monetary amount downstream
//! of it comes from the catalog, never from client-supplied data. Each
//! attempt creates a fresh order; a failed attempt is abandoned and retried
//! as a new one, never resumed.

use std::collections::HashMap;
use std::sync::Arc;

use backon::Retryable;
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::interfaces::{
    Catalog, CatalogError, GatewayError, OrderPatch, OrderStorage, PaymentGateway, StorageError,
};
use crate::pricing::{self, DiscountTier};
use crate::types::{
    CartLine, Order, OrderLine, OrderStatus, PaymentStatus, PreparedCheckout, ValidationWarning,
    VerifiedLine,
};
use crate::utils::retry;

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Fatal checkout failures, distinguishable by the caller.
///
/// On any of these no money has moved: `EmptyCheckout` and `Catalog` mean
/// "your cart changed", `Storage` aborted the attempt before an intent
/// existed, and `Gateway` left a valid draft order with no intent. All are
/// safely retried as a brand-new attempt.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("no lines survived verification")]
    EmptyCheckout { warnings: Vec<ValidationWarning> },

    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("order persistence failed: {0}")]
    Storage(#[from] StorageError),

    #[error("payment gateway failed for order {order_id}: {source}")]
    Gateway {
        order_id: String,
        #[source]
        source: GatewayError,
    },
}

/// Outcome of a successful checkout attempt, handed back to the caller to
/// drive gateway-side confirmation.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub intent_id: String,
    pub client_secret: String,
    pub total_cents: i64,
    pub warnings: Vec<ValidationWarning>,
}

/// Settings for checkout orchestration.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub discount_tiers: Vec<DiscountTier>,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            discount_tiers: pricing::default_tiers(),
        }
    }
}

/// Orchestrates checkout attempts against catalog, order storage and the
/// payment gateway.
pub struct CheckoutService {
    catalog: Arc<dyn Catalog>,
    orders: Arc<dyn OrderStorage>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        orders: Arc<dyn OrderStorage>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            catalog,
            orders,
            gateway,
            settings,
        }
    }

    /// Verify a selection against the catalog and compute its totals.
    ///
    /// Pure with respect to storage: nothing durable is written. Fails only
    /// when the catalog is unreachable or no line survives verification.
    #[instrument(skip(self, cart_lines))]
    pub async fn prepare(
        &self,
        user_id: &str,
        cart_lines: &[CartLine],
        subset: Option<&[String]>,
    ) -> Result<PreparedCheckout> {
        let selected: Vec<&CartLine> = cart_lines
            .iter()
            .filter(|l| match subset {
                Some(ids) => ids.iter().any(|id| id == &l.product_id),
                None => true,
            })
            .collect();

        let (lines, warnings) = self.verify(&selected).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCheckout { warnings });
        }

        let totals = pricing::compute_totals(&lines, &self.settings.discount_tiers);
        Ok(PreparedCheckout {
            user_id: user_id.to_string(),
            lines,
            currency: self.settings.currency.clone(),
            subtotal_cents: totals.subtotal_cents,
            discount_cents: totals.discount_cents,
            total_cents: totals.total_cents,
            warnings,
        })
    }

    /// Run a full checkout attempt: verify, draft a durable order, request a
    /// payment intent and persist its reference.
    ///
    /// A gateway failure leaves the order as `draft` with no intent; the
    /// caller may retry, which creates a new independent order.
    #[instrument(skip(self, cart_lines), fields(order_id))]
    pub async fn checkout(
        &self,
        user_id: &str,
        cart_lines: &[CartLine],
        subset: Option<&[String]>,
    ) -> Result<CheckoutReceipt> {
        let prepared = self.prepare(user_id, cart_lines, subset).await?;
        for warning in &prepared.warnings {
            warn!(user_id, %warning, "checkout verification warning");
        }

        let order = self.draft(&prepared).await?;
        tracing::Span::current().record("order_id", order.order_id.as_str());

        let intent = self.request_intent(&order).await?;
        self.persist_intent(&order, &intent.intent_id).await?;

        info!(
            order_id = %order.order_id,
            total_cents = order.total_cents,
            "checkout attempt ready for confirmation"
        );
        Ok(CheckoutReceipt {
            order_id: order.order_id,
            intent_id: intent.intent_id,
            client_secret: intent.client_secret,
            total_cents: order.total_cents,
            warnings: prepared.warnings,
        })
    }

    /// Re-verify lines against authoritative catalog rows.
    ///
    /// Missing product: line dropped, warning. Out of stock: line kept,
    /// warning. Stale price: catalog price overwrites, warning. The catalog
    /// price is used unconditionally — even when it matches the client's.
    async fn verify(
        &self,
        selected: &[&CartLine],
    ) -> Result<(Vec<VerifiedLine>, Vec<ValidationWarning>)> {
        if selected.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let ids: Vec<String> = selected.iter().map(|l| l.product_id.clone()).collect();
        let entries = self.catalog.fetch_products(&ids).await?;
        let by_id: HashMap<&str, _> = entries.iter().map(|e| (e.product_id.as_str(), e)).collect();

        let mut lines = Vec::with_capacity(selected.len());
        let mut warnings = Vec::new();

        for cart_line in selected {
            let Some(entry) = by_id.get(cart_line.product_id.as_str()) else {
                warnings.push(ValidationWarning::MissingProduct {
                    product_id: cart_line.product_id.clone(),
                });
                continue;
            };

            if !entry.in_stock {
                warnings.push(ValidationWarning::OutOfStock {
                    product_id: entry.product_id.clone(),
                });
            }
            if entry.price_cents != cart_line.unit_price_cents {
                warnings.push(ValidationWarning::StalePrice {
                    product_id: entry.product_id.clone(),
                    client_price_cents: cart_line.unit_price_cents,
                    catalog_price_cents: entry.price_cents,
                });
            }

            lines.push(VerifiedLine {
                product_id: entry.product_id.clone(),
                name: entry.name.clone(),
                unit_price_cents: entry.price_cents,
                quantity: cart_line.quantity,
            });
        }

        Ok((lines, warnings))
    }

    /// Persist the order row and its lines in one transaction.
    async fn draft(&self, prepared: &PreparedCheckout) -> Result<Order> {
        let order = Order {
            order_id: Uuid::new_v4().to_string(),
            user_id: prepared.user_id.clone(),
            subtotal_cents: prepared.subtotal_cents,
            discount_cents: prepared.discount_cents,
            total_cents: prepared.total_cents,
            currency: prepared.currency.clone(),
            status: OrderStatus::Draft,
            payment_status: PaymentStatus::None,
            payment_intent_ref: None,
            created_at: Utc::now(),
        };

        let lines: Vec<OrderLine> = prepared
            .lines
            .iter()
            .map(|l| OrderLine {
                order_id: order.order_id.clone(),
                product_id: l.product_id.clone(),
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
                line_total_cents: l.line_total_cents(),
                product_name: l.name.clone(),
            })
            .collect();

        self.orders.insert_draft(&order, &lines).await?;
        Ok(order)
    }

    /// Request a payment intent, retrying transport-class failures only.
    async fn request_intent(&self, order: &Order) -> Result<crate::types::PaymentIntent> {
        let op = || async {
            self.gateway
                .create_intent(&order.order_id, order.total_cents, &order.currency)
                .await
        };

        op.retry(retry::gateway_backoff())
            .when(retry::is_retryable_gateway)
            .notify(|err, delay| {
                warn!(error = %err, retry_in = ?delay, "payment gateway call failed, retrying");
            })
            .await
            .map_err(|source| CheckoutError::Gateway {
                order_id: order.order_id.clone(),
                source,
            })
    }

    /// Record the intent reference and move the order to pending payment.
    async fn persist_intent(&self, order: &Order, intent_id: &str) -> Result<()> {
        self.orders
            .update_order(
                &order.order_id,
                OrderPatch {
                    status: Some(OrderStatus::Pending),
                    payment_status: Some(PaymentStatus::Pending),
                    payment_intent_ref: Some(intent_id.to_string()),
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockPaymentGateway;
    use crate::storage::mock::{MockCatalog, MockOrderStorage};
    use crate::types::CatalogEntry;

    fn entry(product_id: &str, price: i64, in_stock: bool) -> CatalogEntry {
        CatalogEntry {
            product_id: product_id.to_string(),
            price_cents: price,
            in_stock,
            name: format!("Product {product_id}"),
            image_url: None,
        }
    }

    fn cart_line(product_id: &str, price: i64, qty: i64) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            name: format!("Product {product_id}"),
            image_url: None,
            unit_price_cents: price,
            original_price_cents: None,
            quantity: qty,
        }
    }

    fn service(
        catalog: Arc<MockCatalog>,
        orders: Arc<MockOrderStorage>,
        gateway: Arc<MockPaymentGateway>,
    ) -> CheckoutService {
        CheckoutService::new(catalog, orders, gateway, CheckoutSettings::default())
    }

    #[tokio::test]
    async fn test_prepare_uses_catalog_price() {
        // Cart: p1 qty 2 @ client 10.00, p2 qty 1 @ client 20.00.
        // Catalog says p1 now costs 11.00.
        let catalog = Arc::new(MockCatalog::new());
        catalog.insert(entry("p1", 1100, true)).await;
        catalog.insert(entry("p2", 2000, true)).await;
        let svc = service(
            catalog,
            Arc::new(MockOrderStorage::new()),
            Arc::new(MockPaymentGateway::new()),
        );

        let lines = vec![cart_line("p1", 1000, 2), cart_line("p2", 2000, 1)];
        let prepared = svc.prepare("u1", &lines, None).await.unwrap();

        assert_eq!(prepared.subtotal_cents, 4200);
        assert_eq!(prepared.discount_cents, 0);
        assert_eq!(prepared.total_cents, 4200);
        assert_eq!(prepared.warnings.len(), 1);
        assert!(matches!(
            prepared.warnings[0],
            ValidationWarning::StalePrice {
                client_price_cents: 1000,
                catalog_price_cents: 1100,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_prepare_drops_missing_keeps_out_of_stock() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.insert(entry("p1", 1000, false)).await;
        let svc = service(
            catalog,
            Arc::new(MockOrderStorage::new()),
            Arc::new(MockPaymentGateway::new()),
        );

        let lines = vec![cart_line("p1", 1000, 1), cart_line("gone", 500, 1)];
        let prepared = svc.prepare("u1", &lines, None).await.unwrap();

        assert_eq!(prepared.lines.len(), 1);
        assert_eq!(prepared.lines[0].product_id, "p1");
        assert_eq!(prepared.warnings.len(), 2);
        assert!(prepared
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::MissingProduct { product_id } if product_id == "gone")));
        assert!(prepared
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::OutOfStock { product_id } if product_id == "p1")));
    }

    #[tokio::test]
    async fn test_prepare_empty_after_verification() {
        let catalog = Arc::new(MockCatalog::new());
        let svc = service(
            catalog,
            Arc::new(MockOrderStorage::new()),
            Arc::new(MockPaymentGateway::new()),
        );

        let lines = vec![cart_line("gone", 500, 1)];
        let err = svc.prepare("u1", &lines, None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCheckout { warnings } if warnings.len() == 1));
    }

    #[tokio::test]
    async fn test_prepare_subset_selection() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.insert(entry("p1", 1000, true)).await;
        catalog.insert(entry("p2", 2000, true)).await;
        let svc = service(
            catalog,
            Arc::new(MockOrderStorage::new()),
            Arc::new(MockPaymentGateway::new()),
        );

        let lines = vec![cart_line("p1", 1000, 2), cart_line("p2", 2000, 1)];
        let subset = vec!["p2".to_string()];
        let prepared = svc.prepare("u1", &lines, Some(&subset)).await.unwrap();

        assert_eq!(prepared.lines.len(), 1);
        assert_eq!(prepared.subtotal_cents, 2000);
    }

    #[tokio::test]
    async fn test_checkout_happy_path() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.insert(entry("p1", 3000, true)).await;
        let orders = Arc::new(MockOrderStorage::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let svc = service(catalog, orders.clone(), gateway.clone());

        let lines = vec![cart_line("p1", 3000, 2)];
        let receipt = svc.checkout("u1", &lines, None).await.unwrap();

        // 6000 subtotal hits the $5-off tier
        assert_eq!(receipt.total_cents, 5500);
        assert!(!receipt.client_secret.is_empty());

        let order = orders.read_order(&receipt.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.payment_intent_ref.as_deref(), Some(receipt.intent_id.as_str()));

        let order_lines = orders.read_order_lines(&receipt.order_id).await.unwrap();
        assert_eq!(order_lines.len(), 1);
        assert_eq!(order_lines[0].line_total_cents, 6000);
        assert_eq!(order_lines[0].product_name, "Product p1");

        let calls = gateway.take_calls().await;
        assert_eq!(calls, vec![(receipt.order_id.clone(), 5500, "usd".to_string())]);
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_draft() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.insert(entry("p1", 1000, true)).await;
        let orders = Arc::new(MockOrderStorage::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        gateway
            .push_response(Err(GatewayError::Rejected("card region blocked".to_string())))
            .await;
        let svc = service(catalog, orders.clone(), gateway);

        let lines = vec![cart_line("p1", 1000, 1)];
        let err = svc.checkout("u1", &lines, None).await.unwrap_err();

        let order_id = match err {
            CheckoutError::Gateway { order_id, .. } => order_id,
            other => panic!("expected gateway error, got {other:?}"),
        };
        let order = orders.read_order(&order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.payment_status, PaymentStatus::None);
        assert_eq!(order.payment_intent_ref, None);

        // A retry produces a new, independent order
        let receipt = svc.checkout("u1", &lines, None).await.unwrap();
        assert_ne!(receipt.order_id, order_id);
    }

    #[tokio::test]
    async fn test_draft_failure_aborts_attempt() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.insert(entry("p1", 1000, true)).await;
        let orders = Arc::new(MockOrderStorage::new());
        orders.set_fail_on_insert(true).await;
        let gateway = Arc::new(MockPaymentGateway::new());
        let svc = service(catalog, orders.clone(), gateway.clone());

        let lines = vec![cart_line("p1", 1000, 1)];
        let err = svc.checkout("u1", &lines, None).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Storage(_)));
        assert_eq!(orders.order_count().await, 0);
        // Gateway never consulted when the draft cannot be persisted
        assert!(gateway.take_calls().await.is_empty());
    }
}
