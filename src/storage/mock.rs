//! In-memory mock implementations for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::catalog::{Catalog, CatalogError};
use crate::interfaces::storage::{CartStorage, OrderPatch, OrderStorage, Result, StorageError};
use crate::types::{CartRow, CatalogEntry, JoinedCartRow, Order, OrderLine};

/// Mock cart storage.
///
/// The combined read returns `None` (join unavailable) unless scripted with
/// [`set_joined`](Self::set_joined), which lets tests drive either hydration
/// path.
#[derive(Default)]
pub struct MockCartStorage {
    rows: RwLock<HashMap<(String, String), CartRow>>,
    joined: RwLock<Option<Vec<JoinedCartRow>>>,
    fail_on_upsert: RwLock<bool>,
}

impl MockCartStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the combined-read response.
    pub async fn set_joined(&self, joined: Vec<JoinedCartRow>) {
        *self.joined.write().await = Some(joined);
    }

    pub async fn set_fail_on_upsert(&self, fail: bool) {
        *self.fail_on_upsert.write().await = fail;
    }

    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl CartStorage for MockCartStorage {
    async fn read_cart(&self, user_id: &str) -> Result<Vec<CartRow>> {
        let mut rows: Vec<CartRow> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(rows)
    }

    async fn read_cart_joined(&self, _user_id: &str) -> Result<Option<Vec<JoinedCartRow>>> {
        Ok(self.joined.read().await.clone())
    }

    async fn upsert_cart(&self, rows: &[CartRow]) -> Result<()> {
        if *self.fail_on_upsert.read().await {
            return Err(StorageError::UnsupportedBackend(
                "mock upsert failure".to_string(),
            ));
        }
        let mut stored = self.rows.write().await;
        for row in rows {
            let key = (row.user_id.clone(), row.product_id.clone());
            if row.quantity <= 0 {
                stored.remove(&key);
            } else {
                stored.insert(key, row.clone());
            }
        }
        Ok(())
    }
}

/// Mock order storage.
#[derive(Default)]
pub struct MockOrderStorage {
    orders: RwLock<HashMap<String, Order>>,
    lines: RwLock<HashMap<String, Vec<OrderLine>>>,
    reads: RwLock<usize>,
    fail_on_insert: RwLock<bool>,
}

impl MockOrderStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_insert(&self, fail: bool) {
        *self.fail_on_insert.write().await = fail;
    }

    /// Overwrite an order row, bypassing patch rules. Lets tests play the
    /// external finalizer that flips payment status.
    pub async fn set_order(&self, order: Order) {
        self.orders
            .write()
            .await
            .insert(order.order_id.clone(), order);
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Number of `read_order` calls observed so far.
    pub async fn read_count(&self) -> usize {
        *self.reads.read().await
    }
}

#[async_trait]
impl OrderStorage for MockOrderStorage {
    async fn insert_draft(&self, order: &Order, lines: &[OrderLine]) -> Result<()> {
        if *self.fail_on_insert.read().await {
            return Err(StorageError::UnsupportedBackend(
                "mock insert failure".to_string(),
            ));
        }
        self.orders
            .write()
            .await
            .insert(order.order_id.clone(), order.clone());
        self.lines
            .write()
            .await
            .insert(order.order_id.clone(), lines.to_vec());
        Ok(())
    }

    async fn update_order(&self, order_id: &str, patch: OrderPatch) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StorageError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if let Some(intent_ref) = patch.payment_intent_ref {
            if order.payment_intent_ref.is_some() {
                return Err(StorageError::IntentAlreadySet {
                    order_id: order_id.to_string(),
                });
            }
            order.payment_intent_ref = Some(intent_ref);
        }
        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(payment_status) = patch.payment_status {
            order.payment_status = payment_status;
        }
        Ok(())
    }

    async fn read_order(&self, order_id: &str) -> Result<Order> {
        *self.reads.write().await += 1;
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| StorageError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    async fn read_order_lines(&self, order_id: &str) -> Result<Vec<OrderLine>> {
        Ok(self
            .lines
            .read()
            .await
            .get(order_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Mock catalog.
#[derive(Default)]
pub struct MockCatalog {
    entries: RwLock<HashMap<String, CatalogEntry>>,
    fetches: RwLock<usize>,
    fail_on_fetch: RwLock<bool>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, entry: CatalogEntry) {
        self.entries
            .write()
            .await
            .insert(entry.product_id.clone(), entry);
    }

    pub async fn set_fail_on_fetch(&self, fail: bool) {
        *self.fail_on_fetch.write().await = fail;
    }

    /// Number of `fetch_products` calls made.
    pub async fn fetch_count(&self) -> usize {
        *self.fetches.read().await
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn fetch_products(
        &self,
        ids: &[String],
    ) -> std::result::Result<Vec<CatalogEntry>, CatalogError> {
        *self.fetches.write().await += 1;
        if *self.fail_on_fetch.read().await {
            return Err(CatalogError::Unavailable("mock fetch failure".to_string()));
        }
        let entries = self.entries.read().await;
        Ok(ids.iter().filter_map(|id| entries.get(id).cloned()).collect())
    }
}
