//! Cart synchronization service.
//!
//! Bridges the in-memory [`CartStore`](crate::cart::CartStore) and durable
//! cart storage: hydrates client-ready lines by joining persisted rows with
//! current catalog data, and pushes local selections back as idempotent
//! upserts.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::interfaces::{Catalog, CatalogError, CartStorage, StorageError};
use crate::types::{CartLine, CartRow};

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while hydrating or persisting a cart.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("cart storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Hydrates and persists a user's cart selection.
pub struct CartSyncService {
    storage: Arc<dyn CartStorage>,
    catalog: Arc<dyn Catalog>,
}

impl CartSyncService {
    pub fn new(storage: Arc<dyn CartStorage>, catalog: Arc<dyn Catalog>) -> Self {
        Self { storage, catalog }
    }

    /// Build client-ready cart lines for a user.
    ///
    /// Prefers the backend's combined read (one round trip). When the backend
    /// cannot serve the join it falls back to a two-step fetch-then-join;
    /// callers cannot observe which path was used. Rows referencing products
    /// missing from the catalog are silently dropped — the product no longer
    /// exists.
    #[instrument(skip(self))]
    pub async fn hydrate(&self, user_id: &str) -> Result<Vec<CartLine>> {
        if let Some(joined) = self.storage.read_cart_joined(user_id).await? {
            debug!(user_id, rows = joined.len(), "hydrated via combined read");
            return Ok(joined
                .into_iter()
                .map(|row| CartLine {
                    product_id: row.product_id,
                    name: row.name,
                    image_url: row.image_url,
                    unit_price_cents: row.price_cents,
                    original_price_cents: None,
                    quantity: row.quantity,
                })
                .collect());
        }

        let rows = self.storage.read_cart(user_id).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows.iter().map(|r| r.product_id.clone()).collect();
        let entries = self.catalog.fetch_products(&ids).await?;
        let by_id: HashMap<&str, _> = entries.iter().map(|e| (e.product_id.as_str(), e)).collect();

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(entry) = by_id.get(row.product_id.as_str()) else {
                debug!(user_id, product_id = %row.product_id, "dropping cart row for missing product");
                continue;
            };
            lines.push(CartLine {
                product_id: entry.product_id.clone(),
                name: entry.name.clone(),
                image_url: entry.image_url.clone(),
                unit_price_cents: entry.price_cents,
                original_price_cents: None,
                quantity: row.quantity,
            });
        }
        debug!(user_id, rows = lines.len(), "hydrated via two-step join");
        Ok(lines)
    }

    /// Persist a user's selection as durable cart rows.
    ///
    /// Only `(user_id, product_id)` pairs named in `subset` are written (all
    /// lines when `subset` is `None`). Upserts key on the unique pair, so
    /// repeated calls with identical input leave storage unchanged.
    #[instrument(skip(self, lines))]
    pub async fn persist(
        &self,
        user_id: &str,
        lines: &[CartLine],
        subset: Option<&[String]>,
    ) -> Result<()> {
        let rows: Vec<CartRow> = lines
            .iter()
            .filter(|l| match subset {
                Some(ids) => ids.iter().any(|id| id == &l.product_id),
                None => true,
            })
            .map(|l| CartRow {
                user_id: user_id.to_string(),
                product_id: l.product_id.clone(),
                quantity: l.quantity,
            })
            .collect();

        if rows.is_empty() {
            return Ok(());
        }

        debug!(user_id, rows = rows.len(), "persisting cart selection");
        self.storage.upsert_cart(&rows).await?;
        Ok(())
    }
}
