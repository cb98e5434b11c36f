//! Durable cart and order storage interfaces.

use async_trait::async_trait;

use crate::types::{CartRow, JoinedCartRow, Order, OrderLine, OrderStatus, PaymentStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("payment intent already recorded for order {order_id}")]
    IntentAlreadySet { order_id: String },

    #[error("invalid {column} value in storage: {value}")]
    InvalidColumn { column: &'static str, value: String },

    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unsupported storage type: {0}")]
    UnsupportedBackend(String),
}

/// Interface for durable cart row persistence.
///
/// The `(user_id, product_id)` pair is the unique key; repeated upserts of
/// the same selection must not create duplicate rows.
///
/// Implementations:
/// - `SqliteCartStorage`: SQLite storage
/// - `MockCartStorage`: In-memory mock for testing
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// Read all cart rows for a user.
    async fn read_cart(&self, user_id: &str) -> Result<Vec<CartRow>>;

    /// Combined read: cart rows already joined with catalog data in a single
    /// round trip.
    ///
    /// Returns `Ok(None)` when the backend cannot serve the join; callers
    /// fall back to [`read_cart`](Self::read_cart) plus a catalog fetch and
    /// must produce identical output either way.
    async fn read_cart_joined(&self, user_id: &str) -> Result<Option<Vec<JoinedCartRow>>>;

    /// Upsert cart rows with `(user_id, product_id)` as the conflict target.
    ///
    /// Rows with `quantity <= 0` are deleted instead. Idempotent: re-writing
    /// the same rows leaves storage unchanged.
    async fn upsert_cart(&self, rows: &[CartRow]) -> Result<()>;
}

/// Partial update applied to an existing order row.
///
/// Only `Some` fields are written. Setting `payment_intent_ref` fails with
/// [`StorageError::IntentAlreadySet`] if the order already carries one.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_intent_ref: Option<String>,
}

/// Interface for durable order persistence.
///
/// The order row is the single source of truth for checkout outcome. It is
/// only ever written by checkout orchestration (draft creation, intent
/// persistence) and by the external finalization step; reconciliation
/// observers only read.
///
/// Implementations:
/// - `SqliteOrderStorage`: SQLite storage
/// - `MockOrderStorage`: In-memory mock for testing
#[async_trait]
pub trait OrderStorage: Send + Sync {
    /// Insert a draft order together with its lines, atomically.
    ///
    /// Either the order row and every line land, or nothing does. A partial
    /// insertion must never be observable.
    async fn insert_draft(&self, order: &Order, lines: &[OrderLine]) -> Result<()>;

    /// Apply a partial update to an order row.
    async fn update_order(&self, order_id: &str, patch: OrderPatch) -> Result<()>;

    /// Read a full order row.
    async fn read_order(&self, order_id: &str) -> Result<Order>;

    /// Read the lines of an order.
    async fn read_order_lines(&self, order_id: &str) -> Result<Vec<OrderLine>>;
}
