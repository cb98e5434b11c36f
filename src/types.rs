//! Core domain types for the checkout pipeline.
//!
//! All monetary amounts are integer minor currency units (cents). Client-side
//! prices are advisory only; every amount that reaches an order or the
//! payment gateway is recomputed from catalog data during verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One product/quantity pairing in a user's in-progress selection.
///
/// Lives in the client-side [`CartStore`](crate::cart::CartStore) and in
/// durable cart rows. `unit_price_cents` is whatever the client last saw;
/// it is never trusted for checkout math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub image_url: Option<String>,
    /// Client-cached price. Advisory only.
    pub unit_price_cents: i64,
    /// Pre-sale price, when the product is discounted. Used for savings math.
    pub original_price_cents: Option<i64>,
    pub quantity: i64,
}

/// Authoritative product data from the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: String,
    pub price_cents: i64,
    pub in_stock: bool,
    pub name: String,
    pub image_url: Option<String>,
}

/// A cart line whose price has been re-verified against the catalog.
///
/// Produced by checkout verification; the price here always comes from a
/// [`CatalogEntry`], never from the client.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedLine {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl VerifiedLine {
    /// Line total in cents.
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

/// Durable cart row, keyed by `(user_id, product_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CartRow {
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
}

/// Result of a server-side combined cart read: a cart row already joined
/// with current catalog data in a single round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCartRow {
    pub product_id: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub in_stock: bool,
    pub name: String,
    pub image_url: Option<String>,
}

/// Ephemeral, fully-verified checkout computation. Never persisted.
#[derive(Debug, Clone)]
pub struct PreparedCheckout {
    pub user_id: String,
    pub lines: Vec<VerifiedLine>,
    pub currency: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub warnings: Vec<ValidationWarning>,
}

/// Non-fatal divergence found while re-verifying cart lines against the
/// catalog. Collected and surfaced alongside results, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ValidationWarning {
    /// The product no longer exists in the catalog; its line was dropped.
    MissingProduct { product_id: String },
    /// The product is out of stock; its line was kept.
    OutOfStock { product_id: String },
    /// The client-cached price was stale; the catalog price was used.
    StalePrice {
        product_id: String,
        client_price_cents: i64,
        catalog_price_cents: i64,
    },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingProduct { product_id } => {
                write!(f, "product {product_id} no longer exists")
            }
            Self::OutOfStock { product_id } => {
                write!(f, "product {product_id} is out of stock")
            }
            Self::StalePrice {
                product_id,
                client_price_cents,
                catalog_price_cents,
            } => write!(
                f,
                "price of {product_id} changed: {client_price_cents} -> {catalog_price_cents}"
            ),
        }
    }
}

/// Lifecycle of an order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Pending,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Payment outcome for an order.
///
/// `Paid`, `Failed` and `AmountMismatch` are terminal: once recorded, no
/// further transitions are expected and observers freeze their view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    None,
    Pending,
    Paid,
    Failed,
    /// The gateway charged an amount different from the order total.
    /// Requires manual resolution; never auto-resolved or auto-retried.
    AmountMismatch,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed | Self::AmountMismatch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::AmountMismatch => "amount_mismatch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "amount_mismatch" => Some(Self::AmountMismatch),
            _ => None,
        }
    }
}

/// Durable order record. The single source of truth for checkout outcome.
///
/// Created once per checkout attempt and only ever transitions forward; a
/// retried checkout produces a new order rather than mutating a failed one.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// External payment intent reference. Set at most once per attempt;
    /// required before `payment_status` may leave `None`.
    pub payment_intent_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Full-row snapshot as delivered to reconciliation observers.
    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            order_id: self.order_id.clone(),
            status: self.status,
            payment_status: self.payment_status,
            total_cents: self.total_cents,
            currency: self.currency.clone(),
        }
    }
}

/// Order line, snapshotted at draft time. Immutable thereafter, even if the
/// catalog entry later changes.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub product_name: String,
}

/// Point-in-time view of an order's status columns, as observed by the
/// reconciliation observers and delivered over the notification transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
    pub order_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_cents: i64,
    pub currency: String,
}

/// Opaque handle pair returned by the payment gateway when an intent is
/// created. Only `intent_id` is persisted; `client_secret` drives the
/// client-side confirmation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub client_secret: String,
}
