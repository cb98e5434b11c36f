//! Catalog lookup interface.

use async_trait::async_trait;

use crate::types::CatalogEntry;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog lookups.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog backend error: {0}")]
    Backend(String),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only source of authoritative product price and availability.
///
/// Ids with no matching product are simply absent from the result; callers
/// decide whether a missing product is a warning or a no-op. No ordering
/// guarantee is made.
///
/// Implementations:
/// - `SqliteCatalog`: local catalog mirror (standalone profile)
/// - `MockCatalog`: in-memory mock for testing
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch current catalog entries for the given product ids.
    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<CatalogEntry>>;
}
