//! Storage implementations.

pub mod mock;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteCartStorage, SqliteCatalog, SqliteOrderStorage};

#[cfg(feature = "sqlite")]
use std::sync::Arc;

#[cfg(feature = "sqlite")]
use tracing::info;

#[cfg(feature = "sqlite")]
use crate::config::StorageConfig;
#[cfg(feature = "sqlite")]
use crate::interfaces::{CartStorage, OrderStorage, StorageError};

/// Initialize storage based on configuration.
///
/// Returns `(CartStorage, OrderStorage, SqliteCatalog)` implementations for
/// the configured storage type.
#[cfg(feature = "sqlite")]
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<(Arc<dyn CartStorage>, Arc<dyn OrderStorage>, Arc<SqliteCatalog>), StorageError> {
    info!("Storage: {} at {}", config.storage_type, config.path);

    match config.storage_type.as_str() {
        "sqlite" => {
            if config.path != ":memory:" {
                if let Some(parent) = std::path::Path::new(&config.path).parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::UnsupportedBackend(format!(
                            "cannot create storage directory: {e}"
                        ))
                    })?;
                }
            }

            // In-memory SQLite is per-connection; cap the pool at one so
            // every handle sees the same database.
            let pool = if config.path == ":memory:" {
                sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect("sqlite::memory:")
                    .await?
            } else {
                sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.path)).await?
            };

            let cart = Arc::new(SqliteCartStorage::new(pool.clone()));
            cart.init().await?;

            let orders = Arc::new(SqliteOrderStorage::new(pool.clone()));
            orders.init().await?;

            let catalog = Arc::new(SqliteCatalog::new(pool));

            Ok((cart, orders, catalog))
        }
        other => Err(StorageError::UnsupportedBackend(other.to_string())),
    }
}
