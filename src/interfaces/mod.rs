//! Abstract interfaces for external collaborators.
//!
//! These traits define the contracts for:
//! - Catalog lookups (authoritative price/availability, read-only)
//! - Durable cart and order storage
//! - Payment gateway (intent creation)
//! - Change-notification transport (order snapshots, subscribe-by-id)

pub mod catalog;
pub mod gateway;
pub mod notify;
pub mod storage;

pub use catalog::{Catalog, CatalogError};
pub use gateway::{GatewayError, PaymentGateway};
pub use notify::{NotifyError, OrderNotifications, OrderSubscription};
pub use storage::{CartStorage, OrderPatch, OrderStorage, StorageError};
