//! Till facade for in-process library usage.
//!
//! Wires the cart synchronization, checkout orchestration and order status
//! reconciliation services over a shared set of collaborators, and exposes
//! the caller-facing API the UI layer consumes.
//!
//! # Example
//!
//! ```ignore
//! use till::facade::Till;
//!
//! let till = Till::builder()
//!     .with_config(config)
//!     .with_gateway(gateway)
//!     .build()
//!     .await?;
//!
//! let receipt = till.prepare_and_draft("user-1", None).await?;
//! // hand receipt.client_secret to the gateway confirmation UI ...
//! let outcome = till.watch(&receipt.order_id).wait().await;
//! ```

use std::sync::Arc;

use futures::Stream;

use crate::checkout::{CheckoutError, CheckoutReceipt, CheckoutService, CheckoutSettings};
use crate::config::Config;
use crate::interfaces::{
    Catalog, CartStorage, OrderNotifications, OrderStorage, PaymentGateway, StorageError,
};
use crate::reconcile::{ObserverHandle, OrderView};
use crate::sync::{CartSyncService, SyncError};
use crate::types::CartLine;

/// Errors that can occur while assembling or driving a [`Till`] instance.
#[derive(Debug, thiserror::Error)]
pub enum FacadeError {
    #[error("missing collaborator: {0}")]
    Missing(&'static str),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error("cart hydration failed: {0}")]
    Hydration(#[from] SyncError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

/// Builder for a [`Till`] instance.
pub struct TillBuilder {
    config: Config,
    cart_storage: Option<Arc<dyn CartStorage>>,
    order_storage: Option<Arc<dyn OrderStorage>>,
    catalog: Option<Arc<dyn Catalog>>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifications: Option<Arc<dyn OrderNotifications>>,
}

impl TillBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            cart_storage: None,
            order_storage: None,
            catalog: None,
            gateway: None,
            notifications: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Provide durable cart storage. When omitted, storage is initialized
    /// from `config.storage`.
    pub fn with_cart_storage(mut self, storage: Arc<dyn CartStorage>) -> Self {
        self.cart_storage = Some(storage);
        self
    }

    /// Provide durable order storage. When omitted, storage is initialized
    /// from `config.storage`.
    pub fn with_order_storage(mut self, storage: Arc<dyn OrderStorage>) -> Self {
        self.order_storage = Some(storage);
        self
    }

    /// Provide a catalog collaborator. When omitted along with storage, the
    /// storage backend's local catalog mirror is used.
    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Provide the change-notification transport for push reconciliation.
    /// When omitted, only the polling observer runs.
    pub fn with_notifications(mut self, notifications: Arc<dyn OrderNotifications>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Assemble the facade, initializing any storage not provided.
    pub async fn build(self) -> Result<Till, FacadeError> {
        let Self {
            config,
            mut cart_storage,
            mut order_storage,
            mut catalog,
            gateway,
            notifications,
        } = self;

        #[cfg(feature = "sqlite")]
        if cart_storage.is_none() || order_storage.is_none() {
            let (cart, orders, mirror) = crate::storage::init_storage(&config.storage).await?;
            if cart_storage.is_none() {
                cart_storage = Some(cart);
            }
            if order_storage.is_none() {
                order_storage = Some(orders);
            }
            if catalog.is_none() {
                catalog = Some(mirror);
            }
        }

        let cart_storage = cart_storage.ok_or(FacadeError::Missing("cart storage"))?;
        let order_storage = order_storage.ok_or(FacadeError::Missing("order storage"))?;
        let catalog = catalog.ok_or(FacadeError::Missing("catalog"))?;
        let gateway = gateway.ok_or(FacadeError::Missing("payment gateway"))?;

        let sync = CartSyncService::new(Arc::clone(&cart_storage), Arc::clone(&catalog));
        let checkout = CheckoutService::new(
            catalog,
            Arc::clone(&order_storage),
            gateway,
            CheckoutSettings {
                currency: config.checkout.currency.clone(),
                discount_tiers: config.checkout.discount_tiers.clone(),
            },
        );

        Ok(Till {
            config,
            sync,
            checkout,
            order_storage,
            notifications,
        })
    }
}

impl Default for TillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-facing handle over the checkout pipeline.
pub struct Till {
    config: Config,
    sync: CartSyncService,
    checkout: CheckoutService,
    order_storage: Arc<dyn OrderStorage>,
    notifications: Option<Arc<dyn OrderNotifications>>,
}

impl Till {
    pub fn builder() -> TillBuilder {
        TillBuilder::new()
    }

    /// Hydrate the user's durable cart selection as client-ready lines.
    pub async fn hydrate_cart(&self, user_id: &str) -> Result<Vec<CartLine>, FacadeError> {
        Ok(self.sync.hydrate(user_id).await?)
    }

    /// Persist the user's selection back to durable storage.
    pub async fn persist_cart(
        &self,
        user_id: &str,
        lines: &[CartLine],
        subset: Option<&[String]>,
    ) -> Result<(), FacadeError> {
        Ok(self.sync.persist(user_id, lines, subset).await?)
    }

    /// Run one checkout attempt over the user's durable cart.
    ///
    /// Hydrates the cart, verifies it against the catalog, drafts a durable
    /// order and requests a payment intent. The returned `client_secret`
    /// drives gateway-side confirmation.
    pub async fn prepare_and_draft(
        &self,
        user_id: &str,
        subset: Option<&[String]>,
    ) -> Result<CheckoutReceipt, FacadeError> {
        let lines = self.sync.hydrate(user_id).await?;
        Ok(self.checkout.checkout(user_id, &lines, subset).await?)
    }

    /// Attach reconciliation observers to an order.
    ///
    /// Both observers run per `config.reconcile`; the push observer is
    /// skipped when no notification transport was wired.
    pub fn watch(&self, order_id: &str) -> ObserverHandle {
        ObserverHandle::attach(
            Arc::clone(&self.order_storage),
            self.notifications.clone(),
            order_id,
            &self.config.reconcile,
        )
    }

    /// Observe an order until a terminal (or timed-out) view.
    ///
    /// Returns the observer handle alongside a stream of view updates that
    /// ends after the final value. Dropping the handle detaches both
    /// observers.
    pub fn observe(
        &self,
        order_id: &str,
    ) -> (ObserverHandle, impl Stream<Item = OrderView> + Send + 'static) {
        let handle = self.watch(order_id);
        let updates = handle.updates();
        (handle, updates)
    }
}

impl std::fmt::Debug for Till {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Till").finish_non_exhaustive()
    }
}
