//! Change-notification transport interface.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::types::OrderSnapshot;

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that can occur on the notification transport.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("subscription lagged, skipped {0} updates")]
    Lagged(u64),

    #[error("notification channel closed")]
    Closed,
}

/// A live subscription to one order's change notifications.
///
/// Each received message is a full row snapshot, so processing is idempotent
/// and a lagged subscription loses nothing it cannot recover from the next
/// snapshot. Dropping the subscription unsubscribes.
pub struct OrderSubscription {
    rx: broadcast::Receiver<OrderSnapshot>,
}

impl OrderSubscription {
    pub fn new(rx: broadcast::Receiver<OrderSnapshot>) -> Self {
        Self { rx }
    }

    /// Receive the next snapshot.
    ///
    /// `Lagged` means older snapshots were dropped; the next call yields the
    /// most recent retained one. `Closed` means the transport shut down.
    pub async fn recv(&mut self) -> Result<OrderSnapshot> {
        match self.rx.recv().await {
            Ok(snapshot) => Ok(snapshot),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(NotifyError::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(NotifyError::Closed),
        }
    }
}

impl std::fmt::Debug for OrderSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSubscription").finish_non_exhaustive()
    }
}

/// Transport delivering order row snapshots, scoped to a single order id.
///
/// Implementations:
/// - `ChannelOrderNotifications`: in-process broadcast hub
#[async_trait]
pub trait OrderNotifications: Send + Sync {
    /// Subscribe to snapshots for one order.
    async fn subscribe(&self, order_id: &str) -> Result<OrderSubscription>;
}
