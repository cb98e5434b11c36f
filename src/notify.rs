//! In-process change-notification hub.
//!
//! Routes order row snapshots to subscribers without external messaging
//! infrastructure. One broadcast channel per order id; publishing with no
//! live subscribers is a no-op and the channel is pruned. Suits
//! single-process deployments, testing, and embedded use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::interfaces::{NotifyError, OrderNotifications, OrderSubscription};
use crate::types::OrderSnapshot;

const CHANNEL_CAPACITY: usize = 16;

/// In-process implementation of [`OrderNotifications`].
pub struct ChannelOrderNotifications {
    channels: RwLock<HashMap<String, broadcast::Sender<OrderSnapshot>>>,
}

impl ChannelOrderNotifications {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Deliver a snapshot to the subscribers of its order.
    ///
    /// Returns the number of subscribers reached. Channels with no remaining
    /// subscribers are pruned.
    pub async fn publish(&self, snapshot: OrderSnapshot) -> usize {
        let mut channels = self.channels.write().await;
        let Some(sender) = channels.get(&snapshot.order_id) else {
            return 0;
        };
        match sender.send(snapshot.clone()) {
            Ok(reached) => reached,
            Err(_) => {
                debug!(order_id = %snapshot.order_id, "pruning channel with no subscribers");
                channels.remove(&snapshot.order_id);
                0
            }
        }
    }

    /// Number of live subscribers for an order.
    pub async fn subscriber_count(&self, order_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(order_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Tear down an order's channel, closing all its subscriptions.
    pub async fn close(&self, order_id: &str) {
        self.channels.write().await.remove(order_id);
    }
}

impl Default for ChannelOrderNotifications {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderNotifications for ChannelOrderNotifications {
    async fn subscribe(&self, order_id: &str) -> Result<OrderSubscription, NotifyError> {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(order_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Ok(OrderSubscription::new(sender.subscribe()))
    }
}
