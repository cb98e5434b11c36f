//! Push observer.
//!
//! Subscribes to change notifications scoped to one order id and applies
//! each incoming full-row snapshot as the new canonical state. Unsubscribes
//! (drops the subscription) the moment a terminal payment status arrives or
//! the watch is otherwise frozen. A payload the transport failed to deliver
//! is logged and skipped; the subscription stays up.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Applied, OrderWatch};
use crate::interfaces::{NotifyError, OrderNotifications};

/// Spawn the push listener for one order.
pub(crate) fn spawn(
    transport: Arc<dyn OrderNotifications>,
    order_id: String,
    watch: Arc<OrderWatch>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut subscription = match transport.subscribe(&order_id).await {
            Ok(subscription) => subscription,
            Err(error) => {
                // Polling still converges; push only improves latency
                warn!(order_id, %error, "order push subscription failed");
                return;
            }
        };

        loop {
            match subscription.recv().await {
                Ok(snapshot) => match watch.apply(snapshot) {
                    Applied::Terminal => {
                        debug!(order_id, "push observed terminal payment status");
                        break;
                    }
                    Applied::Frozen => break,
                    Applied::Recorded => {}
                },
                Err(NotifyError::Lagged(skipped)) => {
                    // Snapshots are full rows; the next one supersedes anything missed
                    warn!(order_id, skipped, "order push subscription lagged");
                }
                Err(_) => break,
            }
        }
        // Subscription dropped here: explicit unsubscribe
    })
}
