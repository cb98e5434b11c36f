//! Polling observer.
//!
//! Re-fetches the full order row at a fixed interval, starting immediately
//! on attach. Every tick is a complete read, so ticks are idempotent and
//! safe to run concurrently with the push observer. A failed tick is logged
//! and skipped; the loop continues on its normal schedule.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use super::{Applied, OrderWatch};
use crate::interfaces::OrderStorage;

/// Spawn the polling loop for one order.
///
/// Stops on terminal state or after `max_attempts` ticks, whichever comes
/// first; ceiling exhaustion times the watch out.
pub(crate) fn spawn(
    orders: Arc<dyn OrderStorage>,
    order_id: String,
    watch: Arc<OrderWatch>,
    poll_interval: Duration,
    max_attempts: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(poll_interval);

        for attempt in 1..=max_attempts {
            // First tick completes immediately
            ticker.tick().await;

            match orders.read_order(&order_id).await {
                Ok(order) => match watch.apply(order.snapshot()) {
                    Applied::Terminal => {
                        debug!(order_id, attempt, "poll observed terminal payment status");
                        return;
                    }
                    Applied::Frozen => return,
                    Applied::Recorded => {}
                },
                Err(error) => {
                    warn!(order_id, attempt, %error, "order poll tick failed");
                }
            }
        }

        if watch.time_out() {
            warn!(
                order_id,
                attempts = max_attempts,
                "order status polling exhausted without terminal state"
            );
        }
    })
}
