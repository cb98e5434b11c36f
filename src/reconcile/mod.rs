//! Order status reconciliation.
//!
//! Two independently-operable observers — interval polling and a push
//! subscription — converge on the same durable order row. Both feed
//! `(OrderSnapshot)` events into one sink, the [`OrderWatch`]: a small state
//! machine with states `watching` and `ended`. The first terminal payment
//! status wins and freezes the caller-visible view; later ticks and messages
//! for that order are ignored. Because both observers read the same row they
//! can only disagree on latency, never on content.
//!
//! Either observer may be disabled without breaking correctness, only
//! latency. Polling that exhausts its attempt ceiling before a terminal
//! state records a distinct timed-out end rather than stalling silently.

pub mod poll;
pub mod push;

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::interfaces::{OrderNotifications, OrderStorage};
use crate::types::OrderSnapshot;

/// How a watch stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    /// A terminal payment status was observed.
    Terminal,
    /// The polling ceiling was exhausted without a terminal status.
    TimedOut,
}

/// Caller-visible view of the order under reconciliation.
///
/// Once `end` is set the view is frozen; no further updates are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderView {
    pub order: Option<OrderSnapshot>,
    pub end: Option<WatchEnd>,
}

impl OrderView {
    pub fn is_ended(&self) -> bool {
        self.end.is_some()
    }
}

/// Result of feeding a snapshot into the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Recorded; the order is still non-terminal.
    Recorded,
    /// Recorded and terminal; the view is now frozen.
    Terminal,
    /// Ignored; the view was already frozen.
    Frozen,
}

/// Shared sink both observers write into.
///
/// Updates go through `watch::Sender::send_if_modified`, which serializes
/// concurrent writers, so first-terminal-wins needs no further locking.
pub struct OrderWatch {
    tx: watch::Sender<OrderView>,
}

impl OrderWatch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(OrderView::default());
        Self { tx }
    }

    /// Feed one snapshot into the watch.
    pub fn apply(&self, snapshot: OrderSnapshot) -> Applied {
        let mut applied = Applied::Frozen;
        self.tx.send_if_modified(|view| {
            if view.end.is_some() {
                return false;
            }
            let terminal = snapshot.payment_status.is_terminal();
            view.order = Some(snapshot);
            if terminal {
                view.end = Some(WatchEnd::Terminal);
                applied = Applied::Terminal;
            } else {
                applied = Applied::Recorded;
            }
            true
        });
        applied
    }

    /// Record ceiling exhaustion. A no-op if the view already ended.
    ///
    /// Returns whether the timed-out end was recorded.
    pub fn time_out(&self) -> bool {
        self.tx.send_if_modified(|view| {
            if view.end.is_some() {
                return false;
            }
            view.end = Some(WatchEnd::TimedOut);
            true
        })
    }

    /// Current view.
    pub fn view(&self) -> OrderView {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrderView> {
        self.tx.subscribe()
    }
}

impl Default for OrderWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderWatch")
            .field("view", &self.view())
            .finish()
    }
}

/// Reconciliation observer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Run the polling observer.
    pub poll_enabled: bool,
    /// Fixed interval between poll ticks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Poll ceiling; exhaustion without a terminal state times the watch out.
    pub poll_max_attempts: u32,
    /// Run the push observer.
    pub push_enabled: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_enabled: true,
            poll_interval_ms: 2_000,
            poll_max_attempts: 30,
            push_enabled: true,
        }
    }
}

impl ReconcileConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Handle over the observers attached to one order.
///
/// Dropping (or [`detach`](Self::detach)-ing) the handle aborts both
/// observer tasks; neither the poll timer nor the push subscription outlives
/// it. The observers also self-cancel on terminal state or ceiling.
pub struct ObserverHandle {
    watch: Arc<OrderWatch>,
    poll: Option<JoinHandle<()>>,
    push: Option<JoinHandle<()>>,
}

impl ObserverHandle {
    /// Attach observers to an order per `config`.
    ///
    /// The push observer is skipped when no notification transport is wired;
    /// correctness is unaffected, only latency.
    pub fn attach(
        orders: Arc<dyn OrderStorage>,
        notifications: Option<Arc<dyn OrderNotifications>>,
        order_id: &str,
        config: &ReconcileConfig,
    ) -> Self {
        let watch = Arc::new(OrderWatch::new());

        let poll = config.poll_enabled.then(|| {
            poll::spawn(
                Arc::clone(&orders),
                order_id.to_string(),
                Arc::clone(&watch),
                config.poll_interval(),
                config.poll_max_attempts,
            )
        });

        let push = match notifications {
            Some(transport) if config.push_enabled => Some(push::spawn(
                transport,
                order_id.to_string(),
                Arc::clone(&watch),
            )),
            _ => None,
        };

        Self { watch, poll, push }
    }

    /// Latest caller-visible view.
    pub fn view(&self) -> OrderView {
        self.watch.view()
    }

    /// Stream of view updates, ending after the final (ended) view.
    pub fn updates(&self) -> impl Stream<Item = OrderView> + Send + 'static {
        let mut rx = self.watch.subscribe();
        rx.mark_changed();
        futures::stream::unfold((rx, false), |(mut rx, done)| async move {
            if done {
                return None;
            }
            loop {
                if rx.changed().await.is_err() {
                    return None;
                }
                let view = rx.borrow_and_update().clone();
                if view.order.is_none() && view.end.is_none() {
                    // Nothing observed yet
                    continue;
                }
                let done = view.is_ended();
                return Some((view, (rx, done)));
            }
        })
    }

    /// Wait until the watch ends (terminal or timed out).
    pub async fn wait(&self) -> OrderView {
        let mut rx = self.watch.subscribe();
        loop {
            {
                let view = rx.borrow_and_update().clone();
                if view.is_ended() {
                    return view;
                }
            }
            if rx.changed().await.is_err() {
                return self.watch.view();
            }
        }
    }

    /// Stop both observers.
    pub fn detach(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.abort();
        }
        if let Some(handle) = self.push.take() {
            handle.abort();
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

impl std::fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}
