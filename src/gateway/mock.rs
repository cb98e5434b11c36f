//! Mock payment gateway for testing.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::interfaces::{GatewayError, PaymentGateway};
use crate::types::PaymentIntent;

/// Scripted mock gateway.
///
/// Responses pushed with [`push_response`](Self::push_response) are returned
/// in order; once the script is exhausted every call succeeds with a fresh
/// generated intent. All calls are recorded.
#[derive(Default)]
pub struct MockPaymentGateway {
    script: RwLock<VecDeque<Result<PaymentIntent, GatewayError>>>,
    calls: RwLock<Vec<(String, i64, String)>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next call.
    pub async fn push_response(&self, response: Result<PaymentIntent, GatewayError>) {
        self.script.write().await.push_back(response);
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Drain the recorded `(order_id, amount_cents, currency)` calls.
    pub async fn take_calls(&self) -> Vec<(String, i64, String)> {
        std::mem::take(&mut *self.calls.write().await)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(
        &self,
        order_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        self.calls.write().await.push((
            order_id.to_string(),
            amount_cents,
            currency.to_string(),
        ));

        if let Some(scripted) = self.script.write().await.pop_front() {
            return scripted;
        }

        let suffix = Uuid::new_v4().simple().to_string();
        Ok(PaymentIntent {
            intent_id: format!("pi_{suffix}"),
            client_secret: format!("pi_{suffix}_secret"),
        })
    }
}
