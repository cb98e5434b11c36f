//! Payment gateway interface.

use async_trait::async_trait;

use crate::types::PaymentIntent;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while requesting a payment intent.
///
/// `Transport` failures are transient and safe to retry; `Rejected` and
/// `InvalidResponse` will not succeed on retry.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway transport error: {0}")]
    Transport(String),

    #[error("payment intent rejected: {0}")]
    Rejected(String),

    #[error("malformed gateway response: {0}")]
    InvalidResponse(String),
}

/// External payment gateway: create an authorization intent for an order.
///
/// The amount is always computed server-side by this core, in minor currency
/// units, never taken from client display state. Only the returned
/// `intent_id` is persisted; the `client_secret` goes back to the caller to
/// drive gateway-side confirmation.
///
/// Implementations:
/// - `HttpPaymentGateway`: JSON-over-HTTP gateway client
/// - `MockPaymentGateway`: scripted mock for testing
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Request a payment intent for `(order_id, amount, currency)`.
    async fn create_intent(
        &self,
        order_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent>;
}
