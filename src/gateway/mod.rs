//! Payment gateway client implementations.

pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::interfaces::{GatewayError, PaymentGateway};
use crate::types::PaymentIntent;

#[derive(Debug, Serialize)]
struct CreateIntentRequest<'a> {
    order_id: &'a str,
    amount: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateIntentResponse {
    intent_id: String,
    client_secret: String,
}

/// JSON-over-HTTP payment gateway client.
///
/// POSTs `{order_id, amount, currency}` to `{base_url}/v1/payment_intents`.
/// Connection and 5xx failures map to [`GatewayError::Transport`]
/// (retryable); 4xx responses map to [`GatewayError::Rejected`].
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        order_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        let mut request = self.client.post(&url).json(&CreateIntentRequest {
            order_id,
            amount: amount_cents,
            currency,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            return Err(GatewayError::Transport(format!("gateway returned {status}")));
        }

        let body: CreateIntentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(PaymentIntent {
            intent_id: body.intent_id,
            client_secret: body.client_secret,
        })
    }
}
