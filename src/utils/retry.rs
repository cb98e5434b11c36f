//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::interfaces::GatewayError;

/// Standard backoff for payment gateway intent requests.
///
/// - Min delay: 100ms
/// - Max delay: 2s
/// - Max attempts: 3
/// - Jitter enabled
pub fn gateway_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(3)
        .with_jitter()
}

/// Determines if a gateway error is retryable (transport failures only).
///
/// Non-retryable:
/// - `Rejected`: the gateway declined the intent; retrying cannot succeed.
/// - `InvalidResponse`: a malformed payload will not parse better next time.
pub fn is_retryable_gateway(error: &GatewayError) -> bool {
    matches!(error, GatewayError::Transport(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_gateway() {
        assert!(is_retryable_gateway(&GatewayError::Transport(
            "connection reset".to_string()
        )));
        assert!(!is_retryable_gateway(&GatewayError::Rejected(
            "insufficient funds".to_string()
        )));
        assert!(!is_retryable_gateway(&GatewayError::InvalidResponse(
            "missing intent_id".to_string()
        )));
    }
}
