//! Application configuration.
//!
//! Supports YAML file and environment variable overrides. Every section has
//! serde defaults so a missing file or a partial one still yields a working
//! standalone configuration.

use serde::Deserialize;

use crate::pricing::{self, DiscountTier};
use crate::reconcile::ReconcileConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "TILL_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "TILL";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "TILL_LOG";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutConfig,
    pub reconcile: ReconcileConfig,
}

impl Config {
    /// Load configuration from the YAML file named by `TILL_CONFIG` (default
    /// `config.yaml`, optional) layered with `TILL__`-prefixed environment
    /// variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from a specific file path plus the environment.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend type. Currently `sqlite`.
    #[serde(rename = "type")]
    pub storage_type: String,
    /// Database path. Use `:memory:` for in-memory.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: "sqlite".to_string(),
            path: ":memory:".to_string(),
        }
    }
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the gateway API.
    pub base_url: String,
    /// Bearer token, if the gateway requires one.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4242".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// Checkout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// ISO currency code used for orders and intents.
    pub currency: String,
    /// Tiered discount schedule, thresholds in cents.
    pub discount_tiers: Vec<DiscountTier>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            discount_tiers: pricing::default_tiers(),
        }
    }
}
