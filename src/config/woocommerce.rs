//! WooCommerce configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// WooCommerce connection and sync configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WooConfig {
    /// Site base URL, e.g. `https://news.example.com`
    #[serde(default)]
    pub base_url: String,

    /// REST API consumer key
    #[serde(default)]
    pub consumer_key: String,

    /// REST API consumer secret
    #[serde(default)]
    pub consumer_secret: String,

    /// Webhook signing secret
    #[serde(default)]
    pub webhook_secret: String,

    /// The "can sync at all" gate for commerce-driven contact sync
    #[serde(default = "default_sync_enabled")]
    pub sync_enabled: bool,
}

impl WooConfig {
    /// True when the REST client can be constructed.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.consumer_key.is_empty() && !self.consumer_secret.is_empty()
    }

    /// Validate WooCommerce configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.is_configured()
            && *environment == Environment::Production
            && !self.base_url.starts_with("https://")
        {
            return Err(ValidationError::WooUrlMustBeHttps);
        }
        Ok(())
    }
}

impl Default for WooConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            consumer_key: String::new(),
            consumer_secret: String::new(),
            webhook_secret: String::new(),
            sync_enabled: default_sync_enabled(),
        }
    }
}

fn default_sync_enabled() -> bool {
    true
}
