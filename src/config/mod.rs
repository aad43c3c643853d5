//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `PRESSROOM` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use pressroom::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod esp;
mod features;
mod server;
mod woocommerce;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use esp::EspConfig;
pub use features::FeatureFlags;
pub use server::{Environment, ServerConfig};
pub use woocommerce::WooConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// ESP provider configuration
    #[serde(default)]
    pub esp: EspConfig,

    /// WooCommerce connection and sync configuration
    #[serde(default)]
    pub woocommerce: WooConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `PRESSROOM__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PRESSROOM__ESP__ACTIVE=mailchimp` -> `esp.active = mailchimp`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PRESSROOM")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.esp.validate()?;
        self.woocommerce.validate(&self.server.environment)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::ProviderKind;

    #[test]
    fn default_config_uses_the_manual_provider() {
        let config = AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            esp: EspConfig::default(),
            woocommerce: WooConfig::default(),
            features: FeatureFlags::default(),
        };
        assert_eq!(config.esp.active, ProviderKind::Manual);
    }

    #[test]
    fn validation_runs_every_section() {
        let config = AppConfig {
            server: ServerConfig {
                port: 0,
                ..Default::default()
            },
            database: DatabaseConfig::default(),
            esp: EspConfig::default(),
            woocommerce: WooConfig::default(),
            features: FeatureFlags::default(),
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidPort));
    }
}
