//! Engine configuration loaded from environment variables.

use std::str::FromStr;

use domain::offer::DEFAULT_COMMAND_ATTEMPTS;
use rust_decimal::Decimal;
use thiserror::Error;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Engine configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `MAX_DISCOUNT`: auto-accept margin in percent, 0 to 100 (default: `20`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `OFFER_COMMAND_RETRIES`: attempts per command on concurrent writes (default: `3`)
/// - `ADMIN_EMAIL`: recipient of administrator notifications (default: `"admin@localhost"`)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_discount: Decimal,
    pub log_level: String,
    pub log_format: LogFormat,
    pub command_attempts: u32,
    pub admin_email: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_discount: Decimal::from(20),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            command_attempts: DEFAULT_COMMAND_ATTEMPTS,
            admin_email: "admin@localhost".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Unset keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("MAX_DISCOUNT") {
            config.max_discount = parse("MAX_DISCOUNT", &value)?;
        }
        if let Some(value) = lookup("RUST_LOG") {
            config.log_level = value;
        }
        if let Some(value) = lookup("LOG_FORMAT") {
            config.log_format = value.parse()?;
        }
        if let Some(value) = lookup("OFFER_COMMAND_RETRIES") {
            config.command_attempts = parse("OFFER_COMMAND_RETRIES", &value)?;
        }
        if let Some(value) = lookup("ADMIN_EMAIL") {
            config.admin_email = value;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_discount < Decimal::ZERO || self.max_discount > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Validation(format!(
                "max discount must be within 0 and 100, got {}",
                self.max_discount
            )));
        }
        if self.command_attempts == 0 {
            return Err(ConfigError::Validation(
                "command attempts must be at least 1".to_string(),
            ));
        }
        if self.admin_email.trim().is_empty() {
            return Err(ConfigError::Validation(
                "admin email must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}
