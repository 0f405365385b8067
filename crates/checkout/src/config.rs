//! Checkout service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADDRESS_API_URL` - Base URL of the address standardization vendor
//! - `ADDRESS_API_KEY` - API key for the address vendor (high entropy)
//! - `RATES_API_URL` - Base URL of the shipping rate service
//! - `RATES_API_KEY` - API key for the rate service
//! - `ORDERS_API_URL` - Base URL of the commerce backend
//! - `ORDERS_API_KEY` - API key for the commerce backend
//! - `CARTS_API_URL` - Base URL of the cart service
//! - `CARTS_API_KEY` - API key for the cart service
//!
//! ## Optional
//! - `CHECKOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `CHECKOUT_PORT` - Listen port (default: 3000)
//! - `CHECKOUT_IDLE_MINUTES` - Minutes before an untouched checkout expires (default: 30)
//! - `CHECKOUT_FREE_SHIPPING_THRESHOLD` - Subtotal at which standard delivery ships free (default: 25.00)
//! - `CHECKOUT_TAX_RATE` - Flat sales tax rate as a fraction (default: 0)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Checkout service configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// How long an untouched checkout stays alive
    pub idle_timeout: Duration,
    /// Standard delivery ships free at or above this subtotal
    pub free_shipping_threshold: Decimal,
    /// Flat sales tax rate as a fraction (e.g. 0.0625)
    pub tax_rate: Decimal,
    /// Address standardization vendor
    pub address: UpstreamConfig,
    /// Shipping rate service
    pub rates: UpstreamConfig,
    /// Commerce backend (orders and payment confirmation)
    pub orders: UpstreamConfig,
    /// Cart service
    pub carts: UpstreamConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Connection details for one upstream service. All four upstreams use
/// bearer-token auth against a base URL, so they share a shape.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: SecretString,
}

impl UpstreamConfig {
    fn from_env(url_var: &str, key_var: &str) -> Result<Self, ConfigError> {
        let base_url = get_required_env(url_var)?;
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar(url_var.to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: get_validated_secret(key_var)?,
        })
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("CHECKOUT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("CHECKOUT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_PORT".to_string(), e.to_string()))?;
        let idle_minutes = get_env_or_default("CHECKOUT_IDLE_MINUTES", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CHECKOUT_IDLE_MINUTES".to_string(), e.to_string())
            })?;
        let free_shipping_threshold = parse_decimal_env("CHECKOUT_FREE_SHIPPING_THRESHOLD", "25.00")?;
        let tax_rate = parse_decimal_env("CHECKOUT_TAX_RATE", "0")?;

        Ok(Self {
            host,
            port,
            idle_timeout: Duration::from_secs(idle_minutes * 60),
            free_shipping_threshold,
            tax_rate,
            address: UpstreamConfig::from_env("ADDRESS_API_URL", "ADDRESS_API_KEY")?,
            rates: UpstreamConfig::from_env("RATES_API_URL", "RATES_API_KEY")?,
            orders: UpstreamConfig::from_env("ORDERS_API_URL", "ORDERS_API_KEY")?,
            carts: UpstreamConfig::from_env("CARTS_API_URL", "CARTS_API_KEY")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a decimal environment variable, refusing negative values.
fn parse_decimal_env(key: &str, default: &str) -> Result<Decimal, ConfigError> {
    let value = get_env_or_default(key, default)
        .parse::<Decimal>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if value.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
