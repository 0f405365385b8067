//! Cart service client.

use async_trait::async_trait;
use driftwood_core::CartId;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::cart::CartSnapshot;
use crate::config::UpstreamConfig;

/// Errors that can occur when loading a cart.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// No cart with the given id.
    #[error("Cart not found: {0}")]
    NotFound(CartId),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Loads cart snapshots from the commerce backend.
#[async_trait]
pub trait CartSource: Send + Sync {
    /// Fetches the current snapshot of a cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartServiceError::NotFound`] for unknown ids and other
    /// variants for transport or decoding failures.
    async fn fetch(&self, cart_id: &CartId) -> Result<CartSnapshot, CartServiceError>;
}

/// HTTP client for the cart service.
#[derive(Clone)]
pub struct CartClient {
    client: reqwest::Client,
    base_url: String,
}

impl CartClient {
    /// Create a new cart service client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &UpstreamConfig) -> Result<Self, CartServiceError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| CartServiceError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CartSource for CartClient {
    async fn fetch(&self, cart_id: &CartId) -> Result<CartSnapshot, CartServiceError> {
        let url = format!(
            "{}/v1/carts/{}",
            self.base_url,
            urlencoding::encode(cart_id.as_str())
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.as_u16() == 404 {
            return Err(CartServiceError::NotFound(cart_id.clone()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CartServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CartServiceError::Parse(e.to_string()))
    }
}
