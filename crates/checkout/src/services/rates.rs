//! Shipping rate client.

use async_trait::async_trait;
use driftwood_core::{DeliveryMethod, Money, PostalCode};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Errors that can occur when calling the rate service.
#[derive(Debug, Error)]
pub enum RateServiceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Carrier service level. Only delivery methods that actually ship have
/// one, so a pickup checkout cannot reach the rate service by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    Ground,
    Expedited,
}

impl ServiceLevel {
    #[must_use]
    pub const fn for_method(method: DeliveryMethod) -> Option<Self> {
        match method {
            DeliveryMethod::Standard => Some(Self::Ground),
            DeliveryMethod::Express => Some(Self::Expedited),
            DeliveryMethod::Pickup => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::Expedited => "expedited",
        }
    }
}

/// One physical line item as the rate service prices it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelItem {
    pub quantity: u32,
    pub weight_oz: Decimal,
    pub length_in: Decimal,
    pub width_in: Decimal,
    pub height_in: Decimal,
}

/// Prices a shipment to a destination.
#[async_trait]
pub trait ShippingRates: Send + Sync {
    /// Quotes shipping for the given items.
    ///
    /// # Errors
    ///
    /// Returns an error when the rate service cannot be reached or
    /// cannot price the shipment.
    async fn quote(
        &self,
        destination: &PostalCode,
        level: ServiceLevel,
        items: &[ParcelItem],
    ) -> Result<Money, RateServiceError>;
}

/// HTTP client for the rate service.
#[derive(Clone)]
pub struct RateClient {
    client: reqwest::Client,
    base_url: String,
}

impl RateClient {
    /// Create a new rate service client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &UpstreamConfig) -> Result<Self, RateServiceError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| RateServiceError::Parse(format!("Invalid API key format: {e}")))?,
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
impl ShippingRates for RateClient {
    async fn quote(
        &self,
        destination: &PostalCode,
        level: ServiceLevel,
        items: &[ParcelItem],
    ) -> Result<Money, RateServiceError> {
        let url = format!("{}/v1/rates", self.base_url);

        let body = serde_json::json!({
            "destination_zip": destination.as_str(),
            "service_level": level.as_str(),
            "items": items,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RateServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let rate: RateResponse = response
            .json()
            .await
            .map_err(|e| RateServiceError::Parse(e.to_string()))?;

        Ok(Money::new(rate.amount, rate.currency))
    }
}

/// Wire response from `POST /v1/rates`.
#[derive(Debug, Deserialize)]
struct RateResponse {
    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,
    currency: driftwood_core::CurrencyCode,
}
