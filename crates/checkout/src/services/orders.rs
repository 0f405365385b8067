//! Commerce backend client: order sessions and payment confirmation.
//!
//! The backend owns orders and talks to the payment processor. This
//! service never holds card data; it creates an order session, hands the
//! processor token to the shopper's browser, and later confirms the
//! processor's result against the order.

use async_trait::async_trait;
use driftwood_core::{CartId, Email, MailingAddress, Money, OrderId, OrderStatus};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Errors that can occur when calling the commerce backend.
#[derive(Debug, Error)]
pub enum OrderServiceError {
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

/// Contact block of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Everything the backend needs to open an order for a checkout.
///
/// Built from a validated form; the types here assume parsing already
/// happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSubmission {
    pub cart_id: CartId,
    /// Cart revision the shopper saw. The backend rejects the session
    /// if the cart has moved past it.
    pub cart_version: u64,
    pub contact: ContactInfo,
    pub delivery_method: driftwood_core::DeliveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_notes: Option<String>,
    pub marketing_opt_in: bool,
    /// Absent for in-store pickup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<MailingAddress>,
    pub shipping: Money,
}

/// A freshly created order session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedSession {
    pub order_id: OrderId,
    /// Processor token the browser uses to collect payment. The backend
    /// omits it for zero-total orders.
    #[serde(default)]
    pub payment_token: Option<String>,
}

/// The backend's verdict after a confirmation call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Creates order sessions and settles them.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Opens an order session for a complete checkout.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend rejects the submission or
    /// cannot be reached.
    async fn create_session(
        &self,
        submission: &CheckoutSubmission,
    ) -> Result<CreatedSession, OrderServiceError>;

    /// Confirms a processor payment against an order.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor declined or the backend
    /// cannot be reached. The order stays pending either way.
    async fn confirm_payment(
        &self,
        order_id: &OrderId,
        payment_id: &str,
    ) -> Result<OrderConfirmation, OrderServiceError>;

    /// Completes a zero-total order without touching the processor.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend refuses, e.g. because the
    /// order turns out to have a balance due.
    async fn complete_free_order(
        &self,
        order_id: &OrderId,
    ) -> Result<OrderConfirmation, OrderServiceError>;
}

/// HTTP client for the commerce backend.
#[derive(Clone)]
pub struct OrderClient {
    client: reqwest::Client,
    base_url: String,
}

impl OrderClient {
    /// Create a new commerce backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &UpstreamConfig) -> Result<Self, OrderServiceError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| OrderServiceError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_for_confirmation(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<OrderConfirmation, OrderServiceError> {
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrderServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OrderServiceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl OrderGateway for OrderClient {
    async fn create_session(
        &self,
        submission: &CheckoutSubmission,
    ) -> Result<CreatedSession, OrderServiceError> {
        let url = format!("{}/v1/checkout-sessions", self.base_url);

        let response = self.client.post(&url).json(submission).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrderServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| OrderServiceError::Parse(e.to_string()))
    }

    async fn confirm_payment(
        &self,
        order_id: &OrderId,
        payment_id: &str,
    ) -> Result<OrderConfirmation, OrderServiceError> {
        let url = format!(
            "{}/v1/orders/{}/confirm-payment",
            self.base_url,
            urlencoding::encode(order_id.as_str())
        );
        let body = serde_json::json!({ "payment_id": payment_id });
        self.post_for_confirmation(url, body).await
    }

    async fn complete_free_order(
        &self,
        order_id: &OrderId,
    ) -> Result<OrderConfirmation, OrderServiceError> {
        let url = format!(
            "{}/v1/orders/{}/complete-free",
            self.base_url,
            urlencoding::encode(order_id.as_str())
        );
        self.post_for_confirmation(url, serde_json::json!({})).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use driftwood_core::CurrencyCode;

    #[test]
    fn test_submission_omits_address_for_pickup() {
        let submission = CheckoutSubmission {
            cart_id: CartId::from("cart_1"),
            cart_version: 4,
            contact: ContactInfo {
                first_name: "Nora".to_string(),
                last_name: "Bell".to_string(),
                email: Email::parse("nora@example.com").unwrap(),
                phone: None,
            },
            delivery_method: driftwood_core::DeliveryMethod::Pickup,
            delivery_notes: None,
            marketing_opt_in: false,
            shipping_address: None,
            shipping: Money::zero(CurrencyCode::USD),
        };

        let json = serde_json::to_value(&submission).unwrap();
        assert!(json.get("shipping_address").is_none());
        assert!(json.get("phone").is_none());
        assert_eq!(json["delivery_method"], "pickup");
    }

    #[test]
    fn test_created_session_token_defaults_to_none() {
        let session: CreatedSession =
            serde_json::from_str(r#"{"order_id":"ord_810"}"#).unwrap();
        assert_eq!(session.order_id.as_str(), "ord_810");
        assert_eq!(session.payment_token, None);
    }

    #[test]
    fn test_confirmation_parses_status() {
        let confirmation: OrderConfirmation =
            serde_json::from_str(r#"{"order_id":"ord_810","status":"confirmed"}"#).unwrap();
        assert_eq!(confirmation.status, OrderStatus::Confirmed);
    }
}
