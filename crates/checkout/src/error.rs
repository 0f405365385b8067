//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every checkout error is recoverable: the response tells the shopper what
//! to fix or retry, and the checkout itself stays alive.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::flow::CheckoutError;
use crate::services::carts::CartServiceError;

/// Application-level error type for the checkout service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Internal(_)
                | Self::Checkout(CheckoutError::Money(_))
                | Self::Checkout(CheckoutError::Cart(
                    CartServiceError::Http(_) | CartServiceError::Api { .. } | CartServiceError::Parse(_)
                ))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Checkout(err) => match err {
                CheckoutError::NotFound(_)
                | CheckoutError::Cart(CartServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
                CheckoutError::Cart(_) | CheckoutError::ShippingUnavailable { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                CheckoutError::ValidationFailed { .. } | CheckoutError::JumpBlocked { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CheckoutError::Money(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::CONFLICT,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) | Self::Checkout(CheckoutError::Money(_)) => {
                "Internal server error".to_string()
            }
            Self::Checkout(CheckoutError::Cart(err)) => match err {
                CartServiceError::NotFound(_) => err.to_string(),
                _ => "Could not load the cart".to_string(),
            },
            Self::Checkout(err) => err.to_string(),
            Self::BadRequest(_) => self.to_string(),
        };

        let mut body = json!({ "error": message });
        if let Self::Checkout(err) = &self
            && let Some((step, fields)) = err.field_errors()
        {
            body["step"] = json!(step);
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
