//! HTTP route handlers for the checkout service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check
//!
//! # Checkout lifecycle
//! POST  /checkout                       - Open a checkout from a cart
//! GET   /checkout/{id}                  - Current wizard state
//! PATCH /checkout/{id}/form             - Apply a partial form update
//!
//! # Navigation
//! POST /checkout/{id}/next              - Validate and advance one step
//! POST /checkout/{id}/previous          - Step back (never validates)
//! POST /checkout/{id}/goto              - Jump directly to a step
//!
//! # Address verification
//! POST /checkout/{id}/address/verify    - Verify the entered address
//! POST /checkout/{id}/address/accept    - Accept the suggested address
//! POST /checkout/{id}/address/keep      - Keep the address as entered
//!
//! # Shipping and order session
//! POST /checkout/{id}/shipping/refresh  - Re-request a shipping quote
//! POST /checkout/{id}/session           - Retry order session creation
//!
//! # Payment
//! POST /checkout/{id}/pay               - Confirm payment with the processor
//! POST /checkout/{id}/pay/free          - Place a zero-total order
//! ```

pub mod checkout;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::start))
        .route("/{id}", get(checkout::show))
        .route("/{id}/form", patch(checkout::update_form))
        .route("/{id}/next", post(checkout::next))
        .route("/{id}/previous", post(checkout::previous))
        .route("/{id}/goto", post(checkout::goto))
        .route("/{id}/address/verify", post(checkout::verify_address))
        .route("/{id}/address/accept", post(checkout::accept_suggested))
        .route("/{id}/address/keep", post(checkout::keep_entered))
        .route("/{id}/shipping/refresh", post(checkout::refresh_shipping))
        .route("/{id}/session", post(checkout::create_session))
        .route("/{id}/pay", post(checkout::confirm_payment))
        .route("/{id}/pay/free", post(checkout::confirm_free))
}

/// Create all routes for the checkout service.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/checkout", checkout_routes())
}
