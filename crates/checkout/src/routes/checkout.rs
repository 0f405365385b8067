//! Checkout route handlers.
//!
//! Every handler returns the full [`CheckoutView`] so the client can redraw
//! the wizard from a single response. Rejections come back as structured
//! errors via [`crate::error::AppError`] and leave the checkout untouched.

use axum::{
    Json,
    extract::{Path, State},
};
use driftwood_core::{CartId, CheckoutId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::flow::{FormPatch, Step};
use crate::state::AppState;
use crate::view::CheckoutView;

/// Request to open a checkout for a cart.
#[derive(Debug, Deserialize)]
pub struct StartCheckoutRequest {
    pub cart_id: CartId,
}

/// Request to jump directly to a step.
#[derive(Debug, Deserialize)]
pub struct GotoRequest {
    pub step: Step,
}

/// Request to confirm payment with a processor payment id.
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_id: String,
}

/// Open a new checkout from a cart.
///
/// POST /checkout
#[instrument(skip(state))]
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartCheckoutRequest>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().start(req.cart_id).await?;
    Ok(Json(view))
}

/// Fetch the current state of a checkout.
///
/// GET /checkout/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().get(id).await?;
    Ok(Json(view))
}

/// Apply a partial form update.
///
/// PATCH /checkout/{id}/form
#[instrument(skip(state, patch))]
pub async fn update_form(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
    Json(patch): Json<FormPatch>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().update_form(id, patch).await?;
    Ok(Json(view))
}

/// Advance to the next step.
///
/// POST /checkout/{id}/next
#[instrument(skip(state))]
pub async fn next(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().next(id).await?;
    Ok(Json(view))
}

/// Go back one step.
///
/// POST /checkout/{id}/previous
#[instrument(skip(state))]
pub async fn previous(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().previous(id).await?;
    Ok(Json(view))
}

/// Jump directly to a step.
///
/// POST /checkout/{id}/goto
#[instrument(skip(state))]
pub async fn goto(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
    Json(req): Json<GotoRequest>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().goto(id, req.step).await?;
    Ok(Json(view))
}

/// Run address verification for the entered shipping address.
///
/// POST /checkout/{id}/address/verify
#[instrument(skip(state))]
pub async fn verify_address(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().verify_address(id).await?;
    Ok(Json(view))
}

/// Accept the suggested standardized address.
///
/// POST /checkout/{id}/address/accept
#[instrument(skip(state))]
pub async fn accept_suggested(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().accept_suggested(id).await?;
    Ok(Json(view))
}

/// Keep the address as entered, declining the suggestion or overriding a
/// failed check.
///
/// POST /checkout/{id}/address/keep
#[instrument(skip(state))]
pub async fn keep_entered(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().keep_entered(id).await?;
    Ok(Json(view))
}

/// Re-request a shipping quote after a rate failure.
///
/// POST /checkout/{id}/shipping/refresh
#[instrument(skip(state))]
pub async fn refresh_shipping(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().refresh_shipping(id).await?;
    Ok(Json(view))
}

/// Retry creating the order session after a failure.
///
/// POST /checkout/{id}/session
#[instrument(skip(state))]
pub async fn create_session(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().create_session(id).await?;
    Ok(Json(view))
}

/// Confirm payment for an order with a balance due.
///
/// POST /checkout/{id}/pay
#[instrument(skip(state, req))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<CheckoutView>> {
    let view = state
        .orchestrator()
        .confirm_payment(id, &req.payment_id)
        .await?;
    Ok(Json(view))
}

/// Place an order whose total is zero without touching the payment processor.
///
/// POST /checkout/{id}/pay/free
#[instrument(skip(state))]
pub async fn confirm_free(
    State(state): State<AppState>,
    Path(id): Path<CheckoutId>,
) -> Result<Json<CheckoutView>> {
    let view = state.orchestrator().confirm_free(id).await?;
    Ok(Json(view))
}
