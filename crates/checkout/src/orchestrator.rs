//! Sequencing for checkout operations.
//!
//! The orchestrator owns the store and the service clients and runs
//! every operation a route can ask for. Locking discipline: a flow's
//! mutex is held only to read or mutate state, never across an external
//! call. Before a call starts, the flow records an in-flight flag and
//! the generation counter; when the response arrives the flow is locked
//! again and the result is applied only if the generation still
//! matches. A response that lost that race is dropped on the floor.

use std::sync::Arc;

use driftwood_core::{CartId, CheckoutId, CheckoutStatus, Email, PhoneNumber, PostalCode};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::flow::{
    AddressReview, CheckoutError, CheckoutFlow, CheckoutSession, FormPatch, PatchOutcome,
    SessionStatus, ShippingCharge, ShippingQuote, ShippingStatus, Step,
};
use crate::services::{
    AddressVerifier, CartSource, CheckoutSubmission, ContactInfo, OrderGateway, ServiceLevel,
    ShippingRates, VerificationOutcome,
};
use crate::store::{CheckoutStore, SharedFlow};
use crate::view::CheckoutView;

/// Merchant-level pricing knobs.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutPolicy {
    /// Standard delivery ships free at or above this merchandise subtotal.
    pub free_shipping_threshold: Decimal,
    /// Flat sales tax rate applied to the discounted subtotal.
    pub tax_rate: Decimal,
}

// Shopper-facing messages for service failures. The technical cause goes
// to the log, never to the shopper.
const MSG_VERIFY_UNAVAILABLE: &str =
    "Address check is temporarily unavailable. Try again, or continue with the address as entered.";
const MSG_RATES_UNAVAILABLE: &str =
    "Shipping rates are temporarily unavailable. Please try again in a moment.";
const MSG_SESSION_FAILED: &str = "We couldn't start your order. Please try again.";
const MSG_PAYMENT_FAILED: &str = "Payment could not be confirmed. Please try again.";

pub struct Orchestrator {
    store: CheckoutStore,
    verifier: Arc<dyn AddressVerifier>,
    rates: Arc<dyn ShippingRates>,
    orders: Arc<dyn OrderGateway>,
    carts: Arc<dyn CartSource>,
    policy: CheckoutPolicy,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        store: CheckoutStore,
        verifier: Arc<dyn AddressVerifier>,
        rates: Arc<dyn ShippingRates>,
        orders: Arc<dyn OrderGateway>,
        carts: Arc<dyn CartSource>,
        policy: CheckoutPolicy,
    ) -> Self {
        Self {
            store,
            verifier,
            rates,
            orders,
            carts,
            policy,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Opens a checkout against a cart.
    ///
    /// # Errors
    ///
    /// Fails when the cart cannot be loaded or has nothing in it.
    pub async fn start(&self, cart_id: CartId) -> Result<CheckoutView, CheckoutError> {
        let cart = self.carts.fetch(&cart_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart(cart_id));
        }

        let flow = CheckoutFlow::new(CheckoutId::new(), cart);
        info!(checkout_id = %flow.id, cart_id = %cart_id, "checkout started");

        let shared = self.store.insert(flow).await;
        let flow = shared.lock().await;
        self.view(&flow)
    }

    /// Current state of a checkout.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NotFound`] when the id is unknown or expired.
    pub async fn get(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;
        let flow = shared.lock().await;
        self.view(&flow)
    }

    // ========================================================================
    // Form edits
    // ========================================================================

    /// Applies a partial form update.
    ///
    /// Completing the postal code on a deliverable address kicks off
    /// verification in the same request; everything else is a plain
    /// write plus whatever invalidation it causes.
    ///
    /// # Errors
    ///
    /// Fails when the checkout is gone, completed, or locked by an
    /// in-flight payment confirmation.
    pub async fn update_form(
        &self,
        id: CheckoutId,
        patch: FormPatch,
    ) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        let verify_now = {
            let mut flow = shared.lock().await;
            let outcome = flow.apply_patch(&patch)?;
            should_auto_verify(&flow, &outcome)
        };

        if verify_now {
            self.run_verification(&shared).await?;
        }

        let flow = shared.lock().await;
        self.view(&flow)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Advances one step, running whatever gates sit on the boundary.
    ///
    /// # Errors
    ///
    /// Validation failures, unresolved address review, and missing
    /// shipping figures all block the advance and say so.
    pub async fn next(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        let step = {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;
            let step = flow.step;
            if step.next().is_none() {
                return Err(CheckoutError::AtLastStep);
            }
            if !flow.refresh_step_errors(step) {
                return Err(validation_failed(&flow, step));
            }
            step
        };

        match step {
            Step::Contact | Step::Delivery => {
                let mut flow = shared.lock().await;
                advance(&mut flow);
            }
            Step::Address => {
                // Leaving the address step is the last implicit
                // verification trigger before review.
                self.run_verification(&shared).await?;
                {
                    let mut flow = shared.lock().await;
                    if !flow.address_settled() {
                        return Err(address_unsettled(&flow));
                    }
                    advance(&mut flow);
                }
                // A quote failure surfaces on the review screen; it only
                // blocks the step after this one.
                self.run_quote(&shared).await?;
            }
            Step::Review => {
                {
                    let mut flow = shared.lock().await;
                    for earlier in [Step::Contact, Step::Delivery, Step::Address] {
                        if !flow.refresh_step_errors(earlier) {
                            return Err(validation_failed(&flow, earlier));
                        }
                    }
                    if !flow.address_settled() {
                        return Err(address_unsettled(&flow));
                    }
                }
                self.run_quote(&shared).await?;
                {
                    let mut flow = shared.lock().await;
                    if flow.shipping.quote().is_none() {
                        return Err(shipping_unavailable(&flow));
                    }
                    advance(&mut flow);
                }
                self.ensure_session(&shared).await?;
            }
            Step::Payment => return Err(CheckoutError::AtLastStep),
        }

        let flow = shared.lock().await;
        self.view(&flow)
    }

    /// Steps back one screen. Never validates; going back is always
    /// allowed and loses nothing.
    ///
    /// # Errors
    ///
    /// Fails at the first step, on completed checkouts, and while a
    /// payment confirmation is in flight.
    pub async fn previous(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;
        let mut flow = shared.lock().await;
        flow.ensure_mutable()?;

        let Some(target) = flow.step.previous() else {
            return Err(CheckoutError::AtFirstStep);
        };
        flow.step = target;
        flow.touch();
        self.view(&flow)
    }

    /// Jumps straight to a step.
    ///
    /// Backward jumps always land. A forward jump first re-validates the
    /// current step and every step it skips; landing on payment also
    /// runs the full payment-entry gate, exactly as if the shopper had
    /// walked there.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::JumpBlocked`] names the first step that failed
    /// validation; payment-entry gate failures use their own variants.
    pub async fn goto(&self, id: CheckoutId, target: Step) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        let quote_after = {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;

            if target == flow.step {
                return self.view(&flow);
            }
            if target < flow.step {
                flow.step = target;
                flow.touch();
                return self.view(&flow);
            }

            let from = flow.step;
            for step in std::iter::once(from).chain(from.strictly_between(target)) {
                if !flow.refresh_step_errors(step) {
                    let errors = flow.errors.get(&step).cloned().unwrap_or_default();
                    return Err(CheckoutError::JumpBlocked { step, errors });
                }
            }

            if target == Step::Payment {
                if !flow.address_settled() {
                    return Err(address_unsettled(&flow));
                }
            } else {
                flow.step = target;
                flow.touch();
            }

            // Landing past the address step with a settled address keeps
            // the review screen priced.
            target >= Step::Review && flow.address_settled()
        };

        if target == Step::Payment {
            self.run_quote(&shared).await?;
            {
                let mut flow = shared.lock().await;
                if flow.shipping.quote().is_none() {
                    return Err(shipping_unavailable(&flow));
                }
                flow.step = Step::Payment;
                flow.touch();
            }
            self.ensure_session(&shared).await?;
        } else if quote_after {
            self.run_quote(&shared).await?;
        }

        let flow = shared.lock().await;
        self.view(&flow)
    }

    // ========================================================================
    // Address verification
    // ========================================================================

    /// Explicit verification trigger, e.g. when the address fields lose
    /// focus on the client.
    ///
    /// # Errors
    ///
    /// Fails when the address fields do not pass local validation;
    /// vendor failures land in the view instead.
    pub async fn verify_address(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;
        self.run_verification(&shared).await?;
        let flow = shared.lock().await;
        self.view(&flow)
    }

    /// Replaces the entered address with the vendor's suggestion and
    /// marks it verified.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoPendingReview`] unless a suggestion is
    /// actually pending.
    pub async fn accept_suggested(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;

            let AddressReview::SuggestionPending { suggested, .. } = &flow.address else {
                return Err(CheckoutError::NoPendingReview);
            };
            let suggested = suggested.clone();

            // Mirrors the invalidation cascade of a form edit, except the
            // address lands verified instead of unverified.
            flow.form.put_address(&suggested);
            flow.generation += 1;
            flow.refresh_step_errors(Step::Address);
            flow.address = AddressReview::Verified {
                standardized: suggested,
            };
            flow.shipping = ShippingStatus::NotQuoted;
            flow.session = SessionStatus::NotCreated;
            flow.payment_error = None;
            flow.touch();
        }

        self.run_quote(&shared).await?;
        let flow = shared.lock().await;
        self.view(&flow)
    }

    /// Resolves an address review in favor of what the shopper typed.
    ///
    /// With a suggestion pending this just closes the prompt and leaves
    /// the address unverified for further editing. After a hard
    /// verification failure it records an explicit override, which
    /// counts as settled.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoPendingReview`] when there is nothing to
    /// resolve.
    pub async fn keep_entered(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        let quote_after = {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;

            match &flow.address {
                AddressReview::SuggestionPending { .. } => {
                    flow.address = AddressReview::Unverified;
                    flow.touch();
                    false
                }
                AddressReview::Unverifiable { .. } | AddressReview::CheckFailed { .. } => {
                    flow.address = AddressReview::Overridden;
                    flow.touch();
                    true
                }
                _ => return Err(CheckoutError::NoPendingReview),
            }
        };

        if quote_after {
            self.run_quote(&shared).await?;
        }
        let flow = shared.lock().await;
        self.view(&flow)
    }

    // ========================================================================
    // Shipping
    // ========================================================================

    /// Retries shipping calculation after a failure.
    ///
    /// # Errors
    ///
    /// Fails when the delivery step is incomplete or the address is not
    /// settled yet; a rate-service failure lands in the view.
    pub async fn refresh_shipping(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;
            if !flow.refresh_step_errors(Step::Delivery) {
                return Err(validation_failed(&flow, Step::Delivery));
            }
            if !flow.address_settled() {
                return Err(address_unsettled(&flow));
            }
        }

        self.run_quote(&shared).await?;
        let flow = shared.lock().await;
        self.view(&flow)
    }

    // ========================================================================
    // Order session and payment
    // ========================================================================

    /// Retries order-session creation after a failure on the payment
    /// step. A live session makes this a no-op.
    ///
    /// # Errors
    ///
    /// Fails off the payment step; creation failures land in the view.
    pub async fn create_session(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;
            if flow.step != Step::Payment {
                return Err(CheckoutError::NotOnPaymentStep);
            }
        }

        // An address edit made on the payment step clears the quote; win
        // it back before resubmitting.
        self.run_quote(&shared).await?;
        self.ensure_session(&shared).await?;

        let flow = shared.lock().await;
        self.view(&flow)
    }

    /// Confirms a processor payment against the open order session.
    ///
    /// Repeating the call after success returns the completed state
    /// unchanged, so a client that lost the first response can settle.
    ///
    /// # Errors
    ///
    /// Fails without a session, off the payment step, for zero-total
    /// orders, and while another confirmation is already in flight. A
    /// declined or unreachable processor lands in the view instead.
    pub async fn confirm_payment(
        &self,
        id: CheckoutId,
        payment_id: &str,
    ) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        let (order_id, generation) = {
            let mut flow = shared.lock().await;
            if flow.status == CheckoutStatus::Completed {
                return self.view(&flow);
            }
            if flow.in_flight.payment {
                return Err(CheckoutError::PaymentInFlight);
            }
            if flow.step != Step::Payment {
                return Err(CheckoutError::NotOnPaymentStep);
            }
            let Some(session) = flow.session.active() else {
                return Err(CheckoutError::NoSession);
            };
            let order_id = session.order_id.clone();

            let summary = flow.summary(self.policy.tax_rate)?;
            if summary.total.is_none() {
                return Err(CheckoutError::TotalPending);
            }
            if summary.is_free() {
                return Err(CheckoutError::ZeroTotal);
            }

            flow.in_flight.payment = true;
            flow.payment_error = None;
            (order_id, flow.generation)
        };

        let result = self.orders.confirm_payment(&order_id, payment_id).await;

        {
            let mut flow = shared.lock().await;
            flow.in_flight.payment = false;
            if flow.generation != generation {
                debug!(checkout_id = %flow.id, "discarding stale payment confirmation");
            } else {
                match result {
                    Ok(confirmation) => {
                        info!(
                            checkout_id = %flow.id,
                            order_id = %confirmation.order_id,
                            "payment confirmed, checkout complete"
                        );
                        flow.complete(confirmation.order_id, confirmation.status);
                    }
                    Err(e) => {
                        warn!(checkout_id = %flow.id, error = %e, "payment confirmation failed");
                        flow.payment_error = Some(service_message(&e, MSG_PAYMENT_FAILED));
                        flow.touch();
                    }
                }
            }
            self.view(&flow)
        }
    }

    /// Completes a zero-total order without a processor round trip.
    ///
    /// # Errors
    ///
    /// Fails unless the priced total is exactly zero; otherwise mirrors
    /// [`Orchestrator::confirm_payment`].
    pub async fn confirm_free(&self, id: CheckoutId) -> Result<CheckoutView, CheckoutError> {
        let shared = self.flow(id).await?;

        let (order_id, generation) = {
            let mut flow = shared.lock().await;
            if flow.status == CheckoutStatus::Completed {
                return self.view(&flow);
            }
            if flow.in_flight.payment {
                return Err(CheckoutError::PaymentInFlight);
            }
            if flow.step != Step::Payment {
                return Err(CheckoutError::NotOnPaymentStep);
            }
            let Some(session) = flow.session.active() else {
                return Err(CheckoutError::NoSession);
            };
            let order_id = session.order_id.clone();

            let summary = flow.summary(self.policy.tax_rate)?;
            if summary.total.is_none() {
                return Err(CheckoutError::TotalPending);
            }
            if !summary.is_free() {
                return Err(CheckoutError::NonZeroTotal);
            }

            flow.in_flight.payment = true;
            flow.payment_error = None;
            (order_id, flow.generation)
        };

        let result = self.orders.complete_free_order(&order_id).await;

        {
            let mut flow = shared.lock().await;
            flow.in_flight.payment = false;
            if flow.generation != generation {
                debug!(checkout_id = %flow.id, "discarding stale free-order completion");
            } else {
                match result {
                    Ok(confirmation) => {
                        info!(
                            checkout_id = %flow.id,
                            order_id = %confirmation.order_id,
                            "free order placed, checkout complete"
                        );
                        flow.complete(confirmation.order_id, confirmation.status);
                    }
                    Err(e) => {
                        warn!(checkout_id = %flow.id, error = %e, "free-order completion failed");
                        flow.payment_error = Some(service_message(&e, MSG_PAYMENT_FAILED));
                        flow.touch();
                    }
                }
            }
            self.view(&flow)
        }
    }

    // ========================================================================
    // Internal sequencing
    // ========================================================================

    async fn flow(&self, id: CheckoutId) -> Result<SharedFlow, CheckoutError> {
        self.store
            .get(&id)
            .await
            .ok_or(CheckoutError::NotFound(id))
    }

    fn view(&self, flow: &CheckoutFlow) -> Result<CheckoutView, CheckoutError> {
        Ok(CheckoutView::project(flow, self.policy.tax_rate)?)
    }

    /// Runs one address verification round if the flow needs it.
    ///
    /// No-ops when pickup is selected, when the address is already
    /// settled, when a suggestion is waiting on the shopper, and when
    /// another verification is in flight. The vendor's answer is only
    /// applied if nothing changed while the call was out.
    async fn run_verification(&self, shared: &SharedFlow) -> Result<(), CheckoutError> {
        let (address, generation) = {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;

            if flow.in_flight.verification || !flow.form.needs_shipping_address() {
                return Ok(());
            }
            match flow.address {
                AddressReview::Unverified
                | AddressReview::Unverifiable { .. }
                | AddressReview::CheckFailed { .. } => {}
                AddressReview::Verified { .. }
                | AddressReview::SuggestionPending { .. }
                | AddressReview::Overridden => return Ok(()),
            }
            if !flow.refresh_step_errors(Step::Address) {
                return Err(validation_failed(&flow, Step::Address));
            }

            flow.in_flight.verification = true;
            (flow.form.shipping_address(), flow.generation)
        };

        let result = self.verifier.verify(&address).await;

        let quote_after = {
            let mut flow = shared.lock().await;
            flow.in_flight.verification = false;

            if flow.generation != generation {
                debug!(checkout_id = %flow.id, "discarding stale verification result");
                false
            } else {
                flow.touch();
                match result {
                    Ok(VerificationOutcome::Verified { standardized }) => {
                        debug!(checkout_id = %flow.id, "address verified");
                        flow.address = AddressReview::Verified { standardized };
                        true
                    }
                    Ok(VerificationOutcome::CorrectionsAvailable {
                        standardized,
                        corrections,
                    }) => {
                        debug!(
                            checkout_id = %flow.id,
                            corrections = corrections.len(),
                            "address suggestion pending"
                        );
                        flow.address = AddressReview::SuggestionPending {
                            entered: address,
                            suggested: standardized,
                            corrections,
                        };
                        false
                    }
                    Ok(VerificationOutcome::Failed { reason }) => {
                        debug!(checkout_id = %flow.id, %reason, "address unverifiable");
                        flow.address = AddressReview::Unverifiable { reason };
                        false
                    }
                    Err(e) => {
                        warn!(checkout_id = %flow.id, error = %e, "address verification call failed");
                        flow.address = AddressReview::CheckFailed {
                            message: MSG_VERIFY_UNAVAILABLE.to_string(),
                        };
                        false
                    }
                }
            }
        };

        // A clean verification flows straight into shipping calculation.
        if quote_after {
            self.run_quote(shared).await?;
        }
        Ok(())
    }

    /// Prices shipping if the flow is ready for it and has no current
    /// figure. Free outcomes are decided locally; rated ones go to the
    /// rate service under the usual generation guard.
    async fn run_quote(&self, shared: &SharedFlow) -> Result<(), CheckoutError> {
        let (destination, level, items, generation) = {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;

            if flow.in_flight.quote || flow.shipping.quote().is_some() {
                return Ok(());
            }
            let Some(method) = flow.form.delivery_method else {
                return Ok(());
            };
            if !flow.address_settled() {
                return Ok(());
            }

            let subtotal = flow.cart.subtotal()?;
            let threshold = self.policy.free_shipping_threshold;
            let destination = PostalCode::parse(&flow.form.postal_code).ok();

            match ShippingCharge::decide(method, &subtotal, threshold) {
                ShippingCharge::Free(reason) => {
                    debug!(checkout_id = %flow.id, ?reason, "shipping free");
                    let destination = method
                        .requires_shipping_address()
                        .then_some(destination)
                        .flatten();
                    flow.shipping = ShippingStatus::Quoted(ShippingQuote {
                        amount: driftwood_core::Money::zero(flow.cart.currency),
                        destination,
                    });
                    flow.touch();
                    return Ok(());
                }
                ShippingCharge::Rated => {
                    let Some(level) = ServiceLevel::for_method(method) else {
                        return Ok(());
                    };
                    let Some(destination) = destination else {
                        // Overridden addresses still passed field
                        // validation, so this only happens mid-edit.
                        return Ok(());
                    };
                    flow.in_flight.quote = true;
                    (destination, level, flow.cart.parcel_items(), flow.generation)
                }
            }
        };

        let result = self.rates.quote(&destination, level, &items).await;

        {
            let mut flow = shared.lock().await;
            flow.in_flight.quote = false;

            if flow.generation != generation {
                debug!(checkout_id = %flow.id, "discarding stale shipping quote");
                return Ok(());
            }
            flow.touch();
            match result {
                Ok(amount) => {
                    debug!(checkout_id = %flow.id, %amount, "shipping quoted");
                    flow.shipping = ShippingStatus::Quoted(ShippingQuote {
                        amount,
                        destination: Some(destination),
                    });
                }
                Err(e) => {
                    warn!(checkout_id = %flow.id, error = %e, "shipping quote failed");
                    flow.shipping = ShippingStatus::Failed {
                        message: MSG_RATES_UNAVAILABLE.to_string(),
                    };
                }
            }
        }
        Ok(())
    }

    /// Creates the backend order session for the current form snapshot,
    /// reusing a live session whose fingerprint still matches.
    async fn ensure_session(&self, shared: &SharedFlow) -> Result<(), CheckoutError> {
        let (submission, fingerprint, generation) = {
            let mut flow = shared.lock().await;
            flow.ensure_mutable()?;

            if flow.in_flight.session {
                return Ok(());
            }

            let fingerprint = flow.fingerprint();
            if let Some(session) = flow.session.active() {
                if session.fingerprint == fingerprint {
                    return Ok(());
                }
                // A session for data the shopper has since changed must
                // never be paid against.
                flow.session = SessionStatus::NotCreated;
            }

            for step in [Step::Contact, Step::Delivery, Step::Address] {
                if !flow.refresh_step_errors(step) {
                    return Err(validation_failed(&flow, step));
                }
            }
            if !flow.address_settled() {
                return Err(address_unsettled(&flow));
            }
            let Some(quote) = flow.shipping.quote() else {
                return Err(shipping_unavailable(&flow));
            };

            let submission = build_submission(&flow, quote)?;
            flow.in_flight.session = true;
            (submission, fingerprint, flow.generation)
        };

        let result = self.orders.create_session(&submission).await;

        {
            let mut flow = shared.lock().await;
            flow.in_flight.session = false;

            if flow.generation != generation {
                debug!(checkout_id = %flow.id, "discarding stale order session");
                return Ok(());
            }
            flow.touch();
            match result {
                Ok(created) => {
                    info!(
                        checkout_id = %flow.id,
                        order_id = %created.order_id,
                        free = created.payment_token.is_none(),
                        "order session created"
                    );
                    flow.session = SessionStatus::Active(CheckoutSession {
                        order_id: created.order_id,
                        payment_token: created.payment_token,
                        fingerprint,
                    });
                }
                Err(e) => {
                    warn!(checkout_id = %flow.id, error = %e, "order session creation failed");
                    flow.session = SessionStatus::Failed {
                        message: service_message(&e, MSG_SESSION_FAILED),
                    };
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn advance(flow: &mut CheckoutFlow) {
    if let Some(next) = flow.step.next() {
        flow.step = next;
        flow.touch();
    }
}

fn validation_failed(flow: &CheckoutFlow, step: Step) -> CheckoutError {
    CheckoutError::ValidationFailed {
        step,
        errors: flow.errors.get(&step).cloned().unwrap_or_default(),
    }
}

fn address_unsettled(flow: &CheckoutFlow) -> CheckoutError {
    match flow.address {
        AddressReview::SuggestionPending { .. } => CheckoutError::AddressReviewPending,
        _ => CheckoutError::AddressUnverified,
    }
}

fn shipping_unavailable(flow: &CheckoutFlow) -> CheckoutError {
    let message = match &flow.shipping {
        ShippingStatus::Failed { message } => message.clone(),
        _ => "Shipping cost has not been calculated yet.".to_string(),
    };
    CheckoutError::ShippingUnavailable { message }
}

/// A patch that completes a parseable postal code on an otherwise valid
/// address triggers verification without waiting for an explicit cue.
fn should_auto_verify(flow: &CheckoutFlow, outcome: &PatchOutcome) -> bool {
    outcome
        .changed
        .iter()
        .any(|field| *field == crate::flow::Field::PostalCode)
        && flow.form.needs_shipping_address()
        && flow.address == AddressReview::Unverified
        && !flow.in_flight.verification
        && crate::flow::validate_step(Step::Address, &flow.form).is_empty()
}

/// Everything the backend order needs, pulled from a validated flow.
fn build_submission(
    flow: &CheckoutFlow,
    quote: &ShippingQuote,
) -> Result<CheckoutSubmission, CheckoutError> {
    let email = Email::parse(&flow.form.email).map_err(|e| CheckoutError::ValidationFailed {
        step: Step::Contact,
        errors: [(crate::flow::Field::Email, e.to_string())].into(),
    })?;

    let phone = flow.form.phone.trim();
    let phone = if phone.is_empty() {
        None
    } else {
        let parsed =
            PhoneNumber::parse(phone).map_err(|e| CheckoutError::ValidationFailed {
                step: Step::Contact,
                errors: [(crate::flow::Field::Phone, e.to_string())].into(),
            })?;
        Some(parsed.as_str().to_string())
    };

    let Some(delivery_method) = flow.form.delivery_method else {
        return Err(CheckoutError::ValidationFailed {
            step: Step::Delivery,
            errors: [(
                crate::flow::Field::DeliveryMethod,
                "Choose a delivery method".to_string(),
            )]
            .into(),
        });
    };

    // Prefer the vendor's canonical form when the address is verified.
    let shipping_address = if flow.form.needs_shipping_address() {
        Some(match &flow.address {
            AddressReview::Verified { standardized } => standardized.clone(),
            _ => flow.form.shipping_address(),
        })
    } else {
        None
    };

    let notes = flow.form.delivery_notes.trim();

    Ok(CheckoutSubmission {
        cart_id: flow.cart.id.clone(),
        cart_version: flow.cart.version,
        contact: ContactInfo {
            first_name: flow.form.first_name.trim().to_string(),
            last_name: flow.form.last_name.trim().to_string(),
            email,
            phone,
        },
        delivery_method,
        delivery_notes: (!notes.is_empty()).then(|| notes.to_string()),
        marketing_opt_in: flow.form.marketing_opt_in,
        shipping_address,
        shipping: quote.amount,
    })
}

/// Picks the shopper-facing message for a failed backend call: the
/// backend's own message when it sent one, a generic line otherwise.
fn service_message(error: &crate::services::OrderServiceError, fallback: &str) -> String {
    match error {
        crate::services::OrderServiceError::Api { message, .. } if !message.trim().is_empty() => {
            message.clone()
        }
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{CartLine, CartSnapshot, Dimensions};
    use crate::flow::Field;
    use driftwood_core::{CurrencyCode, DeliveryMethod, Money};

    fn flow() -> CheckoutFlow {
        let cart = CartSnapshot {
            id: CartId::from("cart_1"),
            version: 1,
            currency: CurrencyCode::USD,
            lines: vec![CartLine {
                id: "line_1".to_string(),
                title: "Canvas tote".to_string(),
                quantity: 1,
                unit_price: Money::from_cents(1_999, CurrencyCode::USD),
                weight_oz: Decimal::new(10, 0),
                dimensions: Dimensions {
                    length_in: Decimal::new(14, 0),
                    width_in: Decimal::new(12, 0),
                    height_in: Decimal::new(4, 0),
                },
            }],
            discount: Money::zero(CurrencyCode::USD),
        };
        let mut flow = CheckoutFlow::new(CheckoutId::new(), cart);
        flow.form.first_name = "Nora".to_string();
        flow.form.last_name = "Bell".to_string();
        flow.form.email = "nora@example.com".to_string();
        flow.form.delivery_method = Some(DeliveryMethod::Standard);
        flow.form.street = "123 Harbor Ln".to_string();
        flow.form.city = "Portsmouth".to_string();
        flow.form.state = "NH".to_string();
        flow.form.postal_code = "03801".to_string();
        flow
    }

    fn quote() -> ShippingQuote {
        ShippingQuote {
            amount: Money::from_cents(495, CurrencyCode::USD),
            destination: Some(PostalCode::parse("03801").unwrap()),
        }
    }

    #[test]
    fn test_auto_verify_fires_on_completed_postal_code() {
        let flow = flow();
        let outcome = PatchOutcome {
            changed: vec![Field::PostalCode],
        };
        assert!(should_auto_verify(&flow, &outcome));
    }

    #[test]
    fn test_auto_verify_waits_for_the_rest_of_the_address() {
        let mut flow = flow();
        flow.form.street = String::new();
        let outcome = PatchOutcome {
            changed: vec![Field::PostalCode],
        };
        assert!(!should_auto_verify(&flow, &outcome));
    }

    #[test]
    fn test_auto_verify_ignores_pickup_and_other_fields() {
        let mut flow = flow();
        let email_only = PatchOutcome {
            changed: vec![Field::Email],
        };
        assert!(!should_auto_verify(&flow, &email_only));

        flow.form.delivery_method = Some(DeliveryMethod::Pickup);
        let postal = PatchOutcome {
            changed: vec![Field::PostalCode],
        };
        assert!(!should_auto_verify(&flow, &postal));
    }

    #[test]
    fn test_submission_uses_standardized_address_when_verified() {
        let mut flow = flow();
        let mut standardized = flow.form.shipping_address();
        standardized.street = "123 HARBOR LN".to_string();
        flow.address = AddressReview::Verified {
            standardized: standardized.clone(),
        };

        let submission = build_submission(&flow, &quote()).unwrap();
        assert_eq!(submission.shipping_address, Some(standardized));
        assert_eq!(submission.shipping, Money::from_cents(495, CurrencyCode::USD));
    }

    #[test]
    fn test_submission_keeps_entered_address_when_overridden() {
        let mut flow = flow();
        flow.address = AddressReview::Overridden;

        let submission = build_submission(&flow, &quote()).unwrap();
        assert_eq!(submission.shipping_address, Some(flow.form.shipping_address()));
    }

    #[test]
    fn test_submission_drops_address_and_blank_notes_for_pickup() {
        let mut flow = flow();
        flow.form.delivery_method = Some(DeliveryMethod::Pickup);
        flow.form.delivery_notes = "   ".to_string();

        let submission = build_submission(&flow, &quote()).unwrap();
        assert_eq!(submission.shipping_address, None);
        assert_eq!(submission.delivery_notes, None);
        assert_eq!(submission.cart_version, 1);
    }

    #[test]
    fn test_service_message_prefers_backend_text() {
        let declined = crate::services::OrderServiceError::Api {
            status: 402,
            message: "Card declined".to_string(),
        };
        assert_eq!(service_message(&declined, "fallback"), "Card declined");

        let blank = crate::services::OrderServiceError::Api {
            status: 502,
            message: "  ".to_string(),
        };
        assert_eq!(service_message(&blank, "fallback"), "fallback");
    }
}
