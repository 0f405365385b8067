//! In-memory state of one checkout attempt.
//!
//! [`CheckoutFlow`] is the single source of truth for a checkout: the
//! form draft, the current step, validation errors, and the outcome of
//! every external call made on its behalf. It is pure state; the
//! orchestrator owns sequencing and I/O.

use chrono::{DateTime, Utc};
use driftwood_core::{
    CheckoutId, CheckoutStatus, MailingAddress, Money, MoneyError, OrderId, OrderStatus, PostalCode,
};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use super::error::CheckoutError;
use super::form::{CheckoutForm, FormPatch, PatchOutcome};
use super::step::Step;
use super::totals::OrderSummary;
use super::validate::{StepErrors, validate_step};
use crate::cart::CartSnapshot;

// ============================================================================
// Derived state
// ============================================================================

/// Where the shipping address stands with the verification service.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressReview {
    /// Never checked, or invalidated by an edit since the last check.
    Unverified,
    /// The service confirmed the address as entered.
    Verified { standardized: MailingAddress },
    /// The service proposed a materially different standardized form;
    /// the shopper has to pick one.
    SuggestionPending {
        entered: MailingAddress,
        suggested: MailingAddress,
        corrections: Vec<String>,
    },
    /// The service could not match the address at all.
    Unverifiable { reason: String },
    /// The verification call itself failed. Distinct from
    /// [`AddressReview::Unverifiable`] so the shopper sees "try again"
    /// rather than "fix your address".
    CheckFailed { message: String },
    /// The shopper chose to continue with an address the service would
    /// not confirm.
    Overridden,
}

impl AddressReview {
    /// True when the flow may treat the address as settled.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        matches!(self, Self::Verified { .. } | Self::Overridden)
    }

    /// True in the states where "use it as entered" is offered.
    #[must_use]
    pub const fn can_override(&self) -> bool {
        matches!(self, Self::Unverifiable { .. } | Self::CheckFailed { .. })
    }
}

/// A shipping figure and the destination it was priced for.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingQuote {
    pub amount: Money,
    /// `None` for in-store pickup, which has no destination.
    pub destination: Option<PostalCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShippingStatus {
    NotQuoted,
    Quoted(ShippingQuote),
    Failed { message: String },
}

impl ShippingStatus {
    #[must_use]
    pub const fn quote(&self) -> Option<&ShippingQuote> {
        match self {
            Self::Quoted(quote) => Some(quote),
            Self::NotQuoted | Self::Failed { .. } => None,
        }
    }
}

/// A backend order session bound to one exact form snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub order_id: OrderId,
    /// Processor token for collecting payment. Absent for zero-total
    /// orders, which never touch the processor.
    pub payment_token: Option<String>,
    /// Fingerprint of the form and cart the session was created from.
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    NotCreated,
    Active(CheckoutSession),
    Failed { message: String },
}

impl SessionStatus {
    #[must_use]
    pub const fn active(&self) -> Option<&CheckoutSession> {
        match self {
            Self::Active(session) => Some(session),
            Self::NotCreated | Self::Failed { .. } => None,
        }
    }
}

/// The order that came out of a completed checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// One flag per kind of external call. At most one call of each kind
/// runs for a given checkout at any moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    pub verification: bool,
    pub quote: bool,
    pub session: bool,
    pub payment: bool,
}

// ============================================================================
// The flow
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutFlow {
    pub id: CheckoutId,
    pub cart: CartSnapshot,
    pub form: CheckoutForm,
    pub step: Step,
    pub status: CheckoutStatus,
    pub errors: StepErrors,
    pub address: AddressReview,
    pub shipping: ShippingStatus,
    pub session: SessionStatus,
    /// Message from the most recent failed payment confirmation.
    pub payment_error: Option<String>,
    pub order: Option<PlacedOrder>,
    /// Bumped on every effective mutation. Responses from external calls
    /// stamped with an older generation are discarded on arrival.
    pub generation: u64,
    pub in_flight: InFlight,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutFlow {
    #[must_use]
    pub fn new(id: CheckoutId, cart: CartSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id,
            cart,
            form: CheckoutForm::new(),
            step: Step::FIRST,
            status: CheckoutStatus::InProgress,
            errors: StepErrors::new(),
            address: AddressReview::Unverified,
            shipping: ShippingStatus::NotQuoted,
            session: SessionStatus::NotCreated,
            payment_error: None,
            order: None,
            generation: 0,
            in_flight: InFlight::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Errors unless the flow still accepts edits.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Completed`] after the order is placed and
    /// [`CheckoutError::PaymentInFlight`] while a confirmation call is
    /// outstanding.
    pub fn ensure_mutable(&self) -> Result<(), CheckoutError> {
        if self.status == CheckoutStatus::Completed {
            return Err(CheckoutError::Completed);
        }
        if self.in_flight.payment {
            return Err(CheckoutError::PaymentInFlight);
        }
        Ok(())
    }

    /// Applies a form patch, then invalidates whatever the change made
    /// stale. A patch that changes nothing invalidates nothing.
    ///
    /// # Errors
    ///
    /// See [`CheckoutFlow::ensure_mutable`].
    pub fn apply_patch(&mut self, patch: &FormPatch) -> Result<PatchOutcome, CheckoutError> {
        self.ensure_mutable()?;

        let outcome = self.form.apply(patch);
        if !outcome.any() {
            return Ok(outcome);
        }

        self.generation += 1;
        for step in outcome.touched_steps() {
            self.refresh_step_errors(step);
        }

        if outcome.address_changed() {
            self.address = AddressReview::Unverified;
            self.shipping = ShippingStatus::NotQuoted;
        }
        if outcome.delivery_method_changed() {
            // A new method changes what ships and whether the address
            // step applies at all.
            self.shipping = ShippingStatus::NotQuoted;
            self.refresh_step_errors(Step::Address);
        }

        self.session = SessionStatus::NotCreated;
        self.payment_error = None;
        self.touch();

        Ok(outcome)
    }

    /// Re-runs validation for one step and stores the result in the
    /// error map. A clean step gets its entry removed, so the map holds
    /// an entry exactly when the step has known errors.
    pub fn refresh_step_errors(&mut self, step: Step) -> bool {
        let errors = validate_step(step, &self.form);
        let valid = errors.is_empty();
        if valid {
            self.errors.remove(&step);
        } else {
            self.errors.insert(step, errors);
        }
        valid
    }

    /// True when the address question is settled for the picked method.
    /// Pickup needs no address, so it always counts as settled.
    #[must_use]
    pub fn address_settled(&self) -> bool {
        !self.form.needs_shipping_address() || self.address.accepted()
    }

    /// The quoted shipping figure, if one is current.
    #[must_use]
    pub fn shipping_money(&self) -> Option<Money> {
        self.shipping.quote().map(|quote| quote.amount)
    }

    /// Prices the order as it stands.
    ///
    /// # Errors
    ///
    /// Propagates [`MoneyError`] from summing mixed-currency figures.
    pub fn summary(&self, tax_rate: Decimal) -> Result<OrderSummary, MoneyError> {
        OrderSummary::price(&self.cart, self.shipping_money(), tax_rate)
    }

    /// Hash of everything the backend order would be built from. Two
    /// flows with identical form and cart data produce the same value,
    /// which is what makes "one session per form snapshot" checkable.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut put = |part: &str| {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        };

        put(self.cart.id.as_str());
        put(&self.cart.version.to_string());
        put(&self.form.first_name);
        put(&self.form.last_name);
        put(&self.form.email);
        put(&self.form.phone);
        put(if self.form.marketing_opt_in { "1" } else { "0" });
        put(self.form.delivery_method.map_or("", |m| m.as_str()));
        put(&self.form.delivery_notes);
        put(&self.form.street);
        put(&self.form.unit);
        put(&self.form.city);
        put(&self.form.state);
        put(&self.form.postal_code);
        put(&self.form.country);

        format!("{:x}", hasher.finalize())
    }

    /// Marks the checkout complete and clears the shopper's data.
    pub fn complete(&mut self, order_id: OrderId, status: OrderStatus) {
        self.status = CheckoutStatus::Completed;
        self.order = Some(PlacedOrder { order_id, status });
        self.form.clear();
        self.errors.clear();
        self.address = AddressReview::Unverified;
        self.shipping = ShippingStatus::NotQuoted;
        self.session = SessionStatus::NotCreated;
        self.payment_error = None;
        self.touch();
    }
}
