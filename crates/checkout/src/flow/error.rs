//! Domain errors for checkout operations.
//!
//! Everything here is recoverable from the shopper's point of view: the
//! checkout stays alive, the message says what to fix or retry, and no
//! variant ever aborts the attempt.

use driftwood_core::{CartId, CheckoutId, MoneyError};
use thiserror::Error;

use super::step::Step;
use super::validate::FieldErrors;
use crate::services::carts::CartServiceError;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("checkout {0} not found or expired")]
    NotFound(CheckoutId),

    #[error("cart {0} is empty")]
    EmptyCart(CartId),

    #[error("could not load the cart: {0}")]
    Cart(#[from] CartServiceError),

    #[error("this checkout is already completed")]
    Completed,

    #[error("payment is being confirmed; the form can no longer change")]
    PaymentInFlight,

    #[error("the {step} step has invalid fields")]
    ValidationFailed { step: Step, errors: FieldErrors },

    #[error("cannot skip ahead: the {step} step has invalid fields")]
    JumpBlocked { step: Step, errors: FieldErrors },

    #[error("already at the first step")]
    AtFirstStep,

    #[error("already at the last step")]
    AtLastStep,

    #[error("choose the suggested address or keep the one you entered")]
    AddressReviewPending,

    #[error("the shipping address has not been verified")]
    AddressUnverified,

    #[error("there is no address review to resolve")]
    NoPendingReview,

    #[error("shipping cost is unavailable: {message}")]
    ShippingUnavailable { message: String },

    #[error("no order session exists for this checkout")]
    NoSession,

    #[error("this action is only available on the payment step")]
    NotOnPaymentStep,

    #[error("this order has a balance due; confirm payment instead")]
    NonZeroTotal,

    #[error("this order has nothing to charge; place it as a free order")]
    ZeroTotal,

    #[error("the order total is not known yet")]
    TotalPending,

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl CheckoutError {
    /// Field errors carried by validation-shaped variants.
    #[must_use]
    pub fn field_errors(&self) -> Option<(&Step, &FieldErrors)> {
        match self {
            Self::ValidationFailed { step, errors } | Self::JumpBlocked { step, errors } => {
                Some((step, errors))
            }
            _ => None,
        }
    }
}
