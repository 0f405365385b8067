//! The checkout wizard: steps, form, validation, totals, and per-attempt
//! state. Everything in this module is synchronous and free of I/O.

pub mod error;
pub mod form;
pub mod state;
pub mod step;
pub mod totals;
pub mod validate;

pub use error::CheckoutError;
pub use form::{CheckoutForm, Field, FormPatch, PatchOutcome};
pub use state::{
    AddressReview, CheckoutFlow, CheckoutSession, InFlight, PlacedOrder, SessionStatus,
    ShippingQuote, ShippingStatus,
};
pub use step::Step;
pub use totals::{FreeReason, OrderSummary, ShippingCharge, SummaryLine};
pub use validate::{FieldErrors, StepErrors, first_invalid, validate_step};
