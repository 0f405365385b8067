//! Pure, synchronous step validation.
//!
//! Every function here is a plain function of the form value. No I/O, no
//! clock, no hidden state: the orchestrator and the tests both call the
//! same code and always get the same answer for the same form.

use driftwood_core::{Email, PhoneNumber, PostalCode};
use std::collections::BTreeMap;

use super::form::{CheckoutForm, Field};
use super::step::Step;

/// Field-level messages for one step. Empty map means the step is valid.
pub type FieldErrors = BTreeMap<Field, String>;

/// Per-step error maps. A step with no entry has no known errors.
pub type StepErrors = BTreeMap<Step, FieldErrors>;

/// Validates a single step of the form.
///
/// The address step validates as clean when the picked delivery method is
/// in-store pickup, whatever the address fields hold.
#[must_use]
pub fn validate_step(step: Step, form: &CheckoutForm) -> FieldErrors {
    match step {
        Step::Contact => validate_contact(form),
        Step::Delivery => validate_delivery(form),
        Step::Address => validate_address(form),
        // Review and payment have no fields of their own; their gates are
        // service-state checks made by the orchestrator.
        Step::Review | Step::Payment => FieldErrors::new(),
    }
}

/// First step in `steps` that fails validation, with its errors.
#[must_use]
pub fn first_invalid(
    form: &CheckoutForm,
    steps: impl IntoIterator<Item = Step>,
) -> Option<(Step, FieldErrors)> {
    steps.into_iter().find_map(|step| {
        let errors = validate_step(step, form);
        (!errors.is_empty()).then_some((step, errors))
    })
}

fn validate_contact(form: &CheckoutForm) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if form.first_name.trim().is_empty() {
        errors.insert(Field::FirstName, "Enter your first name".to_string());
    }
    if form.last_name.trim().is_empty() {
        errors.insert(Field::LastName, "Enter your last name".to_string());
    }
    if let Err(e) = Email::parse(&form.email) {
        errors.insert(Field::Email, e.to_string());
    }

    // Phone is optional, but a non-blank value must parse.
    if !form.phone.trim().is_empty()
        && let Err(e) = PhoneNumber::parse(&form.phone)
    {
        errors.insert(Field::Phone, e.to_string());
    }

    errors
}

fn validate_delivery(form: &CheckoutForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if form.delivery_method.is_none() {
        errors.insert(Field::DeliveryMethod, "Choose a delivery method".to_string());
    }
    errors
}

fn validate_address(form: &CheckoutForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !form.needs_shipping_address() {
        return errors;
    }

    if form.street.trim().is_empty() {
        errors.insert(Field::Street, "Enter a street address".to_string());
    }
    if form.city.trim().is_empty() {
        errors.insert(Field::City, "Enter a city".to_string());
    }
    if form.state.trim().is_empty() {
        errors.insert(Field::State, "Enter a state".to_string());
    }
    if let Err(e) = PostalCode::parse(&form.postal_code) {
        errors.insert(Field::PostalCode, e.to_string());
    }
    if form.country.trim().is_empty() {
        errors.insert(Field::Country, "Enter a country".to_string());
    }

    errors
}
