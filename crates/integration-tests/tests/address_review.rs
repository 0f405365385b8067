//! Address verification outcomes and the review prompt.
//!
//! Covers the four vendor outcomes (clean, corrections, no match, call
//! failure), how each one gates the walk to review, and the shopper's two
//! ways out of a prompt: accepting the suggestion or keeping the entered
//! address. All in-process against the scripted fakes.

use std::sync::atomic::Ordering;

use driftwood_checkout::flow::{CheckoutError, Field, FormPatch, Step};
use driftwood_checkout::services::VerificationOutcome;
use driftwood_checkout::view::{AddressView, SessionView, ShippingView};
use driftwood_core::{CheckoutId, DeliveryMethod};
use driftwood_integration_tests::{
    Harness, address_patch, cart, cart_line, contact_patch, delivery_patch, entered_address,
    standardized_address,
};

/// Walks a fresh checkout to the address step with standard delivery.
async fn to_address_step(h: &Harness, cart_id: &str) -> CheckoutId {
    let view = h
        .open(cart(cart_id, vec![cart_line("tote", 1, 1_899)]))
        .await
        .expect("open checkout");
    let id = view.id;
    h.checkout
        .update_form(id, contact_patch())
        .await
        .expect("save contact");
    h.checkout.next(id).await.expect("advance to delivery");
    h.checkout
        .update_form(id, delivery_patch(DeliveryMethod::Standard))
        .await
        .expect("pick standard delivery");
    h.checkout.next(id).await.expect("advance to address");
    id
}

// =============================================================================
// Clean Verification
// =============================================================================

#[tokio::test]
async fn test_clean_verification_needs_no_shopper_input() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_clean").await;

    h.verifier
        .script
        .lock()
        .await
        .push_back(Ok(VerificationOutcome::Verified {
            standardized: entered_address(),
        }));

    let view = h
        .checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");
    match &view.address {
        AddressView::Verified { standardized } => assert_eq!(*standardized, entered_address()),
        other => panic!("expected a verified address, got {other:?}"),
    }
    assert_eq!(
        h.verifier.last_address.lock().await.clone(),
        Some(entered_address())
    );

    // Straight through to review; no prompt to answer.
    let view = h.checkout.next(id).await.expect("advance to review");
    assert_eq!(view.step, Step::Review);
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 1);
}

// =============================================================================
// Suggested Corrections
// =============================================================================

#[tokio::test]
async fn test_suggested_address_must_be_answered() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_suggest").await;

    h.verifier
        .script
        .lock()
        .await
        .push_back(Ok(VerificationOutcome::CorrectionsAvailable {
            standardized: standardized_address(),
            corrections: vec!["street abbreviated".to_string(), "ZIP+4 added".to_string()],
        }));

    let view = h
        .checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");
    match &view.address {
        AddressView::SuggestionPending {
            entered,
            suggested,
            corrections,
        } => {
            assert_eq!(*entered, entered_address());
            assert_eq!(*suggested, standardized_address());
            assert_eq!(corrections.len(), 2);
        }
        other => panic!("expected a pending suggestion, got {other:?}"),
    }

    // No quote while the prompt is open.
    assert!(matches!(view.shipping, ShippingView::NotQuoted));
    assert_eq!(h.rates.calls.load(Ordering::Relaxed), 0);

    let err = h
        .checkout
        .next(id)
        .await
        .expect_err("advance with an open prompt");
    assert!(matches!(err, CheckoutError::AddressReviewPending));
}

#[tokio::test]
async fn test_accepting_the_suggestion_rewrites_the_form() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_accept").await;
    h.verifier
        .script
        .lock()
        .await
        .push_back(Ok(VerificationOutcome::CorrectionsAvailable {
            standardized: standardized_address(),
            corrections: vec!["ZIP+4 added".to_string()],
        }));
    h.checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");

    let view = h
        .checkout
        .accept_suggested(id)
        .await
        .expect("accept the suggestion");
    assert_eq!(view.form.street, "123 HARBOR LN");
    assert_eq!(view.form.postal_code, "03801-4521");
    match &view.address {
        AddressView::Verified { standardized } => {
            assert_eq!(*standardized, standardized_address());
        }
        other => panic!("expected a verified address, got {other:?}"),
    }

    // Accepting re-prices shipping for the corrected ZIP.
    match &view.shipping {
        ShippingView::Quoted { destination, .. } => {
            assert_eq!(destination.as_deref(), Some("03801-4521"));
        }
        other => panic!("expected a quoted shipping line, got {other:?}"),
    }
    assert_eq!(h.rates.calls.load(Ordering::Relaxed), 1);
    // One verification round; accepting does not re-verify.
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 1);

    let view = h.checkout.next(id).await.expect("advance to review");
    assert_eq!(view.step, Step::Review);
}

#[tokio::test]
async fn test_keeping_the_entered_address_reopens_editing() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_keep").await;
    h.verifier
        .script
        .lock()
        .await
        .push_back(Ok(VerificationOutcome::CorrectionsAvailable {
            standardized: standardized_address(),
            corrections: vec!["ZIP+4 added".to_string()],
        }));
    h.checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");

    let view = h
        .checkout
        .keep_entered(id)
        .await
        .expect("keep the entered address");
    // The form keeps what the shopper typed; the question is open again.
    assert!(matches!(view.address, AddressView::Unverified));
    assert_eq!(view.form.street, "123 Harbor Lane");

    // Advancing re-verifies, and this time the vendor has no objection.
    let view = h.checkout.next(id).await.expect("advance to review");
    assert_eq!(view.step, Step::Review);
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 2);
}

// =============================================================================
// Unverifiable Addresses
// =============================================================================

#[tokio::test]
async fn test_unverifiable_address_can_be_overridden() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_nomatch").await;
    h.verifier
        .script
        .lock()
        .await
        .push_back(Ok(VerificationOutcome::Failed {
            reason: "No delivery point for that street number".to_string(),
        }));

    let view = h
        .checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");
    match &view.address {
        AddressView::Unverifiable { reason } => {
            assert_eq!(reason, "No delivery point for that street number");
        }
        other => panic!("expected an unverifiable address, got {other:?}"),
    }

    let view = h
        .checkout
        .keep_entered(id)
        .await
        .expect("continue as entered");
    assert!(matches!(view.address, AddressView::Overridden));
    // The override settles the address, so shipping prices immediately.
    assert!(matches!(view.shipping, ShippingView::Quoted { .. }));

    let view = h.checkout.next(id).await.expect("advance to review");
    assert_eq!(view.step, Step::Review);
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 1);

    // The backend gets the address exactly as entered.
    let view = h.checkout.next(id).await.expect("advance to payment");
    assert!(matches!(view.session, SessionView::Active { .. }));
    let submission = h
        .orders
        .last_submission
        .lock()
        .await
        .clone()
        .expect("captured submission");
    assert_eq!(submission.shipping_address, Some(entered_address()));
}

// =============================================================================
// Verification Outages
// =============================================================================

#[tokio::test]
async fn test_verification_outage_blocks_until_resolved() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_outage").await;
    {
        let mut script = h.verifier.script.lock().await;
        script.push_back(Err("upstream timeout".to_string()));
        script.push_back(Err("upstream timeout".to_string()));
    }

    let view = h
        .checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");
    match &view.address {
        AddressView::CheckFailed { message } => {
            assert!(message.contains("temporarily unavailable"), "got {message}");
        }
        other => panic!("expected a failed check, got {other:?}"),
    }

    // Advancing retries the check; a second failure still blocks.
    let err = h
        .checkout
        .next(id)
        .await
        .expect_err("advance with a failed check");
    assert!(matches!(err, CheckoutError::AddressUnverified));
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 2);

    // Third try goes through once the service is back.
    let view = h.checkout.next(id).await.expect("advance after recovery");
    assert_eq!(view.step, Step::Review);
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 3);
}

#[tokio::test]
async fn test_outage_override_proceeds_unverified() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_outage_override").await;
    h.verifier
        .script
        .lock()
        .await
        .push_back(Err("upstream timeout".to_string()));
    h.checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");

    let view = h
        .checkout
        .keep_entered(id)
        .await
        .expect("continue as entered");
    assert!(matches!(view.address, AddressView::Overridden));

    // The override stands; no further verification calls.
    let view = h.checkout.next(id).await.expect("advance past the outage");
    assert_eq!(view.step, Step::Review);
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 1);
}

// =============================================================================
// Invalidation and Explicit Triggers
// =============================================================================

#[tokio::test]
async fn test_address_edit_reopens_verification() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_edit").await;
    let view = h
        .checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");
    assert!(matches!(view.address, AddressView::Verified { .. }));
    assert!(matches!(view.shipping, ShippingView::Quoted { .. }));

    // Any address edit reopens the question and drops the quote.
    let view = h
        .checkout
        .update_form(
            id,
            FormPatch {
                street: Some("9 Elm St".to_string()),
                ..FormPatch::default()
            },
        )
        .await
        .expect("edit the street");
    assert!(matches!(view.address, AddressView::Unverified));
    assert!(matches!(view.shipping, ShippingView::NotQuoted));

    // Editing again changes nothing further.
    let view = h
        .checkout
        .update_form(
            id,
            FormPatch {
                city: Some("Dover".to_string()),
                ..FormPatch::default()
            },
        )
        .await
        .expect("edit the city");
    assert!(matches!(view.address, AddressView::Unverified));
    assert!(matches!(view.shipping, ShippingView::NotQuoted));

    // Street and city edits alone never call the verifier.
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_explicit_verify_checks_the_current_form() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_explicit").await;
    h.checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");
    h.checkout
        .update_form(
            id,
            FormPatch {
                street: Some("9 Elm St".to_string()),
                ..FormPatch::default()
            },
        )
        .await
        .expect("edit the street");
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 1);

    let view = h.checkout.verify_address(id).await.expect("explicit re-check");
    assert!(matches!(view.address, AddressView::Verified { .. }));
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 2);
    let last = h
        .verifier
        .last_address
        .lock()
        .await
        .clone()
        .expect("captured address");
    assert_eq!(last.street, "9 Elm St");
}

#[tokio::test]
async fn test_explicit_verify_rejects_an_incomplete_address() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_incomplete").await;
    h.checkout
        .update_form(
            id,
            FormPatch {
                postal_code: Some("03801".to_string()),
                ..FormPatch::default()
            },
        )
        .await
        .expect("save only the ZIP");

    let err = h
        .checkout
        .verify_address(id)
        .await
        .expect_err("verify an incomplete address");
    match err {
        CheckoutError::ValidationFailed { step, errors } => {
            assert_eq!(step, Step::Address);
            assert!(errors.contains_key(&Field::Street));
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert_eq!(h.verifier.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_resolving_without_a_prompt_is_rejected() {
    let h = Harness::new();
    let id = to_address_step(&h, "cart_noprompt").await;

    let err = h
        .checkout
        .keep_entered(id)
        .await
        .expect_err("resolve with nothing pending");
    assert!(matches!(err, CheckoutError::NoPendingReview));

    let err = h
        .checkout
        .accept_suggested(id)
        .await
        .expect_err("accept with nothing pending");
    assert!(matches!(err, CheckoutError::NoPendingReview));
}
