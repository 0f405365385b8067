//! Payment confirmation and the zero-total free path.
//!
//! Covers the processor confirmation flow end to end: success, declines
//! that keep the session alive, idempotent repeats, and fully discounted
//! orders that complete without a processor round trip.

use std::sync::atomic::Ordering;

use driftwood_checkout::flow::CheckoutError;
use driftwood_checkout::services::CreatedSession;
use driftwood_checkout::view::SessionView;
use driftwood_core::{CheckoutId, CheckoutStatus, DeliveryMethod, OrderId};
use driftwood_integration_tests::{
    Harness, address_patch, cart, cart_line, contact_patch, delivery_patch, usd,
};

/// Walks a fresh checkout all the way to the payment step.
async fn to_payment(h: &Harness, cart_id: &str) -> CheckoutId {
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
    h.checkout
        .update_form(id, address_patch())
        .await
        .expect("save address");
    h.checkout.next(id).await.expect("advance to review");
    h.checkout.next(id).await.expect("advance to payment");
    id
}

/// Walks a fully discounted pickup cart to the payment step. The scripted
/// session comes back without a processor token, as the backend does for
/// zero-total orders.
async fn to_free_payment(h: &Harness, cart_id: &str) -> CheckoutId {
    let mut snapshot = cart(cart_id, vec![cart_line("sampler", 1, 1_500)]);
    snapshot.discount = usd(1_500);
    let view = h.open(snapshot).await.expect("open checkout");
    let id = view.id;
    h.checkout
        .update_form(id, contact_patch())
        .await
        .expect("save contact");
    h.checkout.next(id).await.expect("advance to delivery");
    h.checkout
        .update_form(id, delivery_patch(DeliveryMethod::Pickup))
        .await
        .expect("pick pickup");
    h.checkout.next(id).await.expect("advance to address");
    h.checkout.next(id).await.expect("advance to review");

    h.orders
        .create_script
        .lock()
        .await
        .push_back(Ok(CreatedSession {
            order_id: OrderId::from("ord_2002"),
            payment_token: None,
        }));
    h.checkout.next(id).await.expect("advance to payment");
    id
}

// =============================================================================
// Processor Confirmations
// =============================================================================

#[tokio::test]
async fn test_repeat_confirmation_is_idempotent() {
    let h = Harness::new();
    let id = to_payment(&h, "cart_idem").await;

    let first = h
        .checkout
        .confirm_payment(id, "pay_intent_7")
        .await
        .expect("confirm payment");
    assert_eq!(first.status, CheckoutStatus::Completed);

    // The client retries after losing the response; nothing runs twice.
    let second = h
        .checkout
        .confirm_payment(id, "pay_intent_7")
        .await
        .expect("repeat the confirmation");
    assert_eq!(second.status, CheckoutStatus::Completed);
    assert_eq!(second.order.expect("placed order").order_id, "ord_1001");
    assert_eq!(h.orders.confirm_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_declined_payment_keeps_the_session_for_retry() {
    let h = Harness::new();
    let id = to_payment(&h, "cart_declined").await;
    h.orders
        .confirm_script
        .lock()
        .await
        .push_back(Err("Card declined".to_string()));

    // The decline is a recoverable state, not an error.
    let view = h
        .checkout
        .confirm_payment(id, "pay_intent_8")
        .await
        .expect("confirmation call");
    assert_eq!(view.status, CheckoutStatus::InProgress);
    assert_eq!(view.payment_error.as_deref(), Some("Card declined"));
    assert!(matches!(view.session, SessionView::Active { .. }));
    assert!(view.order.is_none());

    // A second attempt settles against the same session.
    let view = h
        .checkout
        .confirm_payment(id, "pay_intent_9")
        .await
        .expect("retry the confirmation");
    assert_eq!(view.status, CheckoutStatus::Completed);
    assert!(view.payment_error.is_none());
    assert_eq!(h.orders.confirm_calls.load(Ordering::Relaxed), 2);
    assert_eq!(h.orders.create_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_completed_checkout_rejects_further_edits() {
    let h = Harness::new();
    let id = to_payment(&h, "cart_locked").await;
    h.checkout
        .confirm_payment(id, "pay_intent_10")
        .await
        .expect("confirm payment");

    let err = h
        .checkout
        .update_form(id, contact_patch())
        .await
        .expect_err("edit after completion");
    assert!(matches!(err, CheckoutError::Completed));

    let err = h
        .checkout
        .previous(id)
        .await
        .expect_err("navigate after completion");
    assert!(matches!(err, CheckoutError::Completed));
}

#[tokio::test]
async fn test_confirm_requires_the_payment_step() {
    let h = Harness::new();
    let view = h
        .open(cart("cart_early", vec![cart_line("tote", 1, 1_899)]))
        .await
        .expect("open checkout");
    let err = h
        .checkout
        .confirm_payment(view.id, "pay_intent_12")
        .await
        .expect_err("confirm from the contact step");
    assert!(matches!(err, CheckoutError::NotOnPaymentStep));
}

// =============================================================================
// Zero-Total Orders
// =============================================================================

#[tokio::test]
async fn test_zero_total_order_uses_the_free_path() {
    let h = Harness::new();
    let id = to_free_payment(&h, "cart_freebie").await;

    let view = h.checkout.get(id).await.expect("reload checkout");
    assert_eq!(view.summary.total, Some(usd(0)));
    match &view.session {
        SessionView::Active {
            order_id,
            payment_token,
        } => {
            assert_eq!(order_id, "ord_2002");
            assert_eq!(*payment_token, None);
        }
        other => panic!("expected an active session, got {other:?}"),
    }

    // The processor path refuses a zero charge.
    let err = h
        .checkout
        .confirm_payment(id, "pay_intent_11")
        .await
        .expect_err("charge a free order");
    assert!(matches!(err, CheckoutError::ZeroTotal));

    let view = h.checkout.confirm_free(id).await.expect("place the free order");
    assert_eq!(view.status, CheckoutStatus::Completed);
    assert_eq!(view.order.expect("placed order").order_id, "ord_2002");
    assert_eq!(h.orders.free_calls.load(Ordering::Relaxed), 1);
    assert_eq!(h.orders.confirm_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_free_path_refuses_a_balance_due() {
    let h = Harness::new();
    let id = to_payment(&h, "cart_balance").await;
    let err = h
        .checkout
        .confirm_free(id)
        .await
        .expect_err("free-place an order with a balance");
    assert!(matches!(err, CheckoutError::NonZeroTotal));
    assert_eq!(h.orders.free_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_failed_free_completion_is_retryable() {
    let h = Harness::new();
    let id = to_free_payment(&h, "cart_free_retry").await;
    h.orders
        .free_script
        .lock()
        .await
        .push_back(Err("order already closing".to_string()));

    let view = h.checkout.confirm_free(id).await.expect("completion call");
    assert_eq!(view.status, CheckoutStatus::InProgress);
    assert_eq!(view.payment_error.as_deref(), Some("order already closing"));

    let view = h.checkout.confirm_free(id).await.expect("retry the completion");
    assert_eq!(view.status, CheckoutStatus::Completed);
    assert_eq!(h.orders.free_calls.load(Ordering::Relaxed), 2);
}
