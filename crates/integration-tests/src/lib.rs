//! Integration tests for Driftwood.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p driftwood-integration-tests
//! ```
//!
//! Most tests drive the checkout orchestrator in-process against the
//! scripted fakes in this crate; they need no network and no running
//! services. The `live_checkout` tests hit a real server and are
//! `#[ignore]`d by default.
//!
//! # Fakes
//!
//! Each fake implements one upstream service trait. Responses are scripted
//! by pushing onto the fake's `script` queue; an empty queue falls back to
//! a benign default so happy-path tests stay short. Every fake counts its
//! calls and remembers the last request it saw.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use driftwood_checkout::cart::{CartLine, CartSnapshot, Dimensions};
use driftwood_checkout::flow::{CheckoutError, FormPatch};
use driftwood_checkout::orchestrator::{CheckoutPolicy, Orchestrator};
use driftwood_checkout::services::{
    AddressServiceError, AddressVerifier, CartServiceError, CartSource, CheckoutSubmission,
    CreatedSession, OrderConfirmation, OrderGateway, OrderServiceError, ParcelItem,
    RateServiceError, ServiceLevel, ShippingRates, VerificationOutcome,
};
use driftwood_checkout::store::CheckoutStore;
use driftwood_checkout::view::CheckoutView;
use driftwood_core::{
    CartId, CurrencyCode, DeliveryMethod, MailingAddress, Money, OrderId, OrderStatus, PostalCode,
};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

/// Scripted address verifier.
pub struct FakeVerifier {
    /// Queued answers, oldest first. `Err` holds the upstream failure
    /// message. An empty queue verifies the address exactly as entered.
    pub script: Mutex<VecDeque<Result<VerificationOutcome, String>>>,
    pub calls: AtomicU64,
    pub last_address: Mutex<Option<MailingAddress>>,
    /// Sleep before answering, for in-flight and staleness tests.
    pub delay: Mutex<Duration>,
}

impl Default for FakeVerifier {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
            last_address: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
        }
    }
}

#[async_trait]
impl AddressVerifier for FakeVerifier {
    async fn verify(
        &self,
        address: &MailingAddress,
    ) -> Result<VerificationOutcome, AddressServiceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self.last_address.lock().await = Some(address.clone());

        let delay = *self.delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.script.lock().await.pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(AddressServiceError::Api {
                status: 503,
                message,
            }),
            None => Ok(VerificationOutcome::Verified {
                standardized: address.clone(),
            }),
        }
    }
}

/// Scripted shipping rate service.
pub struct FakeRates {
    pub script: Mutex<VecDeque<Result<Money, String>>>,
    pub calls: AtomicU64,
    pub last_request: Mutex<Option<RateRequest>>,
    pub delay: Mutex<Duration>,
}

/// What the rate service was last asked to price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRequest {
    pub destination: String,
    pub level: ServiceLevel,
    pub item_count: usize,
}

impl Default for FakeRates {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
            last_request: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
        }
    }
}

#[async_trait]
impl ShippingRates for FakeRates {
    async fn quote(
        &self,
        destination: &PostalCode,
        level: ServiceLevel,
        items: &[ParcelItem],
    ) -> Result<Money, RateServiceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().await = Some(RateRequest {
            destination: destination.as_str().to_string(),
            level,
            item_count: items.len(),
        });

        let delay = *self.delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.script.lock().await.pop_front() {
            Some(Ok(amount)) => Ok(amount),
            Some(Err(message)) => Err(RateServiceError::Api {
                status: 503,
                message,
            }),
            None => Ok(usd(899)),
        }
    }
}

/// Scripted commerce backend.
pub struct FakeOrders {
    pub create_script: Mutex<VecDeque<Result<CreatedSession, String>>>,
    pub confirm_script: Mutex<VecDeque<Result<OrderConfirmation, String>>>,
    pub free_script: Mutex<VecDeque<Result<OrderConfirmation, String>>>,
    pub create_calls: AtomicU64,
    pub confirm_calls: AtomicU64,
    pub free_calls: AtomicU64,
    pub last_submission: Mutex<Option<CheckoutSubmission>>,
    pub last_payment_id: Mutex<Option<String>>,
    pub delay: Mutex<Duration>,
}

impl Default for FakeOrders {
    fn default() -> Self {
        Self {
            create_script: Mutex::new(VecDeque::new()),
            confirm_script: Mutex::new(VecDeque::new()),
            free_script: Mutex::new(VecDeque::new()),
            create_calls: AtomicU64::new(0),
            confirm_calls: AtomicU64::new(0),
            free_calls: AtomicU64::new(0),
            last_submission: Mutex::new(None),
            last_payment_id: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
        }
    }
}

impl FakeOrders {
    async fn pause(&self) {
        let delay = *self.delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl OrderGateway for FakeOrders {
    async fn create_session(
        &self,
        submission: &CheckoutSubmission,
    ) -> Result<CreatedSession, OrderServiceError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_submission.lock().await = Some(submission.clone());
        self.pause().await;

        match self.create_script.lock().await.pop_front() {
            Some(Ok(session)) => Ok(session),
            Some(Err(message)) => Err(OrderServiceError::Api {
                status: 502,
                message,
            }),
            None => Ok(CreatedSession {
                order_id: OrderId::from("ord_1001"),
                payment_token: Some("tok_test".to_string()),
            }),
        }
    }

    async fn confirm_payment(
        &self,
        order_id: &OrderId,
        payment_id: &str,
    ) -> Result<OrderConfirmation, OrderServiceError> {
        self.confirm_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_payment_id.lock().await = Some(payment_id.to_string());
        self.pause().await;

        match self.confirm_script.lock().await.pop_front() {
            Some(Ok(confirmation)) => Ok(confirmation),
            Some(Err(message)) => Err(OrderServiceError::Api {
                status: 402,
                message,
            }),
            None => Ok(OrderConfirmation {
                order_id: order_id.clone(),
                status: OrderStatus::Confirmed,
            }),
        }
    }

    async fn complete_free_order(
        &self,
        order_id: &OrderId,
    ) -> Result<OrderConfirmation, OrderServiceError> {
        self.free_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;

        match self.free_script.lock().await.pop_front() {
            Some(Ok(confirmation)) => Ok(confirmation),
            Some(Err(message)) => Err(OrderServiceError::Api {
                status: 409,
                message,
            }),
            None => Ok(OrderConfirmation {
                order_id: order_id.clone(),
                status: OrderStatus::Confirmed,
            }),
        }
    }
}

/// In-memory cart service.
#[derive(Default)]
pub struct FakeCarts {
    pub snapshots: Mutex<HashMap<CartId, CartSnapshot>>,
    pub calls: AtomicU64,
}

#[async_trait]
impl CartSource for FakeCarts {
    async fn fetch(&self, cart_id: &CartId) -> Result<CartSnapshot, CartServiceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.snapshots
            .lock()
            .await
            .get(cart_id)
            .cloned()
            .ok_or_else(|| CartServiceError::NotFound(cart_id.clone()))
    }
}

/// An orchestrator wired to one set of fakes.
pub struct Harness {
    pub checkout: Orchestrator,
    pub verifier: Arc<FakeVerifier>,
    pub rates: Arc<FakeRates>,
    pub orders: Arc<FakeOrders>,
    pub carts: Arc<FakeCarts>,
}

impl Harness {
    /// The default pricing policy: $25 free-shipping threshold, no tax.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(CheckoutPolicy {
            free_shipping_threshold: Decimal::new(2500, 2),
            tax_rate: Decimal::ZERO,
        })
    }

    #[must_use]
    pub fn with_policy(policy: CheckoutPolicy) -> Self {
        let verifier = Arc::new(FakeVerifier::default());
        let rates = Arc::new(FakeRates::default());
        let orders = Arc::new(FakeOrders::default());
        let carts = Arc::new(FakeCarts::default());

        let checkout = Orchestrator::new(
            CheckoutStore::new(Duration::from_secs(1800)),
            verifier.clone(),
            rates.clone(),
            orders.clone(),
            carts.clone(),
            policy,
        );

        Self {
            checkout,
            verifier,
            rates,
            orders,
            carts,
        }
    }

    /// Registers the cart with the fake cart service and opens a checkout
    /// for it.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's rejection, e.g. for an empty cart.
    pub async fn open(&self, snapshot: CartSnapshot) -> Result<CheckoutView, CheckoutError> {
        let cart_id = snapshot.id.clone();
        self.carts
            .snapshots
            .lock()
            .await
            .insert(cart_id.clone(), snapshot);
        self.checkout.start(cart_id).await
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Dollars-and-cents shorthand for test amounts.
#[must_use]
pub fn usd(cents: i64) -> Money {
    Money::from_cents(cents, CurrencyCode::USD)
}

/// A cart line for a one-pound, shoe-box-sized item.
#[must_use]
pub fn cart_line(id: &str, quantity: u32, unit_cents: i64) -> CartLine {
    CartLine {
        id: id.to_string(),
        title: format!("Item {id}"),
        quantity,
        unit_price: usd(unit_cents),
        weight_oz: Decimal::new(16, 0),
        dimensions: Dimensions {
            length_in: Decimal::new(13, 0),
            width_in: Decimal::new(8, 0),
            height_in: Decimal::new(5, 0),
        },
    }
}

/// A USD cart at version 1 with no discount.
#[must_use]
pub fn cart(id: &str, lines: Vec<CartLine>) -> CartSnapshot {
    CartSnapshot {
        id: CartId::from(id),
        version: 1,
        currency: CurrencyCode::USD,
        lines,
        discount: usd(0),
    }
}

/// A complete, valid contact step.
#[must_use]
pub fn contact_patch() -> FormPatch {
    FormPatch {
        first_name: Some("Nora".to_string()),
        last_name: Some("Bell".to_string()),
        email: Some("nora@example.com".to_string()),
        phone: Some("603-555-0114".to_string()),
        ..FormPatch::default()
    }
}

#[must_use]
pub fn delivery_patch(method: DeliveryMethod) -> FormPatch {
    FormPatch {
        delivery_method: Some(method),
        ..FormPatch::default()
    }
}

/// A complete, valid address step matching [`entered_address`].
#[must_use]
pub fn address_patch() -> FormPatch {
    FormPatch {
        street: Some("123 Harbor Lane".to_string()),
        city: Some("Portsmouth".to_string()),
        state: Some("NH".to_string()),
        postal_code: Some("03801".to_string()),
        country: Some("US".to_string()),
        ..FormPatch::default()
    }
}

/// The address [`address_patch`] types in, as the flow parses it.
#[must_use]
pub fn entered_address() -> MailingAddress {
    MailingAddress {
        street: "123 Harbor Lane".to_string(),
        unit: None,
        city: "Portsmouth".to_string(),
        state: "NH".to_string(),
        postal_code: "03801".to_string(),
        country: "US".to_string(),
    }
}

/// A deliverable standardization of [`entered_address`] with the usual
/// postal edits applied.
#[must_use]
pub fn standardized_address() -> MailingAddress {
    MailingAddress {
        street: "123 HARBOR LN".to_string(),
        unit: None,
        city: "PORTSMOUTH".to_string(),
        state: "NH".to_string(),
        postal_code: "03801-4521".to_string(),
        country: "US".to_string(),
    }
}
