//! Clients for the external services the checkout depends on.
//!
//! Each service is reached through a trait so the orchestrator can be
//! exercised against scripted fakes. The concrete clients speak JSON over
//! HTTP with bearer-token auth and never retry on their own; retry policy
//! belongs to the flow, where the shopper can see it.

pub mod address;
pub mod carts;
pub mod orders;
pub mod rates;

pub use address::{AddressServiceError, AddressVerifier, StandardizeClient, VerificationOutcome};
pub use carts::{CartClient, CartServiceError, CartSource};
pub use orders::{
    CheckoutSubmission, ContactInfo, CreatedSession, OrderClient, OrderConfirmation,
    OrderGateway, OrderServiceError,
};
pub use rates::{ParcelItem, RateClient, RateServiceError, ServiceLevel, ShippingRates};
