//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::CheckoutConfig;
use crate::orchestrator::{CheckoutPolicy, Orchestrator};
use crate::services::address::{AddressServiceError, StandardizeClient};
use crate::services::carts::{CartClient, CartServiceError};
use crate::services::orders::{OrderClient, OrderServiceError};
use crate::services::rates::{RateClient, RateServiceError};
use crate::store::CheckoutStore;

/// Error wiring up the upstream service clients.
#[derive(Debug, thiserror::Error)]
pub enum StateInitError {
    #[error("address client: {0}")]
    Address(#[from] AddressServiceError),
    #[error("rate client: {0}")]
    Rates(#[from] RateServiceError),
    #[error("order client: {0}")]
    Orders(#[from] OrderServiceError),
    #[error("cart client: {0}")]
    Carts(#[from] CartServiceError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the checkout orchestrator and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    orchestrator: Orchestrator,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the four upstream clients and the in-memory checkout store
    /// from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any upstream client fails to build.
    pub fn new(config: CheckoutConfig) -> Result<Self, StateInitError> {
        let verifier = StandardizeClient::new(&config.address)?;
        let rates = RateClient::new(&config.rates)?;
        let orders = OrderClient::new(&config.orders)?;
        let carts = CartClient::new(&config.carts)?;

        let store = CheckoutStore::new(config.idle_timeout);
        let policy = CheckoutPolicy {
            free_shipping_threshold: config.free_shipping_threshold,
            tax_rate: config.tax_rate,
        };
        let orchestrator = Orchestrator::new(
            store,
            Arc::new(verifier),
            Arc::new(rates),
            Arc::new(orders),
            Arc::new(carts),
            policy,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
            }),
        })
    }

    /// Get a reference to the checkout configuration.
    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// Get a reference to the checkout orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }
}
