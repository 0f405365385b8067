//! In-memory store of live checkout flows.
//!
//! Checkouts are ephemeral: they live for one shopping session and are
//! dropped after sitting idle. Reads refresh the idle timer, so a
//! shopper who keeps typing keeps their checkout alive.
//!
//! Each flow sits behind its own async mutex. Operations lock the flow
//! to read or mutate it but never hold the lock across an external
//! call; the in-flight flags inside the flow carry that state instead.

use std::sync::Arc;
use std::time::Duration;

use driftwood_core::CheckoutId;
use moka::future::Cache;
use tokio::sync::Mutex;

use crate::flow::CheckoutFlow;

/// Handle to one live checkout.
pub type SharedFlow = Arc<Mutex<CheckoutFlow>>;

#[derive(Clone)]
pub struct CheckoutStore {
    cache: Cache<CheckoutId, SharedFlow>,
}

impl CheckoutStore {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(idle_timeout)
            .build();
        Self { cache }
    }

    /// Registers a new flow and returns its handle.
    pub async fn insert(&self, flow: CheckoutFlow) -> SharedFlow {
        let id = flow.id;
        let shared = Arc::new(Mutex::new(flow));
        self.cache.insert(id, Arc::clone(&shared)).await;
        shared
    }

    /// Looks up a live checkout. Expired or unknown ids return `None`.
    pub async fn get(&self, id: &CheckoutId) -> Option<SharedFlow> {
        self.cache.get(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartSnapshot;
    use driftwood_core::{CartId, CurrencyCode, Money};

    fn flow() -> CheckoutFlow {
        CheckoutFlow::new(
            CheckoutId::new(),
            CartSnapshot {
                id: CartId::from("cart_1"),
                version: 1,
                currency: CurrencyCode::USD,
                lines: vec![],
                discount: Money::zero(CurrencyCode::USD),
            },
        )
    }

    #[tokio::test]
    async fn test_insert_then_get_returns_same_flow() {
        let store = CheckoutStore::new(Duration::from_secs(60));
        let flow = flow();
        let id = flow.id;

        let inserted = store.insert(flow).await;
        let fetched = store.get(&id).await.unwrap();
        assert!(Arc::ptr_eq(&inserted, &fetched));
    }

    #[tokio::test]
    async fn test_unknown_id_misses() {
        let store = CheckoutStore::new(Duration::from_secs(60));
        assert!(store.get(&CheckoutId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_checkouts_expire() {
        let store = CheckoutStore::new(Duration::from_millis(10));
        let flow = flow();
        let id = flow.id;
        store.insert(flow).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.get(&id).await.is_none());
    }
}
