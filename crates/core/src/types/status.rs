//! Status enums for checkout and order lifecycles.

use serde::{Deserialize, Serialize};

/// Lifecycle of one checkout attempt.
///
/// Completion is a flag on the checkout, not a wizard step: the wizard
/// position stays on the payment step while the status flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// The shopper is still moving through the wizard.
    #[default]
    InProgress,
    /// Payment confirmed (or free order placed); the checkout is closed.
    Completed,
}

/// Order lifecycle as reported by the commerce backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment confirmation.
    #[default]
    Pending,
    /// Paid (or free) and accepted.
    Confirmed,
}
