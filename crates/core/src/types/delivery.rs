//! Delivery method enum and its display metadata.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error parsing a [`DeliveryMethod`] from a string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown delivery method: {0:?}")]
pub struct DeliveryMethodError(pub String);

/// How an order leaves the warehouse.
///
/// Display strings live in one exhaustive table here rather than being
/// re-derived from the serialized name at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Ground shipping; free above the storewide subtotal threshold.
    #[default]
    Standard,
    /// Expedited carrier service.
    Express,
    /// Customer collects from the store; no shipping address needed.
    Pickup,
}

impl DeliveryMethod {
    /// All methods, in the order the wizard presents them.
    pub const ALL: [Self; 3] = [Self::Standard, Self::Express, Self::Pickup];

    /// Stable identifier used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
            Self::Pickup => "pickup",
        }
    }

    /// Short display name.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard Shipping",
            Self::Express => "Express Shipping",
            Self::Pickup => "Store Pickup",
        }
    }

    /// One-line description shown under the label.
    #[must_use]
    pub const fn blurb(&self) -> &'static str {
        match self {
            Self::Standard => "5-7 business days",
            Self::Express => "1-2 business days",
            Self::Pickup => "Ready in 2 hours at the counter",
        }
    }

    /// Icon name for the client's icon set.
    #[must_use]
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::Standard => "truck",
            Self::Express => "bolt",
            Self::Pickup => "storefront",
        }
    }

    /// Whether this method needs a deliverable street address.
    #[must_use]
    pub const fn requires_shipping_address(&self) -> bool {
        !matches!(self, Self::Pickup)
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryMethod {
    type Err = DeliveryMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            "pickup" => Ok(Self::Pickup),
            other => Err(DeliveryMethodError(other.to_string())),
        }
    }
}
