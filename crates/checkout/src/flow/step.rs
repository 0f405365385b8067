//! The ordered steps of the checkout wizard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One screen of the checkout wizard, in presentation order.
///
/// Ordering is load-bearing: navigation, jump validation, and the error
/// map all rely on `Ord` matching the order a shopper walks the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Contact,
    Delivery,
    Address,
    Review,
    Payment,
}

impl Step {
    /// Every step, in walk order.
    pub const ALL: [Self; 5] = [
        Self::Contact,
        Self::Delivery,
        Self::Address,
        Self::Review,
        Self::Payment,
    ];

    pub const FIRST: Self = Self::Contact;
    pub const LAST: Self = Self::Payment;

    /// One-based position shown to the shopper ("Step 3 of 5").
    #[must_use]
    pub const fn position(self) -> u8 {
        match self {
            Self::Contact => 1,
            Self::Delivery => 2,
            Self::Address => 3,
            Self::Review => 4,
            Self::Payment => 5,
        }
    }

    #[must_use]
    pub const fn from_position(position: u8) -> Option<Self> {
        match position {
            1 => Some(Self::Contact),
            2 => Some(Self::Delivery),
            3 => Some(Self::Address),
            4 => Some(Self::Review),
            5 => Some(Self::Payment),
            _ => None,
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Contact => Some(Self::Delivery),
            Self::Delivery => Some(Self::Address),
            Self::Address => Some(Self::Review),
            Self::Review => Some(Self::Payment),
            Self::Payment => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Contact => None,
            Self::Delivery => Some(Self::Contact),
            Self::Address => Some(Self::Delivery),
            Self::Review => Some(Self::Address),
            Self::Payment => Some(Self::Review),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Delivery => "delivery",
            Self::Address => "address",
            Self::Review => "review",
            Self::Payment => "payment",
        }
    }

    /// Heading rendered at the top of the step.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Contact => "Contact",
            Self::Delivery => "Delivery method",
            Self::Address => "Shipping address",
            Self::Review => "Review order",
            Self::Payment => "Payment",
        }
    }

    /// Steps after `self` and before `target`, in walk order.
    ///
    /// Empty when `target` is not ahead of `self` or is the immediate
    /// successor.
    pub fn strictly_between(self, target: Self) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |step| *step > self && *step < target)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown checkout step: {0}")]
pub struct ParseStepError(String);

impl FromStr for Step {
    type Err = ParseStepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contact" => Ok(Self::Contact),
            "delivery" => Ok(Self::Delivery),
            "address" => Ok(Self::Address),
            "review" => Ok(Self::Review),
            "payment" => Ok(Self::Payment),
            other => Err(ParseStepError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_one_based_and_contiguous() {
        for (i, step) in Step::ALL.iter().enumerate() {
            assert_eq!(usize::from(step.position()), i + 1);
            assert_eq!(Step::from_position(step.position()), Some(*step));
        }
        assert_eq!(Step::from_position(0), None);
        assert_eq!(Step::from_position(6), None);
    }

    #[test]
    fn test_next_and_previous_are_inverses() {
        for step in Step::ALL {
            if let Some(next) = step.next() {
                assert_eq!(next.previous(), Some(step));
            }
        }
        assert_eq!(Step::Payment.next(), None);
        assert_eq!(Step::Contact.previous(), None);
    }

    #[test]
    fn test_ordering_matches_walk_order() {
        assert!(Step::Contact < Step::Delivery);
        assert!(Step::Review < Step::Payment);
    }

    #[test]
    fn test_strictly_between_excludes_endpoints() {
        let between: Vec<_> = Step::Contact.strictly_between(Step::Review).collect();
        assert_eq!(between, vec![Step::Delivery, Step::Address]);

        assert_eq!(Step::Contact.strictly_between(Step::Delivery).count(), 0);
        assert_eq!(Step::Review.strictly_between(Step::Contact).count(), 0);
    }

    #[test]
    fn test_parse_round_trips() {
        for step in Step::ALL {
            assert_eq!(step.as_str().parse::<Step>().unwrap(), step);
        }
        assert!("checkout".parse::<Step>().is_err());
    }
}
