//! Cart snapshot consumed by the checkout flow.
//!
//! A checkout is always opened against a cart that lives in the commerce
//! backend. We pull a point-in-time snapshot when the checkout starts and
//! treat it as immutable for the life of the attempt; the `version` field
//! lets us detect that the backend cart moved underneath us.

use driftwood_core::{CartId, CurrencyCode, Money, MoneyError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::rates::ParcelItem;

/// Physical dimensions of a single unit, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_in: Decimal,
    pub width_in: Decimal,
    pub height_in: Decimal,
}

/// One purchasable line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Shipping weight of a single unit, in ounces.
    pub weight_oz: Decimal,
    pub dimensions: Dimensions,
}

impl CartLine {
    /// Quantity times unit price.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Point-in-time view of a backend cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub id: CartId,
    /// Backend revision counter. Bumped by the backend on every cart edit.
    pub version: u64,
    pub currency: CurrencyCode,
    pub lines: Vec<CartLine>,
    /// Total discount already applied by the backend (promotions, codes).
    pub discount: Money,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.quantity == 0)
    }

    /// Sum of all line totals, before discounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if a line is priced in a
    /// different currency than the cart itself.
    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        let mut total = Money::zero(self.currency);
        for line in &self.lines {
            total = total.checked_add(&line.line_total())?;
        }
        Ok(total)
    }

    /// Flattens lines into the shape the rate service prices.
    #[must_use]
    pub fn parcel_items(&self) -> Vec<ParcelItem> {
        self.lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| ParcelItem {
                quantity: line.quantity,
                weight_oz: line.weight_oz,
                length_in: line.dimensions.length_in,
                width_in: line.dimensions.width_in,
                height_in: line.dimensions.height_in,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: &str, quantity: u32, cents: i64) -> CartLine {
        CartLine {
            id: id.to_string(),
            title: format!("Item {id}"),
            quantity,
            unit_price: Money::from_cents(cents, CurrencyCode::USD),
            weight_oz: Decimal::new(8, 0),
            dimensions: Dimensions {
                length_in: Decimal::new(6, 0),
                width_in: Decimal::new(4, 0),
                height_in: Decimal::new(2, 0),
            },
        }
    }

    fn snapshot(lines: Vec<CartLine>) -> CartSnapshot {
        CartSnapshot {
            id: CartId::from("cart_1"),
            version: 1,
            currency: CurrencyCode::USD,
            lines,
            discount: Money::zero(CurrencyCode::USD),
        }
    }

    #[test]
    fn test_subtotal_sums_line_totals() {
        let cart = snapshot(vec![line("a", 2, 1_000), line("b", 1, 495)]);
        let subtotal = cart.subtotal().unwrap();
        assert_eq!(subtotal, Money::from_cents(2_495, CurrencyCode::USD));
    }

    #[test]
    fn test_subtotal_rejects_mixed_currencies() {
        let mut cart = snapshot(vec![line("a", 1, 1_000)]);
        cart.lines.push(CartLine {
            unit_price: Money::from_cents(500, CurrencyCode::EUR),
            ..line("b", 1, 500)
        });
        assert!(cart.subtotal().is_err());
    }

    #[test]
    fn test_empty_when_no_lines() {
        assert!(snapshot(vec![]).is_empty());
    }

    #[test]
    fn test_empty_when_all_quantities_zero() {
        assert!(snapshot(vec![line("a", 0, 1_000)]).is_empty());
    }

    #[test]
    fn test_parcel_items_skip_zero_quantity_lines() {
        let cart = snapshot(vec![line("a", 2, 1_000), line("b", 0, 495)]);
        let items = cart.parcel_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }
}
