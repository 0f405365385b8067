//! Order summary math and the free-shipping rule.

use driftwood_core::{DeliveryMethod, Money, MoneyError};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cart::CartSnapshot;

/// How the shipping line for a checkout gets priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShippingCharge {
    /// No charge and no rate-service call needed.
    Free(FreeReason),
    /// The rate service must be asked.
    Rated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeReason {
    Pickup,
    OverThreshold,
}

impl ShippingCharge {
    /// Decides the shipping treatment for a cart and delivery method.
    ///
    /// The free-shipping threshold compares against the raw merchandise
    /// subtotal, before discounts, and applies to standard delivery only.
    /// Express is always rated; pickup is always free.
    #[must_use]
    pub fn decide(method: DeliveryMethod, subtotal: &Money, threshold: Decimal) -> Self {
        match method {
            DeliveryMethod::Pickup => Self::Free(FreeReason::Pickup),
            DeliveryMethod::Standard if subtotal.amount() >= threshold => {
                Self::Free(FreeReason::OverThreshold)
            }
            DeliveryMethod::Standard | DeliveryMethod::Express => Self::Rated,
        }
    }
}

/// One cart line as shown on the review screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLine {
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Priced breakdown of the order.
///
/// `shipping` and `total` are `None` until a shipping figure exists; the
/// review screen renders them as pending rather than guessing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub lines: Vec<SummaryLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Option<Money>,
    pub tax: Money,
    pub total: Option<Money>,
}

impl OrderSummary {
    /// Prices the cart.
    ///
    /// Tax applies to the discounted merchandise subtotal; shipping is
    /// added untaxed. The discount can never push a figure below zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if cart lines, discount,
    /// and shipping do not share one currency.
    pub fn price(
        cart: &CartSnapshot,
        shipping: Option<Money>,
        tax_rate: Decimal,
    ) -> Result<Self, MoneyError> {
        let lines = cart
            .lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| SummaryLine {
                title: line.title.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total(),
            })
            .collect();

        let subtotal = cart.subtotal()?;
        let discounted = subtotal.saturating_sub(&cart.discount)?;
        let tax = discounted.mul_rate(tax_rate);

        let total = match &shipping {
            Some(shipping) => Some(discounted.checked_add(shipping)?.checked_add(&tax)?),
            None => None,
        };

        Ok(Self {
            lines,
            subtotal,
            discount: cart.discount,
            shipping,
            tax,
            total,
        })
    }

    /// True once the total is known and comes to exactly zero.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.total.as_ref().is_some_and(Money::is_zero)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{CartLine, Dimensions};
    use driftwood_core::{CartId, CurrencyCode};

    fn cart(line_cents: &[(u32, i64)], discount_cents: i64) -> CartSnapshot {
        let lines = line_cents
            .iter()
            .enumerate()
            .map(|(i, (quantity, cents))| CartLine {
                id: format!("line_{i}"),
                title: format!("Item {i}"),
                quantity: *quantity,
                unit_price: Money::from_cents(*cents, CurrencyCode::USD),
                weight_oz: Decimal::new(12, 0),
                dimensions: Dimensions {
                    length_in: Decimal::new(8, 0),
                    width_in: Decimal::new(5, 0),
                    height_in: Decimal::new(3, 0),
                },
            })
            .collect();
        CartSnapshot {
            id: CartId::from("cart_1"),
            version: 1,
            currency: CurrencyCode::USD,
            lines,
            discount: Money::from_cents(discount_cents, CurrencyCode::USD),
        }
    }

    fn usd(cents: i64) -> Money {
        Money::from_cents(cents, CurrencyCode::USD)
    }

    #[test]
    fn test_standard_over_threshold_is_free() {
        let subtotal = usd(3_000);
        let threshold = Decimal::new(25, 0);
        assert_eq!(
            ShippingCharge::decide(DeliveryMethod::Standard, &subtotal, threshold),
            ShippingCharge::Free(FreeReason::OverThreshold)
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let subtotal = usd(2_500);
        let threshold = Decimal::new(25, 0);
        assert_eq!(
            ShippingCharge::decide(DeliveryMethod::Standard, &subtotal, threshold),
            ShippingCharge::Free(FreeReason::OverThreshold)
        );
    }

    #[test]
    fn test_standard_under_threshold_is_rated() {
        let subtotal = usd(2_499);
        let threshold = Decimal::new(25, 0);
        assert_eq!(
            ShippingCharge::decide(DeliveryMethod::Standard, &subtotal, threshold),
            ShippingCharge::Rated
        );
    }

    #[test]
    fn test_express_is_always_rated() {
        let subtotal = usd(100_000);
        let threshold = Decimal::new(25, 0);
        assert_eq!(
            ShippingCharge::decide(DeliveryMethod::Express, &subtotal, threshold),
            ShippingCharge::Rated
        );
    }

    #[test]
    fn test_pickup_is_always_free() {
        let subtotal = usd(1);
        let threshold = Decimal::new(25, 0);
        assert_eq!(
            ShippingCharge::decide(DeliveryMethod::Pickup, &subtotal, threshold),
            ShippingCharge::Free(FreeReason::Pickup)
        );
    }

    #[test]
    fn test_price_without_shipping_leaves_total_pending() {
        let summary = OrderSummary::price(&cart(&[(2, 1_000)], 0), None, Decimal::ZERO).unwrap();
        assert_eq!(summary.subtotal, usd(2_000));
        assert_eq!(summary.shipping, None);
        assert_eq!(summary.total, None);
        assert!(!summary.is_free());
    }

    #[test]
    fn test_price_adds_shipping_and_tax_on_discounted_subtotal() {
        // 20.00 - 5.00 = 15.00 taxable, 6.25% tax = 0.94, + 4.95 shipping.
        let summary = OrderSummary::price(
            &cart(&[(2, 1_000)], 500),
            Some(usd(495)),
            Decimal::new(625, 4),
        )
        .unwrap();
        assert_eq!(summary.tax, usd(94));
        assert_eq!(summary.total, Some(usd(2_089)));
    }

    #[test]
    fn test_discount_cannot_push_total_negative() {
        let summary = OrderSummary::price(
            &cart(&[(1, 1_000)], 99_900),
            Some(usd(0)),
            Decimal::new(625, 4),
        )
        .unwrap();
        assert_eq!(summary.total, Some(usd(0)));
        assert!(summary.is_free());
    }

    #[test]
    fn test_fully_discounted_cart_with_free_shipping_is_free() {
        let summary = OrderSummary::price(&cart(&[(1, 3_000)], 3_000), Some(usd(0)), Decimal::ZERO)
            .unwrap();
        assert!(summary.is_free());
    }

    #[test]
    fn test_zero_quantity_lines_are_hidden_but_not_priced() {
        let summary =
            OrderSummary::price(&cart(&[(0, 1_000), (1, 495)], 0), None, Decimal::ZERO).unwrap();
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.subtotal, usd(495));
    }
}
