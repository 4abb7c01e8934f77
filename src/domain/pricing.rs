//! Flat-rate pricing shared by live carts and frozen orders.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Tax and shipping parameters. Loaded from configuration; the defaults are an
/// 18% tax, a shipping fee of 100 and free shipping from 500.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tax_rate: Decimal,
    pub shipping_fee: Decimal,
    pub free_shipping_threshold: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(18, 2),
            shipping_fee: Decimal::new(100, 0),
            free_shipping_threshold: Decimal::new(500, 0),
        }
    }
}

/// Monetary summary of a cart or an order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl PricingPolicy {
    /// Price a non-empty set of `(unit_price, quantity)` pairs.
    pub fn quote<I>(&self, lines: I) -> Pricing
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let items_price: Decimal = lines.into_iter().map(|(price, qty)| price * Decimal::from(qty)).sum();
        let tax_price = (items_price * self.tax_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let shipping_price = if items_price >= self.free_shipping_threshold { Decimal::ZERO } else { self.shipping_fee };
        Pricing { items_price, tax_price, shipping_price, total_price: items_price + tax_price + shipping_price }
    }
}
