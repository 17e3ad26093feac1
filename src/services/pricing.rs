//! Cart and order totals.
//!
//! All amounts are `Decimal` in the store currency (VND by default). The
//! same functions price a cart view and a checkout, so what the customer
//! sees in the cart is what the order records.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::entities::store_setting;

/// Shipping fee rules taken from the store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRules {
    pub flat_fee: Decimal,
    /// Zero disables free shipping.
    pub free_shipping_threshold: Decimal,
}

impl From<&store_setting::Model> for ShippingRules {
    fn from(settings: &store_setting::Model) -> Self {
        Self {
            flat_fee: settings.shipping_fee,
            free_shipping_threshold: settings.free_shipping_threshold,
        }
    }
}

/// A priced line: what was bought, at what unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn new(unit_price: Decimal, quantity: i32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

/// `unit_price * quantity`; non-positive quantities contribute nothing.
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    if quantity <= 0 {
        return Decimal::ZERO;
    }
    unit_price * Decimal::from(quantity)
}

pub fn subtotal<'a, I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = &'a PricedLine>,
{
    lines
        .into_iter()
        .map(|line| line_total(line.unit_price, line.quantity))
        .sum()
}

/// Percentage discount rounded to whole currency units, half away from zero.
pub fn discount(subtotal: Decimal, percent: i32) -> Decimal {
    let percent = percent.clamp(0, 100);
    if percent == 0 || subtotal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (subtotal * Decimal::from(percent) / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Fee charged on a basket worth `amount` after discount.
pub fn shipping_fee(amount: Decimal, has_items: bool, rules: &ShippingRules) -> Decimal {
    if !has_items {
        return Decimal::ZERO;
    }
    if rules.free_shipping_threshold > Decimal::ZERO && amount >= rules.free_shipping_threshold {
        return Decimal::ZERO;
    }
    rules.flat_fee.max(Decimal::ZERO)
}

pub fn compute_totals(
    lines: &[PricedLine],
    discount_percent: i32,
    rules: &ShippingRules,
) -> OrderTotals {
    let subtotal = subtotal(lines);
    let discount_total = discount(subtotal, discount_percent);
    let has_items = lines.iter().any(|line| line.quantity > 0);
    let shipping_fee = shipping_fee(subtotal - discount_total, has_items, rules);
    let total = (subtotal - discount_total + shipping_fee).max(Decimal::ZERO);

    OrderTotals {
        subtotal,
        discount_total,
        shipping_fee,
        total,
    }
}

/// Amount in whole currency units as ZaloPay expects it (VND has no minor unit).
pub fn to_minor_units(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}
