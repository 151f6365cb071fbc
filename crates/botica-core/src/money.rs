//! # Money Module
//!
//! Monetary values, VAT rates and the order totals calculator.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Pharmacy surcharges make it worse:                                     │
//! │    5.2% of 37.50 = 1.95 exactly — but only in decimal arithmetic        │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal::Decimal                                    │
//! │    Exact base-10 arithmetic, full precision in intermediate sums,       │
//! │    rounding to 2 decimals only at serialization boundaries              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Where Money Flows
//! ```text
//! Product.price ──► OrderItem.unit_price (frozen) ──► OrderItem.subtotal
//!                                                          │
//!        OrderTotals::from_items ◄─────────────────────────┘
//!                │
//!                ├── subtotal        Σ line subtotals
//!                ├── tax_total       Σ line VAT amounts
//!                ├── surcharge_total per-VAT-rate surcharge over grouped bases
//!                └── grand_total     subtotal + tax + surcharge ──► Invoice.total
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::OrderItem;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in euros, backed by an exact decimal.
///
/// ## Design Decisions
/// - **Decimal (not f64)**: money never touches binary floating point
/// - **Full precision**: intermediate results keep every digit; only
///   [`Money::rounded`] clamps to 2 decimals, and only for display/serialization
/// - **Single field tuple struct**: zero-cost abstraction over `Decimal`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value from a decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Zero euros.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Returns the exact underlying amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount rounded to 2 decimal places.
    ///
    /// Uses banker's rounding (round half to even), which avoids the
    /// systematic bias of always rounding half up across many documents.
    /// This is the ONLY place precision is dropped; use it when projecting
    /// a value into a view or a persisted invoice total, never inside sums.
    #[inline]
    pub fn rounded(&self) -> Decimal {
        self.0.round_dp(2)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiplies the amount by an integer quantity.
    ///
    /// ## Example
    /// ```rust
    /// use botica_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let unit_price = Money::new(Decimal::new(1250, 2)); // 12.50
    /// let line = unit_price.multiply_quantity(3);
    /// assert_eq!(line.amount(), Decimal::new(3750, 2)); // 37.50
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }

    /// Applies a percentage (e.g. a VAT or surcharge rate) to this amount.
    ///
    /// `21` means 21%, so `apply_percent(Decimal::from(21))` on 100.00
    /// yields 21.00. The result keeps full precision.
    #[inline]
    pub fn apply_percent(&self, percent: Decimal) -> Self {
        Money(self.0 * percent / Decimal::ONE_HUNDRED)
    }
}

/// Display shows the rounded amount with two decimals, for logs and receipts.
/// Frontend formatting (thousands separators, currency symbol placement)
/// is out of scope here.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} €", self.rounded())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// A VAT rate expressed in percent (21 means 21%).
///
/// Spanish pharmacy distribution uses three VAT regimes — 4%, 10% and 21% —
/// each tied to an equivalence-surcharge rate ("recargo de equivalencia")
/// charged to retail pharmacies on top of VAT:
///
/// | VAT  | Surcharge |
/// |------|-----------|
/// | 4%   | 0.5%      |
/// | 10%  | 1.4%      |
/// | 21%  | 5.2%      |
/// | other| 0%        |
///
/// Rates outside the canonical set are rejected by validation when a product
/// is created, but the lookup itself tolerates them (zero surcharge) so that
/// historical line items never fail a totals computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Creates a tax rate from a percent value.
    #[inline]
    pub const fn new(percent: Decimal) -> Self {
        TaxRate(percent)
    }

    /// Returns the rate in percent.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// The canonical equivalence-surcharge rate for this VAT rate, in percent.
    ///
    /// Pure function of the rate: 4→0.5, 10→1.4, 21→5.2, anything else→0.
    pub fn surcharge_rate(&self) -> Decimal {
        if self.0 == Decimal::from(4) {
            Decimal::new(5, 1) // 0.5
        } else if self.0 == Decimal::from(10) {
            Decimal::new(14, 1) // 1.4
        } else if self.0 == Decimal::from(21) {
            Decimal::new(52, 1) // 5.2
        } else {
            Decimal::ZERO
        }
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// The four derived totals of an order.
///
/// Totals are NEVER stored on the order row. They are recomputed from the
/// owned line items every time they are needed, so an order can never carry
/// a stale cached total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderTotals {
    /// Sum of line subtotals (without VAT).
    pub subtotal: Money,
    /// Sum of line VAT amounts.
    pub tax_total: Money,
    /// Equivalence surcharge over the per-VAT-rate grouped bases.
    pub surcharge_total: Money,
    /// subtotal + tax_total + surcharge_total.
    pub grand_total: Money,
}

impl OrderTotals {
    /// Computes the totals of an order from its line items.
    ///
    /// ## Algorithm
    /// 1. `subtotal` and `tax_total` sum the persisted line amounts.
    /// 2. For the surcharge, line subtotals are grouped by VAT rate and each
    ///    group's base is multiplied by its canonical surcharge percentage.
    /// 3. `grand_total` is the exact sum of the three — no rounding happens
    ///    here, so `grand_total == subtotal + tax_total + surcharge_total`
    ///    holds to the last digit.
    ///
    /// An empty item slice yields all-zero totals; it is not an error.
    pub fn from_items(items: &[OrderItem]) -> Self {
        let mut subtotal = Money::zero();
        let mut tax_total = Money::zero();

        // Per-VAT-rate bases for the surcharge. Three rates in practice, so a
        // linear scan beats a map.
        let mut bases: Vec<(TaxRate, Money)> = Vec::new();

        for item in items {
            subtotal += item.subtotal;
            tax_total += item.tax_amount;

            match bases.iter_mut().find(|(rate, _)| *rate == item.tax_rate) {
                Some((_, base)) => *base += item.subtotal,
                None => bases.push((item.tax_rate, item.subtotal)),
            }
        }

        let mut surcharge_total = Money::zero();
        for (rate, base) in &bases {
            surcharge_total += base.apply_percent(rate.surcharge_rate());
        }

        let grand_total = subtotal + tax_total + surcharge_total;

        OrderTotals {
            subtotal,
            tax_total,
            surcharge_total,
            grand_total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item(qty: i64, unit_price: Decimal, tax_percent: Decimal) -> OrderItem {
        let mut item = OrderItem {
            id: "item".to_string(),
            order_id: "order".to_string(),
            product_id: "product".to_string(),
            code_snapshot: "P-001".to_string(),
            name_snapshot: "Paracetamol 1g".to_string(),
            quantity: qty,
            unit_price: Money::new(unit_price),
            tax_rate: TaxRate::new(tax_percent),
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            total: Money::zero(),
            created_at: Utc::now(),
        };
        item.compute_amounts();
        item
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(10.00));
        let b = Money::new(dec!(2.50));

        assert_eq!((a + b).amount(), dec!(12.50));
        assert_eq!((a - b).amount(), dec!(7.50));
        assert_eq!((b * 4).amount(), dec!(10.00));
    }

    #[test]
    fn test_money_display_rounds_to_two_decimals() {
        assert_eq!(format!("{}", Money::new(dec!(1.955))), "1.96 €");
        assert_eq!(format!("{}", Money::new(dec!(5))), "5.00 €");
    }

    #[test]
    fn test_rounded_keeps_sums_exact_internally() {
        // 1.005 + 1.005 = 2.01 exactly; rounding each addend first would
        // give 2.00 under banker's rounding.
        let sum = Money::new(dec!(1.005)) + Money::new(dec!(1.005));
        assert_eq!(sum.amount(), dec!(2.010));
        assert_eq!(sum.rounded(), dec!(2.01));
    }

    #[test]
    fn test_surcharge_lookup_is_pure() {
        assert_eq!(TaxRate::new(dec!(4)).surcharge_rate(), dec!(0.5));
        assert_eq!(TaxRate::new(dec!(10)).surcharge_rate(), dec!(1.4));
        assert_eq!(TaxRate::new(dec!(21)).surcharge_rate(), dec!(5.2));
        // Out-of-set rates fall back to zero surcharge, not an error
        assert_eq!(TaxRate::new(dec!(7)).surcharge_rate(), dec!(0));
        assert_eq!(TaxRate::new(dec!(0)).surcharge_rate(), dec!(0));
        // Numerically equal representations agree
        assert_eq!(TaxRate::new(dec!(21.0)).surcharge_rate(), dec!(5.2));
    }

    #[test]
    fn test_totals_of_empty_order_are_zero() {
        let totals = OrderTotals::from_items(&[]);
        assert!(totals.subtotal.is_zero());
        assert!(totals.tax_total.is_zero());
        assert!(totals.surcharge_total.is_zero());
        assert!(totals.grand_total.is_zero());
    }

    #[test]
    fn test_totals_single_item_at_21_percent() {
        // 3 × 12.50 = 37.50; VAT 21% = 7.875; surcharge 5.2% = 1.95
        let totals = OrderTotals::from_items(&[item(3, dec!(12.50), dec!(21))]);

        assert_eq!(totals.subtotal.amount(), dec!(37.50));
        assert_eq!(totals.tax_total.amount(), dec!(7.8750));
        assert_eq!(totals.surcharge_total.amount(), dec!(1.9500));
        assert_eq!(totals.grand_total.amount(), dec!(47.3250));
    }

    #[test]
    fn test_totals_group_surcharge_by_rate() {
        // Two 21% lines share one surcharge base; the 4% line gets its own.
        let items = vec![
            item(2, dec!(10.00), dec!(21)), // base 20.00
            item(1, dec!(5.00), dec!(21)),  // base  5.00
            item(4, dec!(2.50), dec!(4)),   // base 10.00
        ];
        let totals = OrderTotals::from_items(&items);

        assert_eq!(totals.subtotal.amount(), dec!(35.00));
        // VAT: 25.00 × 21% + 10.00 × 4% = 5.25 + 0.40
        assert_eq!(totals.tax_total.amount(), dec!(5.6500));
        // Surcharge: 25.00 × 5.2% + 10.00 × 0.5% = 1.30 + 0.05
        assert_eq!(totals.surcharge_total.amount(), dec!(1.3500));
        assert_eq!(
            totals.grand_total.amount(),
            totals.subtotal.amount() + totals.tax_total.amount() + totals.surcharge_total.amount()
        );
    }

    #[test]
    fn test_grand_total_identity_holds_for_many_items() {
        let items: Vec<OrderItem> = (1..=20)
            .map(|i| {
                let rate = match i % 4 {
                    0 => dec!(4),
                    1 => dec!(10),
                    2 => dec!(21),
                    _ => dec!(7), // tolerated off-catalog rate, zero surcharge
                };
                item(i, dec!(3.33), rate)
            })
            .collect();

        let totals = OrderTotals::from_items(&items);
        assert_eq!(
            totals.grand_total,
            totals.subtotal + totals.tax_total + totals.surcharge_total
        );
    }

    #[test]
    fn test_off_catalog_rate_contributes_no_surcharge() {
        let totals = OrderTotals::from_items(&[item(10, dec!(1.00), dec!(7))]);
        assert_eq!(totals.subtotal.amount(), dec!(10.00));
        assert_eq!(totals.tax_total.amount(), dec!(0.7000));
        assert!(totals.surcharge_total.is_zero());
    }
}
