//! # Line Pricing
//!
//! Resolves what a line actually costs at checkout time.
//!
//! ## Snapshot vs. Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  When an order is taken, the item row snapshots the prices it saw       │
//! │  (unit_price, total_price) so receipts stay stable. Checkout does NOT   │
//! │  trust those snapshots: it re-resolves every line against the menu's    │
//! │  current base price plus the stored modifier adjustments:               │
//! │                                                                         │
//! │      unit  = base + Σ option adjustments + Σ topping prices             │
//! │      total = unit × quantity                                            │
//! │                                                                         │
//! │  A menu item that vanished mid-visit has no base price to resolve       │
//! │  against; that surfaces as an error upstream, never a ¥0 line.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Largest quantity a single line may carry.
pub const MAX_LINE_QUANTITY: i64 = 999;

// =============================================================================
// Line Resolution
// =============================================================================

/// A fully resolved line price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePricing {
    /// Per-unit price including modifiers.
    pub unit_price: Money,
    /// `unit_price` × quantity.
    pub total_price: Money,
}

/// Resolves one order line against the current menu base price.
///
/// `option_adjustments` are signed deltas ("less rice" may subtract);
/// `topping_prices` are always additive. Quantity must be 1 to
/// [`MAX_LINE_QUANTITY`].
///
/// ## Example
/// ```rust
/// use kaikei_core::money::Money;
/// use kaikei_core::pricing::resolve_line;
///
/// let line = resolve_line(
///     Money::from_yen(1500),
///     &[],
///     &[Money::from_yen(200)],
///     1,
/// )
/// .unwrap();
/// assert_eq!(line.unit_price, Money::from_yen(1700));
/// assert_eq!(line.total_price, Money::from_yen(1700));
/// ```
pub fn resolve_line(
    base_price: Money,
    option_adjustments: &[Money],
    topping_prices: &[Money],
    quantity: i64,
) -> CoreResult<LinePricing> {
    if quantity < 1 || quantity > MAX_LINE_QUANTITY {
        return Err(CoreError::QuantityOutOfRange {
            requested: quantity,
            max: MAX_LINE_QUANTITY,
        });
    }

    let modifiers: Money = option_adjustments.iter().copied().sum::<Money>()
        + topping_prices.iter().copied().sum::<Money>();
    let unit_price = base_price + modifiers;

    Ok(LinePricing {
        unit_price,
        total_price: unit_price.multiply_quantity(quantity),
    })
}

// =============================================================================
// Cycle Totals
// =============================================================================

/// Running totals for a sales cycle being closed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTotals {
    /// Orders folded in so far.
    pub order_count: i64,
    /// Sum of line quantities.
    pub total_items: i64,
    /// Sum of resolved line totals.
    pub total_amount: Money,
}

impl CycleTotals {
    pub fn new() -> Self {
        CycleTotals::default()
    }

    /// Folds one resolved line into the totals.
    pub fn add_line(&mut self, line: &LinePricing, quantity: i64) {
        self.total_items += quantity;
        self.total_amount += line.total_price;
    }

    /// Counts an order whose lines have been folded in.
    pub fn add_order(&mut self) {
        self.order_count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line() {
        let line = resolve_line(Money::from_yen(1000), &[], &[], 2).unwrap();
        assert_eq!(line.unit_price, Money::from_yen(1000));
        assert_eq!(line.total_price, Money::from_yen(2000));
    }

    #[test]
    fn test_line_with_topping() {
        let line = resolve_line(Money::from_yen(1500), &[], &[Money::from_yen(200)], 1).unwrap();
        assert_eq!(line.unit_price, Money::from_yen(1700));
        assert_eq!(line.total_price, Money::from_yen(1700));
    }

    #[test]
    fn test_negative_option_adjustment() {
        // "Small portion -100"
        let line = resolve_line(
            Money::from_yen(800),
            &[Money::from_yen(-100)],
            &[],
            3,
        )
        .unwrap();
        assert_eq!(line.unit_price, Money::from_yen(700));
        assert_eq!(line.total_price, Money::from_yen(2100));
    }

    #[test]
    fn test_modifiers_stack() {
        let line = resolve_line(
            Money::from_yen(500),
            &[Money::from_yen(50), Money::from_yen(-30)],
            &[Money::from_yen(100), Money::from_yen(150)],
            2,
        )
        .unwrap();
        assert_eq!(line.unit_price, Money::from_yen(770));
        assert_eq!(line.total_price, Money::from_yen(1540));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(matches!(
            resolve_line(Money::from_yen(500), &[], &[], 0),
            Err(CoreError::QuantityOutOfRange { requested: 0, .. })
        ));
        assert!(matches!(
            resolve_line(Money::from_yen(500), &[], &[], -2),
            Err(CoreError::QuantityOutOfRange { .. })
        ));
        assert!(matches!(
            resolve_line(Money::from_yen(500), &[], &[], 1000),
            Err(CoreError::QuantityOutOfRange { .. })
        ));
        assert!(resolve_line(Money::from_yen(500), &[], &[], 999).is_ok());
    }

    #[test]
    fn test_cycle_totals_fold() {
        let mut totals = CycleTotals::new();
        assert!(totals.is_empty());

        // Order A: 2 × ¥1000, no modifiers.
        let a = resolve_line(Money::from_yen(1000), &[], &[], 2).unwrap();
        totals.add_line(&a, 2);
        totals.add_order();

        // Order B: 1 × ¥1500 with a ¥200 topping.
        let b = resolve_line(Money::from_yen(1500), &[], &[Money::from_yen(200)], 1).unwrap();
        totals.add_line(&b, 1);
        totals.add_order();

        assert!(!totals.is_empty());
        assert_eq!(totals.order_count, 2);
        assert_eq!(totals.total_items, 3);
        assert_eq!(totals.total_amount, Money::from_yen(3700));
    }
}
