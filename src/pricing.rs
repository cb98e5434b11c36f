//! Totals computation and the tiered discount schedule.
//!
//! `compute_totals` is a pure function: the same verified-line list and
//! schedule always yield the same `(subtotal, discount, total)`. This is
//! what later amount-mismatch detection reconciles against.

use serde::Deserialize;

use crate::types::VerifiedLine;

/// One discount tier: orders with `subtotal >= min_subtotal_cents` earn
/// `discount_cents` off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscountTier {
    pub min_subtotal_cents: i64,
    pub discount_cents: i64,
}

/// Default schedule: $5 off at $50, $15 off at $100.
pub fn default_tiers() -> Vec<DiscountTier> {
    vec![
        DiscountTier {
            min_subtotal_cents: 5_000,
            discount_cents: 500,
        },
        DiscountTier {
            min_subtotal_cents: 10_000,
            discount_cents: 1_500,
        },
    ]
}

/// Computed monetary breakdown of a checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

/// Compute `(subtotal, discount, total)` for a set of verified lines.
///
/// The best (largest-threshold) tier whose threshold the subtotal meets is
/// applied; `total = max(0, subtotal - discount)`.
pub fn compute_totals(lines: &[VerifiedLine], tiers: &[DiscountTier]) -> Totals {
    let subtotal_cents: i64 = lines.iter().map(VerifiedLine::line_total_cents).sum();

    let discount_cents = tiers
        .iter()
        .filter(|t| subtotal_cents >= t.min_subtotal_cents)
        .max_by_key(|t| t.min_subtotal_cents)
        .map(|t| t.discount_cents)
        .unwrap_or(0);

    Totals {
        subtotal_cents,
        discount_cents,
        total_cents: (subtotal_cents - discount_cents).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vline(product_id: &str, price: i64, qty: i64) -> VerifiedLine {
        VerifiedLine {
            product_id: product_id.to_string(),
            name: format!("Product {product_id}"),
            unit_price_cents: price,
            quantity: qty,
        }
    }

    #[test]
    fn test_totals_below_first_tier() {
        // (11.00 x 2) + (20.00 x 1) = 42.00, under the $50 threshold
        let lines = vec![vline("p1", 1100, 2), vline("p2", 2000, 1)];
        let totals = compute_totals(&lines, &default_tiers());

        assert_eq!(totals.subtotal_cents, 4200);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 4200);
    }

    #[test]
    fn test_totals_first_tier() {
        let lines = vec![vline("p1", 3000, 2)];
        let totals = compute_totals(&lines, &default_tiers());

        assert_eq!(totals.subtotal_cents, 6000);
        assert_eq!(totals.discount_cents, 500);
        assert_eq!(totals.total_cents, 5500);
    }

    #[test]
    fn test_totals_best_tier_wins() {
        let lines = vec![vline("p1", 6000, 2)];
        let totals = compute_totals(&lines, &default_tiers());

        assert_eq!(totals.subtotal_cents, 12_000);
        assert_eq!(totals.discount_cents, 1_500);
        assert_eq!(totals.total_cents, 10_500);
    }

    #[test]
    fn test_total_never_negative() {
        let tiers = vec![DiscountTier {
            min_subtotal_cents: 0,
            discount_cents: 10_000,
        }];
        let lines = vec![vline("p1", 100, 1)];
        let totals = compute_totals(&lines, &tiers);

        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_deterministic() {
        let lines = vec![vline("p1", 1100, 2), vline("p2", 2000, 1)];
        let a = compute_totals(&lines, &default_tiers());
        let b = compute_totals(&lines, &default_tiers());
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_lines() {
        let totals = compute_totals(&[], &default_tiers());
        assert_eq!(totals.subtotal_cents, 0);
        assert_eq!(totals.total_cents, 0);
    }
}
