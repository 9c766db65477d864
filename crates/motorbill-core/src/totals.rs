//! # Totals Module
//!
//! Derives the three document totals from the line store.
//!
//! ```text
//! spares = Σ line.spares × line.quantity
//! labor  = Σ line.rr + line.dr + line.cw + line.painting
//! grand  = spares + labor
//! ```
//!
//! Totals are recomputed on an explicit trigger (the recalculate action, or
//! the first step of every export), never reactively.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::lines::ServiceLine;
use crate::money::Money;

/// Derived document totals. Never edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub spares: Money,
    pub labor: Money,
    pub grand: Money,
}

/// Computes totals over every line, blank description or not.
pub fn compute_totals(lines: &[ServiceLine]) -> Totals {
    let spares: Money = lines.iter().map(ServiceLine::spares_total).sum();
    let labor: Money = lines.iter().map(ServiceLine::labor).sum();
    Totals {
        spares,
        labor,
        grand: spares + labor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::LineStore;
    use crate::types::LineField;

    #[test]
    fn test_empty_rows_total_zero() {
        let store = LineStore::default();
        assert_eq!(compute_totals(store.lines()), Totals::default());
    }

    #[test]
    fn test_three_line_scenario() {
        let mut store = LineStore::with_blank_rows(3);
        let ids = store.ids();

        store.update_line(ids[0], LineField::Description, "Brake Pad");
        store.update_line(ids[0], LineField::Quantity, "2");
        store.update_line(ids[0], LineField::Spares, "500");

        store.update_line(ids[1], LineField::Description, "Painting");
        store.update_line(ids[1], LineField::Painting, "3000");

        let totals = compute_totals(store.lines());
        assert_eq!(totals.spares, Money::from_rupees(1000));
        assert_eq!(totals.labor, Money::from_rupees(3000));
        assert_eq!(totals.grand, Money::from_rupees(4000));
    }

    #[test]
    fn test_blank_description_rows_still_count() {
        let mut store = LineStore::with_blank_rows(2);
        let ids = store.ids();
        store.update_line(ids[1], LineField::CleanWash, "250");

        let totals = compute_totals(store.lines());
        assert_eq!(totals.labor, Money::from_rupees(250));
        assert_eq!(totals.grand, totals.spares + totals.labor);
    }
}
