//! # Lines Module
//!
//! Ordered store of service lines (one row per repair item).
//!
//! ## Row Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_line()          ──► append row, fresh id, qty 1, zero costs        │
//! │  update_line(id,..)  ──► parse cell text, store (garbage → 0)           │
//! │  remove_line(id)     ──► delete row, unless it is the LAST one          │
//! │                                                                         │
//! │  Ids come from a monotonic counter and are never reused, so a deleted   │
//! │  row's id can't accidentally address a newer row.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{parse_amount, Money};
use crate::types::LineField;
use crate::{DEFAULT_LINE_COUNT, MIN_LINE_COUNT};

// =============================================================================
// Line Identity
// =============================================================================

/// Stable identity of a service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineId(pub u64);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Service Line
// =============================================================================

/// One row of the estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLine {
    pub id: LineId,
    pub description: String,
    pub quantity: u32,
    /// Unit cost of spare parts; multiplied by quantity.
    pub spares: Money,
    /// Removal / refit.
    pub rr: Money,
    /// Dismantle / reassemble.
    pub dr: Money,
    /// Clean / wash.
    pub cw: Money,
    pub painting: Money,
}

impl ServiceLine {
    /// A blank row: quantity 1, zero costs.
    pub fn blank(id: LineId) -> Self {
        ServiceLine {
            id,
            description: String::new(),
            quantity: 1,
            spares: Money::zero(),
            rr: Money::zero(),
            dr: Money::zero(),
            cw: Money::zero(),
            painting: Money::zero(),
        }
    }

    /// `spares * quantity`
    pub fn spares_total(&self) -> Money {
        self.spares * self.quantity
    }

    /// Sum of the four labour cells. Labour is per line, not per unit.
    pub fn labor(&self) -> Money {
        self.rr + self.dr + self.cw + self.painting
    }

    /// `spares * quantity + rr + dr + cw + painting`
    pub fn subtotal(&self) -> Money {
        self.spares_total() + self.labor()
    }

    /// Rows without a description are working rows, not printed ones.
    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }

    fn apply(&mut self, field: LineField, raw: &str) {
        match field {
            LineField::Description => self.description = raw.to_string(),
            LineField::Quantity => self.quantity = parse_quantity(raw),
            LineField::Spares => self.spares = parse_amount(raw),
            LineField::RemovalRefit => self.rr = parse_amount(raw),
            LineField::DismantleReassemble => self.dr = parse_amount(raw),
            LineField::CleanWash => self.cw = parse_amount(raw),
            LineField::Painting => self.painting = parse_amount(raw),
        }
    }
}

/// Parses a quantity cell.
///
/// Separators are stripped, fractions truncate toward zero, and anything
/// negative, non-finite or unparseable becomes 0.
pub fn parse_quantity(raw: &str) -> u32 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

// =============================================================================
// Line Store
// =============================================================================

/// Insertion-ordered collection of service lines, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineStore {
    lines: Vec<ServiceLine>,
    next_id: u64,
}

impl LineStore {
    /// Creates a store with `count` blank rows (at least one).
    pub fn with_blank_rows(count: usize) -> Self {
        let mut store = LineStore {
            lines: Vec::new(),
            next_id: 0,
        };
        for _ in 0..count.max(MIN_LINE_COUNT) {
            store.add_line();
        }
        store
    }

    /// Appends a blank row and returns its id.
    pub fn add_line(&mut self) -> LineId {
        let id = LineId(self.next_id);
        self.next_id += 1;
        self.lines.push(ServiceLine::blank(id));
        id
    }

    /// Deletes a row.
    ///
    /// Returns `false` (and changes nothing) when the id is unknown or the
    /// row is the only one left.
    pub fn remove_line(&mut self, id: LineId) -> bool {
        if self.lines.len() <= MIN_LINE_COUNT {
            return false;
        }
        match self.position(id) {
            Some(index) => {
                self.lines.remove(index);
                true
            }
            None => false,
        }
    }

    /// Parses `raw` into one cell of a row. `false` if the id is unknown.
    pub fn update_line(&mut self, id: LineId, field: LineField, raw: &str) -> bool {
        match self.lines.iter_mut().find(|line| line.id == id) {
            Some(line) => {
                line.apply(field, raw);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: LineId) -> Option<&ServiceLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Rows in display order.
    pub fn lines(&self) -> &[ServiceLine] {
        &self.lines
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<LineId> {
        self.lines.iter().map(|line| line.id).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn position(&self, id: LineId) -> Option<usize> {
        self.lines.iter().position(|line| line.id == id)
    }
}

impl Default for LineStore {
    fn default() -> Self {
        Self::with_blank_rows(DEFAULT_LINE_COUNT)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_has_five_blank_rows() {
        let store = LineStore::default();
        assert_eq!(store.len(), 5);
        assert_eq!(store.ids(), (0..5).map(LineId).collect::<Vec<_>>());
        assert!(store.lines().iter().all(|l| l.quantity == 1 && l.subtotal().is_zero()));
    }

    #[test]
    fn test_with_zero_rows_still_has_one() {
        assert_eq!(LineStore::with_blank_rows(0).len(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = LineStore::with_blank_rows(2);
        let second = store.ids()[1];
        assert!(store.remove_line(second));

        let added = store.add_line();
        assert_eq!(added, LineId(2));
        assert!(store.get(second).is_none());
    }

    #[test]
    fn test_last_line_cannot_be_removed() {
        let mut store = LineStore::with_blank_rows(1);
        let only = store.ids()[0];
        assert!(!store.remove_line(only));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id_is_a_no_op() {
        let mut store = LineStore::with_blank_rows(2);
        let before = store.clone();
        assert!(!store.remove_line(LineId(99)));
        assert!(!store.update_line(LineId(99), LineField::Spares, "10"));
        assert_eq!(store, before);
    }

    #[test]
    fn test_update_parses_cells() {
        let mut store = LineStore::with_blank_rows(1);
        let id = store.ids()[0];
        store.update_line(id, LineField::Description, "  Bumper ");
        store.update_line(id, LineField::Quantity, "2");
        store.update_line(id, LineField::Spares, "1,250.50");
        store.update_line(id, LineField::Painting, "abc");

        let line = store.get(id).unwrap();
        assert_eq!(line.description, "  Bumper ");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.spares, Money::from_paise(125_050));
        assert_eq!(line.painting, Money::zero());
        assert_eq!(line.subtotal(), Money::from_rupees(2501));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity("2.9"), 2);
        assert_eq!(parse_quantity("1,000"), 1000);
        assert_eq!(parse_quantity("-4"), 0);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("two"), 0);
    }

    #[test]
    fn test_subtotal_invariant() {
        let mut line = ServiceLine::blank(LineId(0));
        line.quantity = 3;
        line.spares = Money::from_rupees(100);
        line.rr = Money::from_rupees(10);
        line.dr = Money::from_rupees(20);
        line.cw = Money::from_rupees(30);
        line.painting = Money::from_rupees(40);
        assert_eq!(line.subtotal(), Money::from_rupees(400));
        assert_eq!(line.labor(), Money::from_rupees(100));
    }
}
