//! # motorbill-core: Pure Business Logic for Motorbill
//!
//! Everything that has a real invariant lives here: the per-field input
//! rules, integer money, the line-item store, the totals engine and the
//! read-only document snapshot. No I/O, no async, no logging.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Motorbill Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Front end (CLI / web form / desktop)               │   │
//! │  │     keystrokes, cell edits, add/delete row, recalc, export      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           motorbill-export (QuoteSession, pipeline)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ motorbill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌────────────┐ ┌─────────┐ ┌─────────┐ ┌────────┐ ┌─────────┐ │   │
//! │  │  │ validation │ │  money  │ │  lines  │ │ totals │ │snapshot │ │   │
//! │  │  │ form       │ │  Money  │ │LineStore│ │ Totals │ │Document │ │   │
//! │  │  └────────────┘ └─────────┘ └─────────┘ └────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO ASYNC • PURE FUNCTIONS                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Field identifiers, document types, workshop profile
//! - [`money`] - Money in paise with Indian-locale formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Keystroke rules and the rejection policy seam
//! - [`form`] - The editable document header
//! - [`lines`] - Ordered service-line store
//! - [`totals`] - Spares / labour / grand totals
//! - [`snapshot`] - Print projection consumed by the export pipeline
//!
//! ## Example Usage
//!
//! ```rust
//! use motorbill_core::{compute_totals, LineField, LineStore};
//!
//! let mut lines = LineStore::with_blank_rows(1);
//! let id = lines.ids()[0];
//! lines.update_line(id, LineField::Description, "Brake Pad");
//! lines.update_line(id, LineField::Quantity, "2");
//! lines.update_line(id, LineField::Spares, "500");
//!
//! let totals = compute_totals(lines.lines());
//! assert_eq!(totals.grand.to_string(), "₹1,000.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod form;
pub mod lines;
pub mod money;
pub mod snapshot;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use form::{FieldOutcome, FormRecord};
pub use lines::{LineId, LineStore, ServiceLine};
pub use money::Money;
pub use snapshot::{DocumentSnapshot, SnapshotField, SnapshotRow};
pub use totals::{compute_totals, Totals};
pub use types::*;
pub use validation::{RejectionPolicy, SilentReject, SurfaceErrors};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of blank rows a fresh session starts with.
pub const DEFAULT_LINE_COUNT: usize = 5;

/// The line table is never allowed to shrink below this.
pub const MIN_LINE_COUNT: usize = 1;

/// Country-code prefix rendered in front of every phone number.
pub const PHONE_PREFIX: &str = "+91";

/// National phone number length (digits after the prefix).
pub const PHONE_DIGITS: usize = 10;
