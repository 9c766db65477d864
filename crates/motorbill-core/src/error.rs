//! # Error Types
//!
//! Domain-specific error types for motorbill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  motorbill-core errors (this file)                                      │
//! │  ├── CoreError        - Unknown identifiers coming from outside         │
//! │  └── ValidationError  - Keystroke rejected by a field rule              │
//! │                                                                         │
//! │  motorbill-export errors (separate crate)                               │
//! │  └── ExportError      - Export attempt failures (surfaced to the user)  │
//! │                                                                         │
//! │  Data-entry errors are silent by default: ValidationError only leaves   │
//! │  the core when the caller opts into the SurfaceErrors policy.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::FormField;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised when text from the outside world (quote files, front-end
/// field names) does not map onto a core identifier.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Field name does not correspond to any form field.
    #[error("Unknown form field: {0}")]
    UnknownField(String),

    /// Column name does not correspond to any line-item cell.
    #[error("Unknown line field: {0}")]
    UnknownLineField(String),

    /// Document type name is not one of the five supported types.
    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A keystroke rejected by a field rule.
///
/// The rule never partially sanitises: either the whole candidate value is
/// accepted (possibly reformatted) or the field keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A character outside the field's allowed set was typed.
    #[error("{field} does not accept '{found}'; allowed: {allowed}")]
    InvalidCharacter {
        field: FormField,
        found: char,
        allowed: &'static str,
    },

    /// The value as a whole has the wrong shape (e.g. not a calendar date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: FormField,
        reason: &'static str,
    },
}

impl ValidationError {
    /// The field whose rule produced this rejection.
    pub fn field(&self) -> FormField {
        match self {
            ValidationError::InvalidCharacter { field, .. }
            | ValidationError::InvalidFormat { field, .. } => *field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::InvalidCharacter {
            field: FormField::CustomerName,
            found: '4',
            allowed: "letters, spaces and periods",
        };
        assert_eq!(
            err.to_string(),
            "customer name does not accept '4'; allowed: letters, spaces and periods"
        );
        assert_eq!(err.field(), FormField::CustomerName);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err = ValidationError::InvalidFormat {
            field: FormField::Date,
            reason: "expected YYYY-MM-DD",
        };
        let core_err: CoreError = err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
