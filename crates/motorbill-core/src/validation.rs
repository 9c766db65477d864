//! # Validation Module
//!
//! Keystroke-level rules for every header field.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate(field, candidate)                                             │
//! │       │                                                                 │
//! │       ├── Ok(value)  → value is stored (possibly reformatted)           │
//! │       │                                                                 │
//! │       └── Err(e)     → RejectionPolicy decides what the caller sees;    │
//! │                        the stored value never changes                   │
//! │                                                                         │
//! │  IDEMPOTENT: validate(f, validate(f, s)?) == validate(f, s)             │
//! │  Controlled inputs feed the stored value back on every render, so a    │
//! │  rule that is not idempotent would corrupt the field.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rule Families
//! | Class          | Fields                  | Rule                                  |
//! |----------------|-------------------------|---------------------------------------|
//! | PersonName     | customer name, estimator| letters, spaces, `.`                  |
//! | Address        | address                 | letters, digits, spaces, `. , # / -`  |
//! | Registration   | vehicle registration    | letters, digits, spaces → UPPERCASE   |
//! | Digits         | reference number, year  | digits only                           |
//! | Phone          | phone                   | always accepted, `+91 XXX XXX XXXX`   |
//! | Odometer       | odometer                | digits regrouped `1,23,456`           |
//! | CompanyName    | make, insurer           | letters, spaces                       |
//! | FreeText       | model                   | anything but `< > { } [ ]`            |
//! | Date           | date                    | empty or `YYYY-MM-DD`                 |
//! | DocumentType   | document type           | one of the five document types        |

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::group_indian;
use crate::types::{DocumentType, FieldClass, FormField};
use crate::{PHONE_DIGITS, PHONE_PREFIX};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const ADDRESS_PUNCTUATION: &str = ".,#/-";
const FORBIDDEN_FREE_TEXT: &str = "<>{}[]";

// =============================================================================
// Entry Point
// =============================================================================

/// Runs the rule for `field` against a full candidate value.
///
/// ## Example
/// ```rust
/// use motorbill_core::validation::validate;
/// use motorbill_core::FormField;
///
/// assert_eq!(validate(FormField::VehicleRegistration, "tn 38 ab 1234").unwrap(), "TN 38 AB 1234");
/// assert_eq!(validate(FormField::Odometer, "123456").unwrap(), "1,23,456");
/// assert!(validate(FormField::CustomerName, "R2D2").is_err());
/// ```
pub fn validate(field: FormField, raw: &str) -> ValidationResult<String> {
    match field.class() {
        FieldClass::PersonName => {
            require_chars(field, raw, "letters, spaces and periods", |c| {
                c.is_alphabetic() || c == ' ' || c == '.'
            })
        }
        FieldClass::Address => require_chars(
            field,
            raw,
            "letters, digits, spaces and . , # / -",
            |c| c.is_alphanumeric() || c == ' ' || ADDRESS_PUNCTUATION.contains(c),
        ),
        FieldClass::Registration => {
            require_chars(field, raw, "letters, digits and spaces", |c| {
                c.is_alphanumeric() || c == ' '
            })
            .map(|value| value.to_uppercase())
        }
        FieldClass::Digits => require_chars(field, raw, "digits", |c| c.is_ascii_digit()),
        FieldClass::Phone => Ok(format_phone(raw)),
        FieldClass::Odometer => Ok(format_odometer(raw)),
        FieldClass::CompanyName => {
            require_chars(field, raw, "letters and spaces", |c| c.is_alphabetic() || c == ' ')
        }
        FieldClass::FreeText => require_chars(field, raw, "anything except brackets", |c| {
            !FORBIDDEN_FREE_TEXT.contains(c)
        }),
        FieldClass::Date => validate_date(field, raw),
        FieldClass::DocumentType => raw
            .parse::<DocumentType>()
            .map(|kind| kind.display_name().to_string())
            .map_err(|_| ValidationError::InvalidFormat {
                field,
                reason: "not a supported document type",
            }),
    }
}

/// Accepts the whole value when every character passes `allowed`.
///
/// No partial sanitisation: a single bad character rejects the keystroke.
fn require_chars(
    field: FormField,
    raw: &str,
    description: &'static str,
    allowed: impl Fn(char) -> bool,
) -> ValidationResult<String> {
    match raw.chars().find(|c| !allowed(*c)) {
        Some(found) => Err(ValidationError::InvalidCharacter {
            field,
            found,
            allowed: description,
        }),
        None => Ok(raw.to_string()),
    }
}

fn validate_date(field: FormField, raw: &str) -> ValidationResult<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    if raw.len() != 10 || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "expected a calendar date as YYYY-MM-DD",
        });
    }
    Ok(raw.to_string())
}

// =============================================================================
// Formatters
// =============================================================================

/// Normalises a phone number to `+91 XXX XXX XXXX`, progressively.
///
/// ## Steps
/// 1. Drop a leading `+91` and every non-digit
/// 2. If there was no `+91` and more than ten digits start with `91`, drop it
/// 3. Keep the first ten digits
/// 4. Re-render with a space after the prefix and after digits 3 and 6
///
/// Zero digits renders as the empty string so a cleared field stays clear.
///
/// ```rust
/// use motorbill_core::validation::format_phone;
///
/// assert_eq!(format_phone("9876"), "+91 987 6");
/// assert_eq!(format_phone("+91 (987) 654-3210"), "+91 987 654 3210");
/// ```
pub fn format_phone(raw: &str) -> String {
    let trimmed = raw.trim_start();
    let (rest, prefixed) = match trimmed.strip_prefix(PHONE_PREFIX) {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let mut digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    let country_code = &PHONE_PREFIX[1..];
    if !prefixed && digits.len() > PHONE_DIGITS && digits.starts_with(country_code) {
        digits.drain(..country_code.len());
    }
    digits.truncate(PHONE_DIGITS);

    if digits.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(PHONE_PREFIX.len() + PHONE_DIGITS + 3);
    out.push_str(PHONE_PREFIX);
    for (i, digit) in digits.chars().enumerate() {
        if i == 0 || i == 3 || i == 6 {
            out.push(' ');
        }
        out.push(digit);
    }
    out
}

/// Regroups an odometer reading with Indian thousands separators.
///
/// ```rust
/// use motorbill_core::validation::format_odometer;
///
/// assert_eq!(format_odometer("123456"), "1,23,456");
/// assert_eq!(format_odometer("1,23,4567"), "12,34,567");
/// assert_eq!(format_odometer("km"), "");
/// ```
pub fn format_odometer(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return "0".to_string();
    }
    group_indian(significant)
}

// =============================================================================
// Rejection Policy
// =============================================================================

/// Decides what a rejected keystroke means to the caller.
///
/// The rules above never change; only the signal does. The form always
/// keeps its previous value regardless of the policy.
pub trait RejectionPolicy: Send + Sync {
    /// `Ok(())` swallows the rejection, `Err` hands it back to the caller.
    fn on_reject(&self, error: ValidationError) -> ValidationResult<()>;
}

/// Discards rejected keystrokes without telling anyone (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReject;

impl RejectionPolicy for SilentReject {
    fn on_reject(&self, _error: ValidationError) -> ValidationResult<()> {
        Ok(())
    }
}

/// Returns every rejection to the caller so it can be shown inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceErrors;

impl RejectionPolicy for SurfaceErrors {
    fn on_reject(&self, error: ValidationError) -> ValidationResult<()> {
        Err(error)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_name_rule() {
        assert_eq!(validate(FormField::CustomerName, "A. Kumar").unwrap(), "A. Kumar");
        assert_eq!(validate(FormField::Estimator, "").unwrap(), "");
        assert!(validate(FormField::CustomerName, "Kumar1").is_err());
        assert!(validate(FormField::Estimator, "Ross-Mike").is_err());
    }

    #[test]
    fn test_address_rule() {
        let addr = "12/4, Gandhi St. #2 - Peelamedu";
        assert_eq!(validate(FormField::Address, addr).unwrap(), addr);
        assert!(validate(FormField::Address, "12 Main St; Apt 4").is_err());
        assert!(validate(FormField::Address, "no@email").is_err());
    }

    #[test]
    fn test_registration_uppercases() {
        assert_eq!(
            validate(FormField::VehicleRegistration, "tn 38 ab 1234").unwrap(),
            "TN 38 AB 1234"
        );
        assert!(validate(FormField::VehicleRegistration, "TN-38").is_err());
    }

    #[test]
    fn test_digits_rule() {
        assert_eq!(validate(FormField::Year, "2019").unwrap(), "2019");
        assert_eq!(validate(FormField::ReferenceNumber, "").unwrap(), "");
        assert!(validate(FormField::Year, "20l9").is_err());
        assert!(validate(FormField::ReferenceNumber, "RN-1234").is_err());
    }

    #[test]
    fn test_company_name_rule() {
        assert_eq!(validate(FormField::Make, "Maruti Suzuki").unwrap(), "Maruti Suzuki");
        assert!(validate(FormField::Insurer, "ICICI Lombard.").is_err());
        assert!(validate(FormField::Make, "Tata 2").is_err());
    }

    #[test]
    fn test_free_text_rule() {
        assert_eq!(validate(FormField::Model, "Fortuner 4x4 (AT)").unwrap(), "Fortuner 4x4 (AT)");
        for bad in ["<b>", "a{b", "x]"] {
            assert!(validate(FormField::Model, bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_date_rule() {
        assert_eq!(validate(FormField::Date, "2025-03-09").unwrap(), "2025-03-09");
        assert_eq!(validate(FormField::Date, "").unwrap(), "");
        assert!(validate(FormField::Date, "2025-02-30").is_err());
        assert!(validate(FormField::Date, "09-03-2025").is_err());
        assert!(validate(FormField::Date, "2025-3-9").is_err());
    }

    #[test]
    fn test_document_type_rule_normalises() {
        assert_eq!(validate(FormField::DocumentType, "cash bill").unwrap(), "Cash Bill");
        assert!(validate(FormField::DocumentType, "Quotation").is_err());
    }

    #[test]
    fn test_phone_typed_digit_by_digit() {
        let mut value = String::new();
        for digit in "9876543210".chars() {
            let candidate = format!("{value}{digit}");
            value = validate(FormField::Phone, &candidate).unwrap();
        }
        assert_eq!(value, "+91 987 654 3210");
    }

    #[test]
    fn test_phone_progressive_grouping() {
        assert_eq!(format_phone("9"), "+91 9");
        assert_eq!(format_phone("987"), "+91 987");
        assert_eq!(format_phone("9876"), "+91 987 6");
        assert_eq!(format_phone("9876543"), "+91 987 654 3");
        assert_eq!(format_phone(""), "");
        assert_eq!(format_phone("+91"), "");
        assert_eq!(format_phone("+91 "), "");
    }

    #[test]
    fn test_phone_strips_country_code_and_truncates() {
        assert_eq!(format_phone("919876543210"), "+91 987 654 3210");
        assert_eq!(format_phone("+91 987 654 32109"), "+91 987 654 3210");
        assert_eq!(format_phone("9198765432"), "+91 919 876 5432");
    }

    #[test]
    fn test_extra_digit_after_full_number_starting_with_91() {
        let full = format_phone("9198765432");
        assert_eq!(format_phone(&format!("{full}1")), full);
        assert_eq!(format_phone("+91 919 876 54321"), "+91 919 876 5432");
    }

    #[test]
    fn test_odometer_formatting() {
        assert_eq!(format_odometer("123456"), "1,23,456");
        assert_eq!(format_odometer("1000"), "1,000");
        assert_eq!(format_odometer("007"), "7");
        assert_eq!(format_odometer("000"), "0");
        assert_eq!(format_odometer(""), "");
        assert_eq!(format_odometer("45,000 km"), "45,000");
    }

    #[test]
    fn test_formatters_are_idempotent() {
        for raw in ["9", "98765", "+91 987 654 3210", "919876543210", "abc"] {
            let once = format_phone(raw);
            assert_eq!(format_phone(&once), once);
        }
        for raw in ["1", "1234", "123456", "0001", "99999999999999999999999"] {
            let once = format_odometer(raw);
            assert_eq!(format_odometer(&once), once);
        }
    }

    #[test]
    fn test_rejection_policies() {
        let err = validate(FormField::Year, "19x").unwrap_err();
        assert!(SilentReject.on_reject(err.clone()).is_ok());
        assert_eq!(SurfaceErrors.on_reject(err.clone()), Err(err));
    }
}
