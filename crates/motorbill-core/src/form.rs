//! # Form Module
//!
//! The editable document header.
//!
//! ## Mutation Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  keystroke ──► FormRecord::set(field, candidate, policy)                │
//! │                    │                                                    │
//! │                    ├── validate() Ok(v)  ──► store v ──► Accepted(v)    │
//! │                    │                                                    │
//! │                    └── validate() Err(e) ──► policy.on_reject(e)        │
//! │                                               ├── Ok  ──► Rejected(e)   │
//! │                                               └── Err ──► Err(e)        │
//! │                                                                         │
//! │  Either way a rejected candidate never reaches the record.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{DocumentType, FormField};
use crate::validation::{validate, RejectionPolicy};

/// What happened to a keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Stored, possibly reformatted.
    Accepted(String),
    /// Discarded by a silent policy; the record kept its previous value.
    Rejected(ValidationError),
}

impl FieldOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FieldOutcome::Accepted(_))
    }
}

/// Document header: who, which vehicle, which document.
///
/// Every field is free text on the wire; the rules in
/// [`crate::validation`] are the only gate into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub document_type: DocumentType,
    pub customer_name: String,
    pub address: String,
    pub phone: String,
    pub reference_number: String,
    /// ISO `YYYY-MM-DD`, or empty.
    pub date: String,
    pub vehicle_registration: String,
    pub make: String,
    pub model: String,
    pub year: String,
    pub odometer: String,
    pub insurer: String,
    pub estimator: String,
}

impl FormRecord {
    /// A fresh header for `date` with a random 4-digit reference.
    ///
    /// The caller supplies the date; this crate never reads the clock.
    pub fn dated(date: NaiveDate) -> Self {
        let seed = Uuid::new_v4().as_u128();
        FormRecord {
            document_type: DocumentType::default(),
            customer_name: String::new(),
            address: String::new(),
            phone: String::new(),
            reference_number: (1000 + seed % 9000).to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            vehicle_registration: String::new(),
            make: String::new(),
            model: String::new(),
            year: String::new(),
            odometer: String::new(),
            insurer: String::new(),
            estimator: String::new(),
        }
    }

    /// Current value of a field as text.
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::DocumentType => self.document_type.display_name(),
            FormField::CustomerName => &self.customer_name,
            FormField::Address => &self.address,
            FormField::Phone => &self.phone,
            FormField::ReferenceNumber => &self.reference_number,
            FormField::Date => &self.date,
            FormField::VehicleRegistration => &self.vehicle_registration,
            FormField::Make => &self.make,
            FormField::Model => &self.model,
            FormField::Year => &self.year,
            FormField::Odometer => &self.odometer,
            FormField::Insurer => &self.insurer,
            FormField::Estimator => &self.estimator,
        }
    }

    /// Applies one candidate value through the field's rule.
    ///
    /// ## Returns
    /// - `Ok(Accepted(v))` - `v` is now the stored value
    /// - `Ok(Rejected(e))` - discarded, the policy chose silence
    /// - `Err(e)` - discarded, the policy surfaces rejections
    pub fn set(
        &mut self,
        field: FormField,
        raw: &str,
        policy: &dyn RejectionPolicy,
    ) -> Result<FieldOutcome, ValidationError> {
        match validate(field, raw) {
            Ok(value) => {
                self.store(field, value.clone());
                Ok(FieldOutcome::Accepted(value))
            }
            Err(error) => {
                policy.on_reject(error.clone())?;
                Ok(FieldOutcome::Rejected(error))
            }
        }
    }

    /// Writes an already-validated value.
    fn store(&mut self, field: FormField, value: String) {
        let slot = match field {
            FormField::DocumentType => {
                // validate() only lets display names through
                if let Ok(kind) = value.parse() {
                    self.document_type = kind;
                }
                return;
            }
            FormField::CustomerName => &mut self.customer_name,
            FormField::Address => &mut self.address,
            FormField::Phone => &mut self.phone,
            FormField::ReferenceNumber => &mut self.reference_number,
            FormField::Date => &mut self.date,
            FormField::VehicleRegistration => &mut self.vehicle_registration,
            FormField::Make => &mut self.make,
            FormField::Model => &mut self.model,
            FormField::Year => &mut self.year,
            FormField::Odometer => &mut self.odometer,
            FormField::Insurer => &mut self.insurer,
            FormField::Estimator => &mut self.estimator,
        };
        *slot = value;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{SilentReject, SurfaceErrors};

    fn fixed_form() -> FormRecord {
        FormRecord::dated(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap())
    }

    #[test]
    fn test_new_form_defaults() {
        let form = fixed_form();
        assert_eq!(form.date, "2025-03-09");
        assert_eq!(form.document_type, DocumentType::CustomerEstimation);
        assert_eq!(form.customer_name, "");

        let reference: u32 = form.reference_number.parse().unwrap();
        assert!((1000..=9999).contains(&reference));
    }

    #[test]
    fn test_accepted_value_is_stored_reformatted() {
        let mut form = fixed_form();
        let outcome = form
            .set(FormField::VehicleRegistration, "tn38 ab 1", &SilentReject)
            .unwrap();
        assert_eq!(outcome, FieldOutcome::Accepted("TN38 AB 1".to_string()));
        assert_eq!(form.get(FormField::VehicleRegistration), "TN38 AB 1");
    }

    #[test]
    fn test_silent_rejection_keeps_previous_value() {
        let mut form = fixed_form();
        form.set(FormField::CustomerName, "Ravi", &SilentReject).unwrap();
        let outcome = form.set(FormField::CustomerName, "Ravi4", &SilentReject).unwrap();

        assert!(!outcome.is_accepted());
        assert_eq!(form.customer_name, "Ravi");
    }

    #[test]
    fn test_surfaced_rejection_returns_error() {
        let mut form = fixed_form();
        form.set(FormField::Year, "2019", &SurfaceErrors).unwrap();
        let err = form.set(FormField::Year, "2019a", &SurfaceErrors).unwrap_err();

        assert_eq!(err.field(), FormField::Year);
        assert_eq!(form.year, "2019");
    }

    #[test]
    fn test_document_type_field() {
        let mut form = fixed_form();
        form.set(FormField::DocumentType, "invoice", &SilentReject).unwrap();
        assert_eq!(form.document_type, DocumentType::Invoice);
        assert_eq!(form.get(FormField::DocumentType), "Invoice");
    }

    #[test]
    fn test_every_field_round_trips_through_get() {
        let mut form = fixed_form();
        for field in FormField::ALL {
            let current = form.get(field).to_string();
            let outcome = form.set(field, &current, &SurfaceErrors).unwrap();
            assert_eq!(outcome, FieldOutcome::Accepted(current));
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(fixed_form()).unwrap();
        assert_eq!(json["documentType"], "customer_estimation");
        assert_eq!(json["vehicleRegistration"], "");
    }
}
