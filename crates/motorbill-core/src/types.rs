//! # Domain Types
//!
//! Identifiers and small value types shared by every layer.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │   FormField      │  │   LineField      │  │  DocumentType    │      │
//! │  │  ─────────────   │  │  ─────────────   │  │  ─────────────   │      │
//! │  │  13 header       │  │  description     │  │  5 fixed kinds   │      │
//! │  │  fields, each    │  │  quantity        │  │  (estimation,    │      │
//! │  │  with a class    │  │  spares + 4      │  │   bill, invoice) │      │
//! │  │  (FieldClass)    │  │  labour cells    │  │                  │      │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘      │
//! │                                                                         │
//! │  ┌──────────────────┐                                                   │
//! │  │ WorkshopProfile  │  Letterhead printed on every document             │
//! │  └──────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Form Field
// =============================================================================

/// One editable field of the document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    DocumentType,
    CustomerName,
    Address,
    Phone,
    ReferenceNumber,
    Date,
    VehicleRegistration,
    Make,
    Model,
    Year,
    Odometer,
    Insurer,
    Estimator,
}

impl FormField {
    /// Every field, in the order the form presents them.
    pub const ALL: [FormField; 13] = [
        FormField::DocumentType,
        FormField::Date,
        FormField::ReferenceNumber,
        FormField::Estimator,
        FormField::CustomerName,
        FormField::Phone,
        FormField::Address,
        FormField::VehicleRegistration,
        FormField::Odometer,
        FormField::Year,
        FormField::Make,
        FormField::Model,
        FormField::Insurer,
    ];

    /// The rule family this field is validated with.
    pub const fn class(&self) -> FieldClass {
        match self {
            FormField::CustomerName | FormField::Estimator => FieldClass::PersonName,
            FormField::Address => FieldClass::Address,
            FormField::VehicleRegistration => FieldClass::Registration,
            FormField::ReferenceNumber | FormField::Year => FieldClass::Digits,
            FormField::Phone => FieldClass::Phone,
            FormField::Odometer => FieldClass::Odometer,
            FormField::Make | FormField::Insurer => FieldClass::CompanyName,
            FormField::Model => FieldClass::FreeText,
            FormField::Date => FieldClass::Date,
            FormField::DocumentType => FieldClass::DocumentType,
        }
    }

    /// camelCase wire name, as used in quote files and JSON payloads.
    pub const fn key(&self) -> &'static str {
        match self {
            FormField::DocumentType => "documentType",
            FormField::CustomerName => "customerName",
            FormField::Address => "address",
            FormField::Phone => "phone",
            FormField::ReferenceNumber => "referenceNumber",
            FormField::Date => "date",
            FormField::VehicleRegistration => "vehicleRegistration",
            FormField::Make => "make",
            FormField::Model => "model",
            FormField::Year => "year",
            FormField::Odometer => "odometer",
            FormField::Insurer => "insurer",
            FormField::Estimator => "estimator",
        }
    }

    /// Label printed next to the value on the document.
    pub const fn label(&self) -> &'static str {
        match self {
            FormField::DocumentType => "Document",
            FormField::CustomerName => "Name",
            FormField::Address => "Address",
            FormField::Phone => "Phone",
            FormField::ReferenceNumber => "Ref No",
            FormField::Date => "Date",
            FormField::VehicleRegistration => "Reg No",
            FormField::Make => "Make",
            FormField::Model => "Model",
            FormField::Year => "Year",
            FormField::Odometer => "Odometer (km)",
            FormField::Insurer => "Insurance",
            FormField::Estimator => "Estimated By",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::DocumentType => "document type",
            FormField::CustomerName => "customer name",
            FormField::Address => "address",
            FormField::Phone => "phone",
            FormField::ReferenceNumber => "reference number",
            FormField::Date => "date",
            FormField::VehicleRegistration => "vehicle registration",
            FormField::Make => "make",
            FormField::Model => "model",
            FormField::Year => "year",
            FormField::Odometer => "odometer",
            FormField::Insurer => "insurer",
            FormField::Estimator => "estimator",
        };
        f.write_str(name)
    }
}

impl FromStr for FormField {
    type Err = CoreError;

    /// Accepts the camelCase wire names plus the short names a web form
    /// historically posted (`name`, `vehicleNo`, `quotationNo`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "documenttype" | "doctype" => Ok(FormField::DocumentType),
            "customername" | "name" => Ok(FormField::CustomerName),
            "address" => Ok(FormField::Address),
            "phone" => Ok(FormField::Phone),
            "referencenumber" | "reference" | "quotationno" => Ok(FormField::ReferenceNumber),
            "date" => Ok(FormField::Date),
            "vehicleregistration" | "vehicleno" | "registration" => {
                Ok(FormField::VehicleRegistration)
            }
            "make" => Ok(FormField::Make),
            "model" => Ok(FormField::Model),
            "year" => Ok(FormField::Year),
            "odometer" => Ok(FormField::Odometer),
            "insurer" | "insuranceco" => Ok(FormField::Insurer),
            "estimator" | "estimatedby" => Ok(FormField::Estimator),
            _ => Err(CoreError::UnknownField(s.to_string())),
        }
    }
}

/// Rule family a [`FormField`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Letters, spaces, periods.
    PersonName,
    /// Letters, digits, spaces and `. , # / -`.
    Address,
    /// Letters, digits, spaces; upper-cased on acceptance.
    Registration,
    /// Digits only (or empty).
    Digits,
    /// Normalised `+91 XXX XXX XXXX`.
    Phone,
    /// Digits regrouped with Indian thousands separators.
    Odometer,
    /// Letters and spaces.
    CompanyName,
    /// Anything except brackets.
    FreeText,
    /// Empty or ISO `YYYY-MM-DD`.
    Date,
    /// One of the five document types.
    DocumentType,
}

// =============================================================================
// Line Field
// =============================================================================

/// One editable cell of a service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum LineField {
    Description,
    Quantity,
    Spares,
    /// Removal / refit labour.
    RemovalRefit,
    /// Dismantle / reassemble labour.
    DismantleReassemble,
    /// Clean / wash labour.
    CleanWash,
    Painting,
}

impl FromStr for LineField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "description" | "desc" => Ok(LineField::Description),
            "quantity" | "qty" => Ok(LineField::Quantity),
            "spares" => Ok(LineField::Spares),
            "rr" | "removalrefit" | "removal_refit" => Ok(LineField::RemovalRefit),
            "dr" | "dismantlereassemble" | "dismantle_reassemble" => {
                Ok(LineField::DismantleReassemble)
            }
            "cw" | "cleanwash" | "clean_wash" => Ok(LineField::CleanWash),
            "painting" | "paint" => Ok(LineField::Painting),
            _ => Err(CoreError::UnknownLineField(s.to_string())),
        }
    }
}

// =============================================================================
// Document Type
// =============================================================================

/// The kind of document being prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    CustomerSupplementaryEstimation,
    #[default]
    CustomerEstimation,
    CashBill,
    Invoice,
    InvoicePerforma,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::CustomerSupplementaryEstimation,
        DocumentType::CustomerEstimation,
        DocumentType::CashBill,
        DocumentType::Invoice,
        DocumentType::InvoicePerforma,
    ];

    /// Name shown in the type selector and printed as the document title.
    pub const fn display_name(&self) -> &'static str {
        match self {
            DocumentType::CustomerSupplementaryEstimation => "Customer Supplementary Estimation",
            DocumentType::CustomerEstimation => "Customer Estimation",
            DocumentType::CashBill => "Cash Bill",
            DocumentType::Invoice => "Invoice",
            DocumentType::InvoicePerforma => "Invoice Performa",
        }
    }

    /// Filename-safe form of the display name (`Cash_Bill`).
    pub fn file_stem(&self) -> String {
        self.display_name().replace(' ', "_")
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DocumentType {
    type Err = CoreError;

    /// Accepts the display name (any case) or the snake_case identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', " ");
        DocumentType::ALL
            .into_iter()
            .find(|t| t.display_name().to_lowercase() == wanted)
            .ok_or_else(|| CoreError::UnknownDocumentType(s.to_string()))
    }
}

// =============================================================================
// Workshop Profile
// =============================================================================

/// Letterhead details printed at the top of every document.
///
/// Missing keys in a config file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkshopProfile {
    /// Trading name (large header text).
    pub name: String,

    /// One-line description under the name.
    pub tagline: String,

    /// Proprietor / service head shown on the right of the header.
    pub proprietor: String,

    /// Street address lines.
    pub address: Vec<String>,

    /// Contact line (phone, email).
    pub contact: String,
}

impl Default for WorkshopProfile {
    fn default() -> Self {
        WorkshopProfile {
            name: "Motor Works".to_string(),
            tagline: "Multi-brand car service and body shop".to_string(),
            proprietor: "Proprietor & Service Head".to_string(),
            address: vec!["Coimbatore, Tamil Nadu".to_string()],
            contact: String::new(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field_parsing_accepts_wire_names() {
        assert_eq!("customerName".parse::<FormField>().unwrap(), FormField::CustomerName);
        assert_eq!("vehicleNo".parse::<FormField>().unwrap(), FormField::VehicleRegistration);
        assert_eq!("insurance_co".parse::<FormField>().unwrap(), FormField::Insurer);
        assert_eq!("quotationNo".parse::<FormField>().unwrap(), FormField::ReferenceNumber);
        assert!("colour".parse::<FormField>().is_err());
    }

    #[test]
    fn test_keys_parse_back_and_match_serde() {
        for field in FormField::ALL {
            assert_eq!(field.key().parse::<FormField>().unwrap(), field);
            assert_eq!(serde_json::to_value(field).unwrap(), field.key());
        }
    }

    #[test]
    fn test_every_field_has_a_class() {
        assert_eq!(FormField::ALL.len(), 13);
        assert_eq!(FormField::Estimator.class(), FieldClass::PersonName);
        assert_eq!(FormField::Insurer.class(), FieldClass::CompanyName);
        assert_eq!(FormField::Year.class(), FieldClass::Digits);
    }

    #[test]
    fn test_line_field_parsing() {
        assert_eq!("qty".parse::<LineField>().unwrap(), LineField::Quantity);
        assert_eq!("RR".parse::<LineField>().unwrap(), LineField::RemovalRefit);
        assert_eq!("paint".parse::<LineField>().unwrap(), LineField::Painting);
        assert!("tax".parse::<LineField>().is_err());
    }

    #[test]
    fn test_document_type_round_trip() {
        for kind in DocumentType::ALL {
            assert_eq!(kind.display_name().parse::<DocumentType>().unwrap(), kind);
        }
        assert_eq!(
            "cash_bill".parse::<DocumentType>().unwrap(),
            DocumentType::CashBill
        );
        assert!("Quotation".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_type_file_stem() {
        assert_eq!(DocumentType::CashBill.file_stem(), "Cash_Bill");
        assert_eq!(DocumentType::default(), DocumentType::CustomerEstimation);
    }
}
