//! # Snapshot Module
//!
//! Read-only, print-formatted projection of a quotation.
//!
//! ## Printed Document Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HEADER      workshop name / tagline / address      proprietor         │
//! │              DOCUMENT TITLE                   RN-4821   09-03-2025     │
//! ├────────────────────────────────────┬────────────────────────────────────┤
//! │  CLIENT      name, phone, address  │  VEHICLE  reg, make, model, year,  │
//! │                                    │           odometer, insurance      │
//! ├────────────────────────────────────┴────────────────────────────────────┤
//! │  TABLE       # | description | qty | spares | r/r | d/r | c/w | paint │
//! │              (rows with a blank description are left out)              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  TOTALS      spares subtotal / labour subtotal / GRAND TOTAL           │
//! │  TERMS       fixed legal text                                          │
//! │  SIGNATURES  Customer Signature            Authorised Signatory        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A snapshot owns copies of everything it prints, so the live form can
//! keep changing while an export renders an older projection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::form::FormRecord;
use crate::lines::{LineStore, ServiceLine};
use crate::money::Money;
use crate::totals::Totals;
use crate::types::{DocumentType, FormField, WorkshopProfile};

/// Terms printed under the totals on every document.
pub const TERMS: [&str; 4] = [
    "All estimates are subject to technical verification upon inspection.",
    "Additional damage found after dismantling will be quoted separately.",
    "Prices of spares are subject to change at the time of billing.",
    "Vehicles are stored and driven at the owner's risk.",
];

pub const CUSTOMER_SIGNATURE: &str = "Customer Signature";
pub const AUTHORISED_SIGNATORY: &str = "Authorised Signatory";

/// Fields printed in the client column.
const CLIENT_FIELDS: [FormField; 3] = [FormField::CustomerName, FormField::Phone, FormField::Address];

/// Fields printed in the vehicle column.
const VEHICLE_FIELDS: [FormField; 6] = [
    FormField::VehicleRegistration,
    FormField::Make,
    FormField::Model,
    FormField::Year,
    FormField::Odometer,
    FormField::Insurer,
];

/// One printed label/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SnapshotField {
    pub label: String,
    pub value: String,
}

/// One printed row of the line-item table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    /// 1-based position among printed rows.
    pub index: usize,
    pub description: String,
    pub quantity: u32,
    pub spares: Money,
    pub rr: Money,
    pub dr: Money,
    pub cw: Money,
    pub painting: Money,
    pub line_total: Money,
}

impl SnapshotRow {
    fn from_line(index: usize, line: &ServiceLine) -> Self {
        SnapshotRow {
            index,
            description: line.description.trim().to_string(),
            quantity: line.quantity,
            spares: line.spares,
            rr: line.rr,
            dr: line.dr,
            cw: line.cw,
            painting: line.painting,
            line_total: line.subtotal(),
        }
    }
}

/// Everything the export pipeline needs to draw one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub profile: WorkshopProfile,
    pub document_type: DocumentType,
    /// `RN-<number>`, or empty when the form has no reference.
    pub reference: String,
    /// `DD-MM-YYYY` when the form date parses, otherwise as typed.
    pub printed_date: String,
    /// ISO date used for the output filename; empty if the form has none.
    pub iso_date: String,
    pub vehicle_registration: String,
    pub estimator: String,
    pub client: Vec<SnapshotField>,
    pub vehicle: Vec<SnapshotField>,
    pub rows: Vec<SnapshotRow>,
    pub totals: Totals,
    pub terms: Vec<String>,
    pub signatures: [String; 2],
}

impl DocumentSnapshot {
    /// Projects the current session state. Reads only; never mutates.
    ///
    /// `totals` is taken as given: callers recompute before projecting.
    pub fn project(
        form: &FormRecord,
        lines: &LineStore,
        totals: &Totals,
        profile: &WorkshopProfile,
    ) -> Self {
        let rows = lines
            .lines()
            .iter()
            .filter(|line| line.has_description())
            .enumerate()
            .map(|(i, line)| SnapshotRow::from_line(i + 1, line))
            .collect();

        let reference = if form.reference_number.is_empty() {
            String::new()
        } else {
            format!("RN-{}", form.reference_number)
        };

        DocumentSnapshot {
            profile: profile.clone(),
            document_type: form.document_type,
            reference,
            printed_date: print_date(&form.date),
            iso_date: form.date.clone(),
            vehicle_registration: form.vehicle_registration.clone(),
            estimator: form.estimator.clone(),
            client: collect_fields(form, &CLIENT_FIELDS),
            vehicle: collect_fields(form, &VEHICLE_FIELDS),
            rows,
            totals: *totals,
            terms: TERMS.iter().map(|t| t.to_string()).collect(),
            signatures: [CUSTOMER_SIGNATURE.to_string(), AUTHORISED_SIGNATORY.to_string()],
        }
    }

    /// Document title as printed in the header.
    pub fn title(&self) -> String {
        self.document_type.display_name().to_uppercase()
    }
}

fn collect_fields(form: &FormRecord, fields: &[FormField]) -> Vec<SnapshotField> {
    fields
        .iter()
        .map(|field| SnapshotField {
            label: field.label().to_string(),
            value: form.get(*field).to_string(),
        })
        .collect()
}

/// `2025-03-09` → `09-03-2025`; anything unparseable prints as typed.
pub fn print_date(iso: &str) -> String {
    match NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        Ok(date) => date.format("%d-%m-%Y").to_string(),
        Err(_) => iso.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totals::compute_totals;
    use crate::types::LineField;
    use crate::validation::SilentReject;

    fn scenario() -> (FormRecord, LineStore) {
        let mut form = FormRecord::dated(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        form.set(FormField::VehicleRegistration, "tn 38 ab 1234", &SilentReject)
            .unwrap();
        form.set(FormField::CustomerName, "Ravi Kumar", &SilentReject).unwrap();

        let mut lines = LineStore::with_blank_rows(3);
        let ids = lines.ids();
        lines.update_line(ids[0], LineField::Description, "Brake Pad");
        lines.update_line(ids[0], LineField::Quantity, "2");
        lines.update_line(ids[0], LineField::Spares, "500");
        lines.update_line(ids[1], LineField::Description, "Paint Job");
        lines.update_line(ids[1], LineField::Painting, "3000");
        (form, lines)
    }

    #[test]
    fn test_blank_rows_are_not_printed() {
        let (form, lines) = scenario();
        let totals = compute_totals(lines.lines());
        let snap = DocumentSnapshot::project(&form, &lines, &totals, &WorkshopProfile::default());

        assert_eq!(lines.len(), 3);
        assert_eq!(snap.rows.len(), 2);
        assert_eq!(snap.rows[0].index, 1);
        assert_eq!(snap.rows[1].description, "Paint Job");
        assert_eq!(snap.rows[1].line_total, Money::from_rupees(3000));
        assert_eq!(snap.totals.grand, Money::from_rupees(4000));
    }

    #[test]
    fn test_whitespace_description_counts_as_blank() {
        let (form, mut lines) = scenario();
        let third = lines.ids()[2];
        lines.update_line(third, LineField::Description, "   ");
        let snap = DocumentSnapshot::project(&form, &lines, &Totals::default(), &WorkshopProfile::default());
        assert_eq!(snap.rows.len(), 2);
    }

    #[test]
    fn test_header_formatting() {
        let (form, lines) = scenario();
        let snap = DocumentSnapshot::project(&form, &lines, &Totals::default(), &WorkshopProfile::default());

        assert_eq!(snap.printed_date, "09-03-2025");
        assert_eq!(snap.iso_date, "2025-03-09");
        assert_eq!(snap.reference, format!("RN-{}", form.reference_number));
        assert_eq!(snap.title(), "CUSTOMER ESTIMATION");
        assert_eq!(snap.vehicle[0].value, "TN 38 AB 1234");
        assert_eq!(snap.client[0].value, "Ravi Kumar");
        assert_eq!(snap.signatures[1], AUTHORISED_SIGNATORY);
    }

    #[test]
    fn test_projection_does_not_touch_sources() {
        let (form, lines) = scenario();
        let (form_before, lines_before) = (form.clone(), lines.clone());
        let totals = compute_totals(lines.lines());
        let _ = DocumentSnapshot::project(&form, &lines, &totals, &WorkshopProfile::default());
        assert_eq!(form, form_before);
        assert_eq!(lines, lines_before);
    }

    #[test]
    fn test_print_date_passthrough() {
        assert_eq!(print_date(""), "");
        assert_eq!(print_date("soon"), "soon");
    }
}
