//! # Quote Files
//!
//! JSON description of one quotation, replayed into a [`QuoteSession`].
//!
//! ```json
//! {
//!   "documentType": "Cash Bill",
//!   "fields": { "customerName": "Ravi Kumar", "phone": "9876543210" },
//!   "lines": [
//!     { "description": "Brake Pad", "quantity": "2", "spares": "500" }
//!   ]
//! }
//! ```
//!
//! Every value is raw text and goes through the same rules as a keystroke
//! in the form: rejected values are dropped (or fail the command under
//! `--strict`), numeric cells that do not parse count as zero.

use std::collections::BTreeMap;
use std::path::Path;

use motorbill_core::{DocumentType, FormField, LineField, LineId};
use motorbill_export::QuoteSession;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteFile {
    pub document_type: Option<String>,
    /// Raw field values keyed by field name (`customerName`, `vehicleNo`, ...).
    pub fields: BTreeMap<String, String>,
    pub lines: Vec<QuoteLine>,
}

/// One service line; every cell is raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteLine {
    pub description: String,
    pub quantity: String,
    pub spares: String,
    pub rr: String,
    pub dr: String,
    pub cw: String,
    pub painting: String,
}

impl QuoteLine {
    fn cells(&self) -> [(LineField, &str); 7] {
        [
            (LineField::Description, self.description.as_str()),
            (LineField::Quantity, self.quantity.as_str()),
            (LineField::Spares, self.spares.as_str()),
            (LineField::RemovalRefit, self.rr.as_str()),
            (LineField::DismantleReassemble, self.dr.as_str()),
            (LineField::CleanWash, self.cw.as_str()),
            (LineField::Painting, self.painting.as_str()),
        ]
    }
}

impl QuoteFile {
    pub fn read(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// A blank quote listing every field and one empty line.
    pub fn template() -> Self {
        let fields = FormField::ALL
            .iter()
            .filter(|f| **f != FormField::DocumentType)
            .map(|f| (f.key().to_string(), String::new()))
            .collect();
        QuoteFile {
            document_type: Some(DocumentType::default().display_name().to_string()),
            fields,
            lines: vec![QuoteLine {
                quantity: "1".to_string(),
                ..QuoteLine::default()
            }],
        }
    }

    /// Replays the quote into `session` field by field.
    ///
    /// The session's line table is resized to the quote's line count (never
    /// below one row). Totals are not recomputed here.
    pub fn apply(&self, session: &mut QuoteSession) -> CliResult<()> {
        if let Some(kind) = &self.document_type {
            session.edit_field_named(FormField::DocumentType.key(), kind)?;
        }
        for (name, raw) in &self.fields {
            session.edit_field_named(name, raw)?;
        }

        let ids = fit_rows(session, self.lines.len());
        for (id, line) in ids.into_iter().zip(&self.lines) {
            for (field, raw) in line.cells() {
                if !raw.is_empty() {
                    session.update_line(id, field, raw);
                }
            }
        }
        debug!(fields = self.fields.len(), lines = self.lines.len(), "Quote applied");
        Ok(())
    }
}

/// Adds or removes rows until the session has `wanted` (at least one).
fn fit_rows(session: &mut QuoteSession, wanted: usize) -> Vec<LineId> {
    let wanted = wanted.max(1);
    while session.lines().len() < wanted {
        session.add_line();
    }
    let surplus: Vec<LineId> = session.lines().ids().into_iter().skip(wanted).collect();
    for id in surplus {
        session.remove_line(id);
    }
    session.lines().ids()
}
