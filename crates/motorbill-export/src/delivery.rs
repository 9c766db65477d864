//! # Delivery
//!
//! Hands a finished document to its destination.
//!
//! ## Sinks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DocumentSink (trait)                                                   │
//! │  ├── DirectorySink   write <dir>/.<name>.part, then rename to <name>    │
//! │  │                   (a failed write never leaves a partial PDF)        │
//! │  └── MemorySink      keeps documents in memory (tests, embedding)       │
//! │                                                                         │
//! │  Filename: <DocumentType>_<Registration|NOREG>_<YYYY-MM-DD>.pdf         │
//! │            Customer_Estimation_TN38AB1234_2025-03-09.pdf                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;
use motorbill_core::DocumentSnapshot;
use tracing::{info, warn};

use crate::error::ExportResult;

/// Destination for exported documents.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Stores `bytes` under `filename` and returns where it went.
    async fn deliver(&self, filename: &str, bytes: Vec<u8>) -> ExportResult<String>;
}

// =============================================================================
// Directory Sink
// =============================================================================

/// Writes documents into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySink { dir: dir.into() }
    }
}

#[async_trait]
impl DocumentSink for DirectorySink {
    async fn deliver(&self, filename: &str, bytes: Vec<u8>) -> ExportResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.dir.join(filename);
        let partial = self.dir.join(format!(".{}.part", filename));
        let replacing = tokio::fs::try_exists(&target).await.unwrap_or(false);

        if let Err(e) = tokio::fs::write(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        tokio::fs::rename(&partial, &target).await?;

        if replacing {
            warn!(path = %target.display(), "Replaced an existing document with the same name");
        }
        info!(path = %target.display(), bytes = bytes.len(), "Document written");
        Ok(target.display().to_string())
    }
}

// =============================================================================
// Memory Sink
// =============================================================================

/// Keeps delivered documents in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    documents: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub fn documents(&self) -> Vec<(String, Vec<u8>)> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn deliver(&self, filename: &str, bytes: Vec<u8>) -> ExportResult<String> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((filename.to_string(), bytes));
        Ok(format!("memory:{}", filename))
    }
}

// =============================================================================
// Filename
// =============================================================================

/// Builds `<DocumentType>_<Registration>_<ISODate>.pdf`.
///
/// Spaces in the registration are dropped; an empty registration uses
/// `placeholder`; an empty or unparseable date falls back to `today`.
pub fn export_filename(snapshot: &DocumentSnapshot, placeholder: &str, today: NaiveDate) -> String {
    let registration: String = snapshot
        .vehicle_registration
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    let registration = if registration.is_empty() {
        placeholder.to_string()
    } else {
        registration
    };

    let date = NaiveDate::parse_from_str(&snapshot.iso_date, "%Y-%m-%d").unwrap_or(today);

    format!(
        "{}_{}_{}.pdf",
        snapshot.document_type.file_stem(),
        registration,
        date.format("%Y-%m-%d")
    )
}
