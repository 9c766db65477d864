//! # CLI Error Type
//!
//! Every failure the binary can report, folded into one enum so `main`
//! has a single place to log and print.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  quote file ── io / JSON ─────┐                                         │
//! │  field names ── CoreError ────┤                                         │
//! │  strict mode ── ValidationErr ┼──► CliError ──► error! + stderr, exit 1 │
//! │  motorbill.toml ─ ConfigError ┤                                         │
//! │  export ─────── ExportError ──┘    (ExportError prints its user message)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use motorbill_core::CoreError;
use motorbill_export::{ConfigError, ExportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Cannot read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid quote file: {0}")]
    QuoteFormat(#[from] serde_json::Error),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Export(#[from] ExportError),
}

impl CliError {
    /// Line printed on stderr before exiting.
    pub fn user_message(&self) -> String {
        match self {
            CliError::Export(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
