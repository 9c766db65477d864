//! # Export Error Types
//!
//! Everything that can end an export attempt in the `Failed` state.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Export Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Preparing     │  │   Capturing     │  │      Encoding           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  AlreadyRunning │  │  MissingTarget  │  │  MalformedPayload       │ │
//! │  │  AssetsNotReady │  │  TaintedCapture │  │  Pdf                    │ │
//! │  │  AssetFailed    │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │   Delivery      │  │   Internal      │  ← panics / join failures   │
//! │  │  Delivery(io)   │  │  Internal       │    caught at the boundary   │
//! │  └─────────────────┘  └─────────────────┘                              │
//! │                                                                         │
//! │  ConfigError lives beside these and never reaches the pipeline.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::ExportState;

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Export failure.
///
/// ## Design Principles
/// - Each variant carries enough context for the log line
/// - [`ExportError::user_message`] is what a person sees; `Display` is for logs
/// - All errors are `Send + Sync` so they can cross `spawn_blocking`
#[derive(Debug, Error)]
pub enum ExportError {
    // =========================================================================
    // Preparing
    // =========================================================================
    /// Another export is still in flight.
    #[error("Export already running (state: {state})")]
    AlreadyRunning { state: ExportState },

    /// Assets did not report ready before the wait limit.
    #[error("Assets not ready after {waited_ms} ms: {pending:?}")]
    AssetsNotReady { pending: Vec<String>, waited_ms: u64 },

    /// An asset failed to load.
    #[error("Asset '{name}' failed to load: {reason}")]
    AssetFailed { name: String, reason: String },

    // =========================================================================
    // Capturing
    // =========================================================================
    /// The snapshot produced nothing to draw (zero-sized page).
    #[error("Render target is missing or has zero size")]
    MissingRenderTarget,

    /// Cross-origin image data made the bitmap unexportable.
    #[error("Capture tainted by cross-origin asset '{asset}'")]
    TaintedCapture { asset: String },

    // =========================================================================
    // Encoding
    // =========================================================================
    /// The encoded image failed verification.
    #[error("Malformed image payload: {0}")]
    MalformedPayload(String),

    /// The PDF could not be assembled from the image.
    #[error("PDF assembly failed: {0}")]
    Pdf(String),

    // =========================================================================
    // Delivery
    // =========================================================================
    /// Writing the document failed.
    #[error("Delivery failed: {0}")]
    Delivery(#[from] std::io::Error),

    // =========================================================================
    // Internal
    // =========================================================================
    /// Anything unexpected, including panics in the blocking pool.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable error codes for front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyRunning,
    AssetsNotReady,
    AssetFailed,
    MissingRenderTarget,
    TaintedCapture,
    MalformedPayload,
    PdfFailed,
    DeliveryFailed,
    InternalError,
}

impl ExportError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExportError::AlreadyRunning { .. } => ErrorCode::AlreadyRunning,
            ExportError::AssetsNotReady { .. } => ErrorCode::AssetsNotReady,
            ExportError::AssetFailed { .. } => ErrorCode::AssetFailed,
            ExportError::MissingRenderTarget => ErrorCode::MissingRenderTarget,
            ExportError::TaintedCapture { .. } => ErrorCode::TaintedCapture,
            ExportError::MalformedPayload(_) => ErrorCode::MalformedPayload,
            ExportError::Pdf(_) => ErrorCode::PdfFailed,
            ExportError::Delivery(_) => ErrorCode::DeliveryFailed,
            ExportError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Message suitable for showing to the person who clicked "export".
    ///
    /// Internal failures are deliberately generic; the detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            ExportError::AlreadyRunning { .. } => {
                "An export is already in progress. Please wait for it to finish.".to_string()
            }
            ExportError::AssetsNotReady { .. } | ExportError::AssetFailed { .. } => {
                "The document images did not finish loading. Please try again.".to_string()
            }
            ExportError::MissingRenderTarget => {
                "There is nothing to export for this document.".to_string()
            }
            ExportError::TaintedCapture { asset } => format!(
                "The image '{}' comes from another site and cannot be exported.",
                asset
            ),
            ExportError::MalformedPayload(_) | ExportError::Pdf(_) => {
                "The document could not be encoded. No file was saved.".to_string()
            }
            ExportError::Delivery(err) => format!("The file could not be saved: {}", err),
            ExportError::Internal(_) => "Something went wrong while exporting.".to_string(),
        }
    }
}

/// Response body for a failed export, mirroring the front-end contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&ExportError> for ApiError {
    fn from(err: &ExportError) -> Self {
        ApiError {
            code: err.code(),
            message: err.user_message(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure to load or validate `motorbill.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let api = ApiError::from(&ExportError::TaintedCapture {
            asset: "logo".into(),
        });
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "TAINTED_CAPTURE");
        assert!(json["message"].as_str().unwrap().contains("logo"));
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = ExportError::Internal("thread panicked at raster.rs:42".into());
        assert!(!err.user_message().contains("raster.rs"));
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
