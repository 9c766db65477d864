//! # motorbill-export: Session Controller & Export Pipeline
//!
//! Everything around the pure core that touches time, pixels or files:
//! the quote session, page layout, rasterization, PNG/PDF encoding,
//! asset readiness, configuration and delivery.
//!
//! ## Pipeline Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Export Pipeline                                 │
//! │                                                                         │
//! │  QuoteSession ──► DocumentSnapshot ──► PageLayout ──► Bitmap            │
//! │  (form, lines,     (motorbill-core)    (layout.rs)    (raster.rs)       │
//! │   totals)                                               │               │
//! │                                                         ▼               │
//! │  DocumentSink ◄── PdfDocument ◄── PngImage ◄── data:image/png;base64    │
//! │  (delivery.rs)    (pdf.rs)        (png.rs)     (png.rs, verified)       │
//! │                                                                         │
//! │  Idle → Preparing → Capturing → Encoding → Delivered                    │
//! │             └───────────┴───────────┴──► Failed                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - `QuoteSession`, the viewport guard and the export flow
//! - [`pipeline`] - Export state machine and reentrancy guard
//! - [`assets`] - Named images with an explicit readiness signal
//! - [`layout`] - Snapshot → draw operations
//! - [`font`] - Built-in 5x7 bitmap font
//! - [`raster`] - Draw operations → RGB bitmap, taint tracking
//! - [`png`] - PNG encoder, `data:` URI verification, PNG reader
//! - [`pdf`] - Single-page A4 PDF writer
//! - [`delivery`] - Document sinks and export filenames
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Export and configuration errors

// =============================================================================
// Module Declarations
// =============================================================================

pub mod assets;
pub mod config;
pub mod delivery;
pub mod error;
pub mod font;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod png;
pub mod raster;
pub mod session;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use assets::{AssetOrigin, AssetStore, ImageAsset, Readiness};
pub use config::{ExportSettings, MotorbillConfig, PageSettings};
pub use delivery::{export_filename, DirectorySink, DocumentSink, MemorySink};
pub use error::{ApiError, ConfigError, ConfigResult, ErrorCode, ExportError, ExportResult};
pub use layout::{compose, DrawOp, PageLayout};
pub use pdf::{write_single_page, PdfDocument};
pub use pipeline::{ExportPipeline, ExportReceipt, ExportRun, ExportState};
pub use png::{read_png, to_data_uri, verify_data_uri, ImageEncoder, PngEncoder, PngImage};
pub use raster::{Bitmap, Rasterizer, SoftwareRasterizer};
pub use session::{QuoteSession, SnapshotPosition, Viewport, ViewportGuard, LOGO_ASSET};
