//! # Quote Session
//!
//! One open quotation: the form, its service lines, the last computed
//! totals, the on-screen viewport, the asset store and the export handle.
//!
//! ## Export Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  export(sink)                                                           │
//! │    │                                                                    │
//! │    ├── pipeline.begin()                    AlreadyRunning → return      │
//! │    │                                                                    │
//! │    ├── Preparing   recalculate, snapshot, ViewportGuard (scroll 0,      │
//! │    │               snapshot inline at page width), assets.wait_ready    │
//! │    │                                                                    │
//! │    ├── Capturing   spawn_blocking { compose + rasterize }, taint check  │
//! │    │                                                                    │
//! │    ├── Encoding    spawn_blocking { PNG → data URI → verify → PDF }     │
//! │    │                                                                    │
//! │    └── Delivered   sink.deliver(<Type>_<Reg>_<Date>.pdf) → receipt      │
//! │                                                                         │
//! │  Any error: run.fail(err) → Failed. The viewport guard restores the    │
//! │  previous scroll/visibility on every exit path.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use motorbill_core::{
    compute_totals, CoreResult, DocumentSnapshot, FieldOutcome, FormField, FormRecord, LineField,
    LineId, LineStore, RejectionPolicy, SilentReject, Totals, ValidationError, WorkshopProfile,
};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use crate::assets::{AssetOrigin, AssetStore, ImageAsset};
use crate::config::{ExportSettings, MotorbillConfig, PageSettings};
use crate::delivery::{export_filename, DocumentSink};
use crate::error::{ExportError, ExportResult};
use crate::layout::compose;
use crate::pdf::{write_single_page, PdfDocument};
use crate::pipeline::{ExportPipeline, ExportReceipt, ExportRun, ExportState};
use crate::png::{read_png, to_data_uri, verify_data_uri, ImageEncoder, PngEncoder};
use crate::raster::{Bitmap, Rasterizer, SoftwareRasterizer};

/// Asset name the header logo is registered under.
pub const LOGO_ASSET: &str = "logo";

// =============================================================================
// Viewport
// =============================================================================

/// Where the print snapshot sits relative to the editing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPosition {
    /// Rendered but kept out of view.
    Offscreen,
    /// In the document flow at the top of the page.
    Inline,
}

/// The parts of the screen an export temporarily takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub scroll_offset: u32,
    pub snapshot_visible: bool,
    /// Fixed layout width while capturing; `None` means responsive.
    pub snapshot_width_px: Option<u32>,
    pub position: SnapshotPosition,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            scroll_offset: 0,
            snapshot_visible: false,
            snapshot_width_px: None,
            position: SnapshotPosition::Offscreen,
        }
    }
}

/// Puts the viewport in capture mode and restores it when dropped.
#[derive(Debug)]
pub struct ViewportGuard<'a> {
    viewport: &'a mut Viewport,
    saved: Viewport,
}

impl<'a> ViewportGuard<'a> {
    pub fn capture(viewport: &'a mut Viewport, width_px: u32) -> Self {
        let saved = *viewport;
        *viewport = Viewport {
            scroll_offset: 0,
            snapshot_visible: true,
            snapshot_width_px: Some(width_px),
            position: SnapshotPosition::Inline,
        };
        debug!(scroll = saved.scroll_offset, width_px, "Viewport prepared for capture");
        ViewportGuard { viewport, saved }
    }
}

impl Deref for ViewportGuard<'_> {
    type Target = Viewport;

    fn deref(&self) -> &Viewport {
        self.viewport
    }
}

impl Drop for ViewportGuard<'_> {
    fn drop(&mut self) {
        *self.viewport = self.saved;
        debug!(scroll = self.saved.scroll_offset, "Viewport restored");
    }
}

// =============================================================================
// Session
// =============================================================================

/// Controller for one quotation.
pub struct QuoteSession {
    form: FormRecord,
    lines: LineStore,
    totals: Totals,
    profile: WorkshopProfile,
    policy: Box<dyn RejectionPolicy>,
    viewport: Viewport,
    assets: AssetStore,
    pipeline: Arc<ExportPipeline>,
    page: PageSettings,
    export: ExportSettings,
    rasterizer: Arc<dyn Rasterizer>,
    encoder: Arc<dyn ImageEncoder>,
}

impl QuoteSession {
    /// Fresh session: today's date, default blank rows, silent rejection.
    pub fn new(config: &MotorbillConfig) -> Self {
        let lines = LineStore::default();
        let totals = compute_totals(lines.lines());
        QuoteSession {
            form: FormRecord::dated(Local::now().date_naive()),
            lines,
            totals,
            profile: config.workshop.clone(),
            policy: Box::new(SilentReject),
            viewport: Viewport::default(),
            assets: AssetStore::new(),
            pipeline: Arc::new(ExportPipeline::new()),
            page: config.page.clone(),
            export: config.export.clone(),
            rasterizer: Arc::new(SoftwareRasterizer),
            encoder: Arc::new(PngEncoder::default()),
        }
    }

    pub fn with_policy(mut self, policy: impl RejectionPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Shares an export pipeline with other sessions of the same window.
    pub fn with_pipeline(mut self, pipeline: Arc<ExportPipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_form(mut self, form: FormRecord) -> Self {
        self.form = form;
        self
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// One keystroke (or paste) into a header field.
    pub fn edit_field(&mut self, field: FormField, raw: &str) -> Result<FieldOutcome, ValidationError> {
        let outcome = self.form.set(field, raw, self.policy.as_ref());
        match &outcome {
            Ok(FieldOutcome::Rejected(e)) | Err(e) => {
                debug!(%field, error = %e, "Input rejected")
            }
            Ok(FieldOutcome::Accepted(_)) => {}
        }
        outcome
    }

    /// [`edit_field`](Self::edit_field) addressed by field name.
    pub fn edit_field_named(&mut self, name: &str, raw: &str) -> CoreResult<FieldOutcome> {
        let field: FormField = name.parse()?;
        Ok(self.edit_field(field, raw)?)
    }

    pub fn add_line(&mut self) -> LineId {
        let id = self.lines.add_line();
        debug!(line = %id, count = self.lines.len(), "Line added");
        id
    }

    /// Deleting the last remaining line is a no-op returning `false`.
    pub fn remove_line(&mut self, id: LineId) -> bool {
        let removed = self.lines.remove_line(id);
        debug!(line = %id, removed, count = self.lines.len(), "Line removal requested");
        removed
    }

    pub fn update_line(&mut self, id: LineId, field: LineField, raw: &str) -> bool {
        self.lines.update_line(id, field, raw)
    }

    pub fn update_line_named(&mut self, id: LineId, field: &str, raw: &str) -> CoreResult<bool> {
        let field: LineField = field.parse()?;
        Ok(self.update_line(id, field, raw))
    }

    /// Recomputes totals from the current lines. Edits never do this
    /// implicitly.
    pub fn recalculate(&mut self) -> Totals {
        self.totals = compute_totals(self.lines.lines());
        self.totals
    }

    /// Totals as of the last [`recalculate`](Self::recalculate).
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Projects the print view from the current state and last totals.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::project(&self.form, &self.lines, &self.totals, &self.profile)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn form(&self) -> &FormRecord {
        &self.form
    }

    pub fn lines(&self) -> &LineStore {
        &self.lines
    }

    pub fn profile(&self) -> &WorkshopProfile {
        &self.profile
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn pipeline(&self) -> &Arc<ExportPipeline> {
        &self.pipeline
    }

    pub fn export_state(&self) -> ExportState {
        self.pipeline.state()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_scroll(&mut self, offset: u32) {
        self.viewport.scroll_offset = offset;
    }

    /// Starts loading the header logo from a PPM file.
    pub fn load_logo(&self, path: PathBuf) -> JoinHandle<()> {
        self.assets.load_ppm(LOGO_ASSET, path, AssetOrigin::SameOrigin)
    }

    /// Installs an already-decoded header logo.
    pub fn set_logo(&self, logo: ImageAsset) {
        self.assets.resolve(LOGO_ASSET, logo);
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Runs the export pipeline once and hands the PDF to `sink`.
    ///
    /// Form and line state are never modified by an export, successful or
    /// not; only the totals are refreshed.
    pub async fn export(&mut self, sink: &dyn DocumentSink) -> ExportResult<ExportReceipt> {
        let mut run = self.pipeline.begin()?;
        match self.run_stages(&mut run, sink).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                run.fail(&e);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &mut self,
        run: &mut ExportRun,
        sink: &dyn DocumentSink,
    ) -> ExportResult<ExportReceipt> {
        // ---------------------------------------------------------------------
        // Preparing
        // ---------------------------------------------------------------------
        self.totals = compute_totals(self.lines.lines());
        let snapshot = DocumentSnapshot::project(&self.form, &self.lines, &self.totals, &self.profile);
        let viewport = ViewportGuard::capture(&mut self.viewport, self.page.width_px);

        self.assets
            .wait_ready(Duration::from_millis(self.export.asset_timeout_ms))
            .await?;

        let logo = self.assets.contains(LOGO_ASSET).then_some(LOGO_ASSET);
        let mut assets = HashMap::new();
        if let Some(asset) = self.assets.get(LOGO_ASSET) {
            assets.insert(LOGO_ASSET.to_string(), asset);
        }
        let page = PageSettings {
            width_px: viewport.snapshot_width_px.unwrap_or(self.page.width_px),
            ..self.page.clone()
        };

        // ---------------------------------------------------------------------
        // Capturing
        // ---------------------------------------------------------------------
        run.advance(ExportState::Capturing)?;
        let rasterizer = Arc::clone(&self.rasterizer);
        let layout_snapshot = snapshot.clone();
        let (bitmap, overflowed) = tokio::task::spawn_blocking(move || {
            let mut layout = compose(&layout_snapshot, &page, logo);
            // the PDF shows one A4 page
            let overflowed = layout.clip_to(page.min_height_px());
            if overflowed {
                debug!(rows = layout_snapshot.rows.len(), "Line table runs past the page, clipping");
            }
            rasterizer
                .rasterize(&layout, &assets, page.supersample)
                .map(|bitmap| (bitmap, overflowed))
        })
        .await
        .map_err(|e| join_failure("capture", e))??;

        if let Some(asset) = &bitmap.tainted_by {
            return Err(ExportError::TaintedCapture {
                asset: asset.clone(),
            });
        }
        let (pixel_width, pixel_height) = (bitmap.width, bitmap.height);

        // ---------------------------------------------------------------------
        // Encoding
        // ---------------------------------------------------------------------
        run.advance(ExportState::Encoding)?;
        let encoder = Arc::clone(&self.encoder);
        let title = snapshot.document_type.display_name().to_string();
        let pdf = tokio::task::spawn_blocking(move || encode_document(encoder.as_ref(), &bitmap, &title))
            .await
            .map_err(|e| join_failure("encode", e))??;

        // ---------------------------------------------------------------------
        // Delivery
        // ---------------------------------------------------------------------
        let today = Local::now().date_naive();
        let filename = export_filename(&snapshot, &self.export.registration_placeholder, today);
        let bytes = pdf.bytes.len();
        let clipped = overflowed || pdf.clipped;
        let location = sink.deliver(&filename, pdf.bytes).await?;
        drop(viewport);

        run.advance(ExportState::Delivered)?;
        info!(run = %run.id(), %filename, bytes, clipped, "Export delivered");

        Ok(ExportReceipt {
            id: run.id(),
            filename,
            location,
            bytes,
            pixel_width,
            pixel_height,
            clipped,
            created_at: Utc::now(),
        })
    }
}

/// Bitmap → image bytes → verified `data:` URI → single-page PDF.
fn encode_document(encoder: &dyn ImageEncoder, bitmap: &Bitmap, title: &str) -> ExportResult<PdfDocument> {
    let encoded = encoder.encode(bitmap)?;
    let uri = to_data_uri(encoder.mime(), &encoded);
    let png = verify_data_uri(&uri)?;
    let image = read_png(&png)?;
    write_single_page(&image, title)
}

fn join_failure(stage: &str, err: JoinError) -> ExportError {
    if err.is_panic() {
        ExportError::Internal(format!("{} stage panicked", stage))
    } else {
        ExportError::Internal(format!("{} stage was cancelled: {}", stage, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::MemorySink;
    use motorbill_core::SurfaceErrors;

    fn session() -> QuoteSession {
        QuoteSession::new(&MotorbillConfig::default())
    }

    #[test]
    fn test_viewport_guard_restores() {
        let mut viewport = Viewport {
            scroll_offset: 420,
            ..Viewport::default()
        };
        {
            let guard = ViewportGuard::capture(&mut viewport, 794);
            assert_eq!(guard.scroll_offset, 0);
            assert!(guard.snapshot_visible);
            assert_eq!(guard.snapshot_width_px, Some(794));
            assert_eq!(guard.position, SnapshotPosition::Inline);
        }
        assert_eq!(viewport.scroll_offset, 420);
        assert!(!viewport.snapshot_visible);
        assert_eq!(viewport.position, SnapshotPosition::Offscreen);
    }

    #[test]
    fn test_new_session_is_dated_today() {
        let before = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let s = session();
        let after = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert!(s.form().date == before || s.form().date == after);
    }

    #[test]
    fn test_totals_only_move_on_recalculate() {
        let mut s = session();
        let id = s.lines().ids()[0];
        s.update_line(id, LineField::Spares, "250");
        assert!(s.totals().grand.is_zero());

        let totals = s.recalculate();
        assert_eq!(totals.spares.to_string(), "₹250.00");
        assert_eq!(s.totals(), totals);
    }

    #[test]
    fn test_named_edits() {
        let mut s = session();
        assert!(s.edit_field_named("customerName", "Ravi").unwrap().is_accepted());
        assert!(s.edit_field_named("nonsense", "x").is_err());

        let id = s.lines().ids()[0];
        assert!(s.update_line_named(id, "description", "Oil change").unwrap());
        assert!(s.update_line_named(id, "colour", "red").is_err());
    }

    #[test]
    fn test_strict_policy_surfaces_rejection() {
        let mut s = session().with_policy(SurfaceErrors);
        assert!(s.edit_field(FormField::CustomerName, "R2D2").is_err());
        assert_eq!(s.form().customer_name, "");
    }

    #[test]
    fn test_last_line_cannot_be_removed() {
        let mut s = session();
        let ids = s.lines().ids();
        for id in &ids[1..] {
            assert!(s.remove_line(*id));
        }
        assert!(!s.remove_line(ids[0]));
        assert_eq!(s.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_export_delivers_pdf() {
        let mut s = session();
        s.set_scroll(300);
        let sink = MemorySink::new();

        let receipt = s.export(&sink).await.unwrap();
        assert_eq!(s.export_state(), ExportState::Delivered);
        assert_eq!(s.viewport().scroll_offset, 300);
        assert!(!s.viewport().snapshot_visible);

        let docs = sink.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, receipt.filename);
        assert!(docs[0].1.starts_with(b"%PDF-1.4"));
        assert_eq!(receipt.bytes, docs[0].1.len());
        assert_eq!(receipt.pixel_width, 794 * 2);
    }

    #[test]
    fn test_join_failure_is_internal() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = rt.block_on(async {
            tokio::task::spawn_blocking(|| panic!("boom")).await.unwrap_err()
        });
        let mapped = join_failure("capture", err);
        assert!(matches!(mapped, ExportError::Internal(ref m) if m.contains("panicked")));
    }
}
