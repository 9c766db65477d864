//! # Asset Store
//!
//! Named images (the workshop logo, stamps) drawn into the document, plus
//! an explicit readiness signal the export pipeline waits on.
//!
//! ## Readiness
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mark_pending("logo")   ──► table: logo = Pending   ──┐                 │
//! │  (spawned load task)                                  │ watch::Sender   │
//! │  resolve("logo", img)   ──► table: logo = Ready     ──┤ send_modify     │
//! │  fail("logo", reason)   ──► table: logo = Failed    ──┘                 │
//! │                                                                         │
//! │  wait_ready(limit)                                                      │
//! │    ├── every entry Ready           → Ok(())                             │
//! │    ├── any entry Failed            → Err(AssetFailed)                   │
//! │    └── still Pending after `limit` → Err(AssetsNotReady)                │
//! │                                                                         │
//! │  The wait ends as soon as the table changes to all-ready; `limit` only  │
//! │  bounds how long a stuck load can hold the export.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ExportError, ExportResult};

// =============================================================================
// Image Asset
// =============================================================================

/// Where an image's pixels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Loaded from the same origin as the document (local files, bundled).
    SameOrigin,
    /// Loaded from elsewhere. Without CORS approval its pixels taint a capture.
    CrossOrigin { cors: bool },
}

impl AssetOrigin {
    pub fn taints(&self) -> bool {
        matches!(self, AssetOrigin::CrossOrigin { cors: false })
    }
}

/// A decoded RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, `width * height * 3` bytes.
    pub rgb: Arc<Vec<u8>>,
    pub origin: AssetOrigin,
}

impl ImageAsset {
    /// Wraps raw RGB pixels, checking the buffer size.
    pub fn from_rgb(width: u32, height: u32, rgb: Vec<u8>, origin: AssetOrigin) -> Result<Self, String> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 {
            return Err("image has zero size".to_string());
        }
        if rgb.len() != expected {
            return Err(format!("expected {} bytes of RGB, got {}", expected, rgb.len()));
        }
        Ok(ImageAsset {
            width,
            height,
            rgb: Arc::new(rgb),
            origin,
        })
    }

    /// A single-colour image.
    pub fn solid(width: u32, height: u32, color: [u8; 3], origin: AssetOrigin) -> Self {
        let rgb = color.repeat(width as usize * height as usize);
        ImageAsset {
            width,
            height,
            rgb: Arc::new(rgb),
            origin,
        }
    }

    /// Decodes a binary PPM (`P6`, maxval 255).
    pub fn from_ppm(bytes: &[u8], origin: AssetOrigin) -> Result<Self, String> {
        let mut pos = 0;
        let mut header = Vec::with_capacity(4);
        while header.len() < 4 {
            // skip whitespace and comments
            while pos < bytes.len() {
                match bytes[pos] {
                    b'#' => {
                        while pos < bytes.len() && bytes[pos] != b'\n' {
                            pos += 1;
                        }
                    }
                    b if b.is_ascii_whitespace() => pos += 1,
                    _ => break,
                }
            }
            let start = pos;
            while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if start == pos {
                return Err("truncated PPM header".to_string());
            }
            header.push(String::from_utf8_lossy(&bytes[start..pos]).into_owned());
        }

        if header[0] != "P6" {
            return Err(format!("unsupported PPM magic '{}'", header[0]));
        }
        let parse = |s: &str, what: &str| {
            s.parse::<u32>()
                .map_err(|_| format!("invalid PPM {}: '{}'", what, s))
        };
        let width = parse(&header[1], "width")?;
        let height = parse(&header[2], "height")?;
        if parse(&header[3], "maxval")? != 255 {
            return Err("only 8-bit PPM (maxval 255) is supported".to_string());
        }

        // exactly one whitespace byte separates the header from the pixels
        let data = bytes.get(pos + 1..).unwrap_or_default();
        let expected = width as usize * height as usize * 3;
        if data.len() < expected {
            return Err(format!("PPM pixel data truncated: {} of {} bytes", data.len(), expected));
        }
        Self::from_rgb(width, height, data[..expected].to_vec(), origin)
    }

    /// Pixel at `(x, y)`; callers keep coordinates in range.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }
}

// =============================================================================
// Asset Store
// =============================================================================

#[derive(Debug, Clone)]
enum AssetSlot {
    Pending,
    Ready(ImageAsset),
    Failed(String),
}

type AssetTable = BTreeMap<String, AssetSlot>;

/// Overall state of every registered asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Pending(Vec<String>),
    Failed { name: String, reason: String },
}

/// Shared, cloneable registry of document assets.
#[derive(Debug, Clone)]
pub struct AssetStore {
    table: Arc<watch::Sender<AssetTable>>,
}

impl AssetStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AssetTable::new());
        AssetStore { table: Arc::new(tx) }
    }

    /// Registers an asset that is still loading.
    pub fn mark_pending(&self, name: &str) {
        debug!(asset = name, "Asset pending");
        self.table.send_modify(|table| {
            table.insert(name.to_string(), AssetSlot::Pending);
        });
    }

    /// Marks an asset loaded.
    pub fn resolve(&self, name: &str, asset: ImageAsset) {
        debug!(asset = name, width = asset.width, height = asset.height, "Asset ready");
        self.table.send_modify(|table| {
            table.insert(name.to_string(), AssetSlot::Ready(asset));
        });
    }

    /// Marks an asset as failed to load.
    pub fn fail(&self, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(asset = name, %reason, "Asset failed to load");
        self.table.send_modify(|table| {
            table.insert(name.to_string(), AssetSlot::Failed(reason));
        });
    }

    /// Drops an asset from the document.
    pub fn remove(&self, name: &str) {
        self.table.send_modify(|table| {
            table.remove(name);
        });
    }

    /// A loaded asset, if present and ready.
    pub fn get(&self, name: &str) -> Option<ImageAsset> {
        match self.table.borrow().get(name) {
            Some(AssetSlot::Ready(asset)) => Some(asset.clone()),
            _ => None,
        }
    }

    /// Whether `name` has been registered at all.
    pub fn contains(&self, name: &str) -> bool {
        self.table.borrow().contains_key(name)
    }

    pub fn readiness(&self) -> Readiness {
        readiness_of(&self.table.borrow())
    }

    /// Waits until every registered asset is ready, bounded by `limit`.
    pub async fn wait_ready(&self, limit: Duration) -> ExportResult<()> {
        let started = Instant::now();
        let mut rx = self.table.subscribe();

        let waited = tokio::time::timeout(limit, async {
            loop {
                let state = readiness_of(&rx.borrow_and_update());
                match state {
                    Readiness::Pending(_) => {}
                    other => return Ok(other),
                }
                if rx.changed().await.is_err() {
                    return Err(ExportError::Internal("asset store dropped".into()));
                }
            }
        })
        .await;

        match waited {
            Ok(Ok(Readiness::Failed { name, reason })) => Err(ExportError::AssetFailed { name, reason }),
            Ok(Ok(_)) => {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Assets ready");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let pending = match self.readiness() {
                    Readiness::Pending(names) => names,
                    _ => Vec::new(),
                };
                Err(ExportError::AssetsNotReady {
                    pending,
                    waited_ms: limit.as_millis() as u64,
                })
            }
        }
    }

    /// Loads a PPM file on a background task.
    ///
    /// The asset is `Pending` from the moment this returns until the task
    /// resolves or fails it.
    pub fn load_ppm(&self, name: &str, path: PathBuf, origin: AssetOrigin) -> JoinHandle<()> {
        self.mark_pending(name);
        let store = self.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            let loaded = match tokio::fs::read(&path).await {
                Ok(bytes) => ImageAsset::from_ppm(&bytes, origin),
                Err(e) => Err(e.to_string()),
            };
            match loaded {
                Ok(asset) => {
                    info!(asset = %name, ?path, "Loaded asset");
                    store.resolve(&name, asset);
                }
                Err(reason) => store.fail(&name, reason),
            }
        })
    }
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::new()
    }
}

fn readiness_of(table: &AssetTable) -> Readiness {
    let mut pending = Vec::new();
    for (name, slot) in table {
        match slot {
            AssetSlot::Ready(_) => {}
            AssetSlot::Pending => pending.push(name.clone()),
            AssetSlot::Failed(reason) => {
                return Readiness::Failed {
                    name: name.clone(),
                    reason: reason.clone(),
                }
            }
        }
    }
    if pending.is_empty() {
        Readiness::Ready
    } else {
        Readiness::Pending(pending)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
