//! # Rasterizer
//!
//! Draws a [`PageLayout`] into an RGB bitmap at a supersampling factor.
//!
//! ## Taint
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DrawOp::Image(asset)                                                   │
//! │      │                                                                  │
//! │      ├── origin SameOrigin / CrossOrigin{cors: true}  → pixels copied   │
//! │      │                                                                  │
//! │      └── origin CrossOrigin{cors: false}              → pixels copied   │
//! │                                                          AND bitmap     │
//! │                                                          .tainted_by =  │
//! │                                                          Some(asset)    │
//! │                                                                         │
//! │  A tainted bitmap still renders; refusing to export it is the           │
//! │  pipeline's decision, not the rasterizer's.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::assets::ImageAsset;
use crate::error::{ExportError, ExportResult};
use crate::font::{glyph, CELL_WIDTH, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::layout::{DrawOp, PageLayout, Rgb, WHITE};

/// Largest bitmap dimension we will allocate, in device pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// An RGB raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
    /// First asset that made this bitmap unexportable, if any.
    pub tainted_by: Option<String>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let rgb = [background.0, background.1, background.2].repeat(width as usize * height as usize);
        Bitmap {
            width,
            height,
            rgb,
            tainted_by: None,
        }
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted_by.is_some()
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }

    /// One row of RGB bytes.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * 3;
        let start = y as usize * stride;
        &self.rgb[start..start + stride]
    }

    /// Fills a rectangle, clipped to the bitmap.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y.min(y_end)..y_end {
            let base = row as usize * self.width as usize;
            for col in x.min(x_end)..x_end {
                let i = (base + col as usize) * 3;
                self.rgb[i] = color.0;
                self.rgb[i + 1] = color.1;
                self.rgb[i + 2] = color.2;
            }
        }
    }

    fn put(&mut self, x: u32, y: u32, px: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y as usize * self.width as usize + x as usize) * 3;
            self.rgb[i..i + 3].copy_from_slice(&px);
        }
    }
}

// =============================================================================
// Rasterizer Trait
// =============================================================================

/// Turns a layout into pixels.
pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        layout: &PageLayout,
        assets: &HashMap<String, ImageAsset>,
        scale: u32,
    ) -> ExportResult<Bitmap>;
}

/// CPU rasterizer using the built-in bitmap font.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareRasterizer;

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(
        &self,
        layout: &PageLayout,
        assets: &HashMap<String, ImageAsset>,
        scale: u32,
    ) -> ExportResult<Bitmap> {
        let scale = scale.max(1);
        let width = layout.width.saturating_mul(scale);
        if width == 0 || layout.height == 0 {
            return Err(ExportError::MissingRenderTarget);
        }
        if width > MAX_DIMENSION {
            return Err(ExportError::Internal(format!(
                "page width of {} px exceeds the {} px raster limit",
                width, MAX_DIMENSION
            )));
        }

        // tall pages lose their bottom rather than failing
        let rows = layout.height.min(MAX_DIMENSION / scale);
        if rows < layout.height {
            debug!(height = layout.height, kept = rows, scale, "Clipping page to raster limit");
        }

        let mut bitmap = Bitmap::new(width, rows * scale, WHITE);
        for op in layout.ops.iter().filter(|op| op.top() < rows) {
            match op {
                DrawOp::Fill { x, y, w, h, color } => {
                    bitmap.fill_rect(x * scale, y * scale, w * scale, h * scale, *color)
                }
                DrawOp::Text {
                    x,
                    y,
                    size,
                    color,
                    text,
                } => draw_text(&mut bitmap, *x * scale, *y * scale, size * scale, *color, text),
                DrawOp::Image { x, y, w, h, asset } => match assets.get(asset) {
                    Some(image) => {
                        draw_image(&mut bitmap, x * scale, y * scale, w * scale, h * scale, image);
                        if image.origin.taints() && bitmap.tainted_by.is_none() {
                            bitmap.tainted_by = Some(asset.clone());
                        }
                    }
                    None => debug!(asset = %asset, "Skipping image with no loaded asset"),
                },
            }
        }
        Ok(bitmap)
    }
}

fn draw_text(bitmap: &mut Bitmap, x: u32, y: u32, unit: u32, color: Rgb, text: &str) {
    let mut pen = x;
    for c in text.chars() {
        let rows = glyph(c);
        for (gy, bits) in rows.iter().enumerate().take(GLYPH_HEIGHT as usize) {
            for gx in 0..GLYPH_WIDTH {
                if bits & (0x10 >> gx) != 0 {
                    bitmap.fill_rect(pen + gx * unit, y + gy as u32 * unit, unit, unit, color);
                }
            }
        }
        pen += CELL_WIDTH * unit;
    }
}

/// Nearest-neighbour scale of `image` into the target box.
fn draw_image(bitmap: &mut Bitmap, x: u32, y: u32, w: u32, h: u32, image: &ImageAsset) {
    if w == 0 || h == 0 {
        return;
    }
    for ty in 0..h {
        let sy = (u64::from(ty) * u64::from(image.height) / u64::from(h)) as u32;
        for tx in 0..w {
            let sx = (u64::from(tx) * u64::from(image.width) / u64::from(w)) as u32;
            bitmap.put(x + tx, y + ty, image.pixel(sx, sy));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetOrigin;
    use crate::layout::INK;

    fn layout(ops: Vec<DrawOp>) -> PageLayout {
        PageLayout {
            width: 40,
            height: 20,
            ops,
        }
    }

    #[test]
    fn test_supersampled_size() {
        let bitmap = SoftwareRasterizer
            .rasterize(&layout(vec![]), &HashMap::new(), 2)
            .unwrap();
        assert_eq!((bitmap.width, bitmap.height), (80, 40));
        assert_eq!(bitmap.pixel(79, 39), [255, 255, 255]);
    }

    #[test]
    fn test_fill_is_scaled_and_clipped() {
        let ops = vec![DrawOp::Fill { x: 30, y: 0, w: 50, h: 2, color: INK }];
        let bitmap = SoftwareRasterizer.rasterize(&layout(ops), &HashMap::new(), 2).unwrap();
        assert_eq!(bitmap.pixel(60, 0), [INK.0, INK.1, INK.2]);
        assert_eq!(bitmap.pixel(79, 3), [INK.0, INK.1, INK.2]);
        assert_eq!(bitmap.pixel(59, 0), [255, 255, 255]);
        assert_eq!(bitmap.pixel(60, 4), [255, 255, 255]);
    }

    #[test]
    fn test_text_sets_glyph_pixels() {
        let ops = vec![DrawOp::Text { x: 0, y: 0, size: 1, color: INK, text: "I".into() }];
        let bitmap = SoftwareRasterizer.rasterize(&layout(ops), &HashMap::new(), 1).unwrap();
        // 'I' top row is 0x0E: columns 1..=3 set
        assert_eq!(bitmap.pixel(0, 0), [255, 255, 255]);
        assert_eq!(bitmap.pixel(2, 0), [INK.0, INK.1, INK.2]);
        assert_eq!(bitmap.pixel(2, 3), [INK.0, INK.1, INK.2]);
    }

    #[test]
    fn test_tall_page_is_cut_at_the_raster_limit() {
        let tall = PageLayout {
            width: 10,
            height: MAX_DIMENSION,
            ops: vec![
                DrawOp::Fill { x: 0, y: 0, w: 10, h: 1, color: INK },
                DrawOp::Fill { x: 0, y: MAX_DIMENSION - 1, w: 10, h: 1, color: INK },
            ],
        };
        let bitmap = SoftwareRasterizer.rasterize(&tall, &HashMap::new(), 2).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (20, MAX_DIMENSION));
        assert_eq!(bitmap.pixel(0, 0), [INK.0, INK.1, INK.2]);
        assert_eq!(bitmap.pixel(0, MAX_DIMENSION - 1), [255, 255, 255]);
    }

    #[test]
    fn test_zero_size_is_missing_target() {
        let empty = PageLayout { width: 0, height: 10, ops: vec![] };
        assert!(matches!(
            SoftwareRasterizer.rasterize(&empty, &HashMap::new(), 2),
            Err(ExportError::MissingRenderTarget)
        ));
    }

    #[test]
    fn test_cross_origin_image_taints() {
        let ops = vec![DrawOp::Image { x: 0, y: 0, w: 4, h: 4, asset: "logo".into() }];
        let mut assets = HashMap::new();
        assets.insert(
            "logo".to_string(),
            ImageAsset::solid(1, 1, [0, 128, 0], AssetOrigin::CrossOrigin { cors: false }),
        );

        let bitmap = SoftwareRasterizer.rasterize(&layout(ops.clone()), &assets, 1).unwrap();
        assert_eq!(bitmap.pixel(3, 3), [0, 128, 0]);
        assert_eq!(bitmap.tainted_by.as_deref(), Some("logo"));

        assets.insert(
            "logo".to_string(),
            ImageAsset::solid(1, 1, [0, 128, 0], AssetOrigin::CrossOrigin { cors: true }),
        );
        let clean = SoftwareRasterizer.rasterize(&layout(ops), &assets, 1).unwrap();
        assert!(!clean.is_tainted());
    }
}
