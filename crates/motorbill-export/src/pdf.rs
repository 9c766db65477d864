//! # Single-Page PDF Writer
//!
//! Wraps one PNG image in an A4 portrait PDF.
//!
//! ## Placement
//! ```text
//! ┌──────────────── 595.28 pt ────────────────┐
//! │┌─────────────────────────────────────────┐│ ▲
//! ││                                         ││ │  image fills the page width,
//! ││            page image                   ││ │  keeps its aspect ratio and
//! ││                                         ││ │  is pinned to the top edge
//! ││                                         ││ 841.89 pt
//! │└─────────────────────────────────────────┘│ │
//! │                                           │ │  anything taller than the
//! │                                           │ ▼  page is clipped at the bottom
//! └───────────────────────────────────────────┘
//! ```
//!
//! The PNG's IDAT stream is embedded untouched: PDF's FlateDecode filter
//! with `/Predictor 15` understands PNG row filters natively.

use crate::error::{ExportError, ExportResult};
use crate::png::PngImage;

/// A4 portrait, in points.
pub const A4_WIDTH_PT: f64 = 595.28;
pub const A4_HEIGHT_PT: f64 = 841.89;

/// An assembled PDF file.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    /// The image was taller than the page and lost its bottom edge.
    pub clipped: bool,
    /// Drawn image height in points (before clipping).
    pub image_height_pt: f64,
}

/// Builds the PDF around an 8-bit RGB PNG.
pub fn write_single_page(image: &PngImage, title: &str) -> ExportResult<PdfDocument> {
    if image.bit_depth != 8 || image.color_type != 2 {
        return Err(ExportError::Pdf(format!(
            "expected 8-bit RGB image, got depth {} colour type {}",
            image.bit_depth, image.color_type
        )));
    }
    if image.width == 0 || image.height == 0 {
        return Err(ExportError::Pdf("image has zero size".into()));
    }

    let draw_w = A4_WIDTH_PT;
    let draw_h = A4_WIDTH_PT * f64::from(image.height) / f64::from(image.width);
    let y = A4_HEIGHT_PT - draw_h;
    // sub-pixel overshoot from rounding the page height is not clipping
    let clipped = draw_h > A4_HEIGHT_PT + 0.5;

    let content = format!(
        "q\n0 0 {:.2} {:.2} re W n\n{:.4} 0 0 {:.4} 0 {:.4} cm\n/Im0 Do\nQ\n",
        A4_WIDTH_PT, A4_HEIGHT_PT, draw_w, draw_h, y
    );

    let mut pdf = PdfWriter::new();
    pdf.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(
        3,
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /XObject << /Im0 5 0 R >> >> /Contents 4 0 R >>",
            A4_WIDTH_PT, A4_HEIGHT_PT
        )
        .as_bytes(),
    );
    pdf.stream(4, "", content.as_bytes());
    pdf.stream(
        5,
        &format!(
            "/Type /XObject /Subtype /Image /Width {w} /Height {h} /ColorSpace /DeviceRGB \
             /BitsPerComponent 8 /Filter /FlateDecode \
             /DecodeParms << /Predictor 15 /Colors 3 /BitsPerComponent 8 /Columns {w} >>",
            w = image.width,
            h = image.height
        ),
        &image.idat,
    );
    pdf.object(
        6,
        format!(
            "<< /Title ({}) /Producer (Motorbill) >>",
            escape_string(title)
        )
        .as_bytes(),
    );

    Ok(PdfDocument {
        bytes: pdf.finish(1, 6),
        clipped,
        image_height_pt: draw_h,
    })
}

/// Escapes a PDF literal string; non-ASCII becomes `?`.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Sequential object writer tracking xref offsets.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<(u32, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        PdfWriter {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: u32, body: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.buf.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: u32, dict: &str, data: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.buf.extend_from_slice(
            format!("{} 0 obj\n<< {} /Length {} >>\nstream\n", id, dict, data.len()).as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root: u32, info: u32) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let size = self.offsets.len() + 1;
        let xref_at = self.buf.len();

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for (_, offset) in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, root, info, xref_at
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> PngImage {
        PngImage {
            width,
            height,
            bit_depth: 8,
            color_type: 2,
            idat: vec![0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01],
        }
    }

    fn text(pdf: &PdfDocument) -> String {
        String::from_utf8_lossy(&pdf.bytes).into_owned()
    }

    #[test]
    fn test_structure() {
        let pdf = write_single_page(&image(1588, 2246), "Cash Bill").unwrap();
        let body = text(&pdf);
        assert!(body.starts_with("%PDF-1.4"));
        assert!(body.trim_end().ends_with("%%EOF"));
        assert!(body.contains("/MediaBox [0 0 595.28 841.89]"));
        assert!(body.contains("/Predictor 15 /Colors 3 /BitsPerComponent 8 /Columns 1588"));
        assert!(body.contains("/Title (Cash Bill)"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let pdf = write_single_page(&image(10, 10), "t").unwrap();
        let bytes = &pdf.bytes;
        let xref = bytes.windows(5).position(|w| w == b"xref\n").unwrap();
        let tail = String::from_utf8(bytes[xref..].to_vec()).unwrap();

        let startxref: usize = tail
            .rsplit("startxref\n")
            .next()
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(startxref, xref);

        for (i, entry) in tail.lines().skip(3).take(6).enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(bytes[offset..].starts_with(format!("{} 0 obj", i + 1).as_bytes()));
        }
    }

    #[test]
    fn test_a4_proportioned_image_fills_page() {
        let pdf = write_single_page(&image(794, 1123), "t").unwrap();
        assert!(!pdf.clipped);
        assert!((pdf.image_height_pt - 841.9).abs() < 0.5);
    }

    #[test]
    fn test_tall_image_is_clipped() {
        let pdf = write_single_page(&image(794, 2000), "t").unwrap();
        assert!(pdf.clipped);
        assert!(text(&pdf).contains("re W n"));
    }

    #[test]
    fn test_rejects_non_rgb() {
        let mut gray = image(4, 4);
        gray.color_type = 0;
        assert!(matches!(write_single_page(&gray, "t"), Err(ExportError::Pdf(_))));
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a(b)\\c"), "a\\(b\\)\\\\c");
        assert_eq!(escape_string("₹ total"), "? total");
    }
}
