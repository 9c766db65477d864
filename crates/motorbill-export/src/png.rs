//! # PNG Encoding
//!
//! Encodes a [`Bitmap`] as an 8-bit RGB PNG, wraps it as a `data:` URI and
//! reads it back for embedding.
//!
//! ## Stream Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  89 50 4E 47 0D 0A 1A 0A                  signature                     │
//! │  IHDR  width, height, depth 8, colour 2 (RGB), deflate, no interlace    │
//! │  IDAT  zlib( for each row: filter byte 1 (Sub) + filtered RGB bytes )   │
//! │  IEND                                                                   │
//! │                                                                         │
//! │  Every chunk: length (BE u32) | type | data | CRC32(type + data)        │
//! │                                                                         │
//! │  The IDAT zlib stream is exactly what a PDF image XObject accepts with  │
//! │  /FlateDecode and /Predictor 15, so the PDF writer embeds it as is.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};

use crate::error::{ExportError, ExportResult};
use crate::raster::Bitmap;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub const PNG_MIME: &str = "image/png";

const FILTER_SUB: u8 = 1;

// =============================================================================
// Encoder Trait
// =============================================================================

/// Serializes a bitmap for the PDF writer.
///
/// The export path only accepts 8-bit RGB PNG: [`verify_data_uri`] wants a
/// `data:image/png` URI with a PNG signature and the PDF embeds the IDAT
/// stream directly. An encoder that labels or produces anything else fails
/// the export with [`ExportError::MalformedPayload`].
pub trait ImageEncoder: Send + Sync {
    /// MIME type written into the `data:` URI; must be [`PNG_MIME`].
    fn mime(&self) -> &'static str;

    fn encode(&self, bitmap: &Bitmap) -> ExportResult<Vec<u8>>;
}

/// PNG encoder backed by flate2.
#[derive(Debug, Clone, Copy)]
pub struct PngEncoder {
    pub compression: Compression,
}

impl Default for PngEncoder {
    fn default() -> Self {
        PngEncoder {
            compression: Compression::default(),
        }
    }
}

impl ImageEncoder for PngEncoder {
    fn mime(&self) -> &'static str {
        PNG_MIME
    }

    fn encode(&self, bitmap: &Bitmap) -> ExportResult<Vec<u8>> {
        if bitmap.width == 0 || bitmap.height == 0 {
            return Err(ExportError::MissingRenderTarget);
        }

        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&bitmap.width.to_be_bytes());
        ihdr.extend_from_slice(&bitmap.height.to_be_bytes());
        ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);

        let idat = compress_scanlines(bitmap, self.compression)
            .map_err(|e| ExportError::MalformedPayload(format!("deflate failed: {}", e)))?;

        let mut out = Vec::with_capacity(idat.len() + 64);
        out.extend_from_slice(&PNG_SIGNATURE);
        write_chunk(&mut out, b"IHDR", &ihdr);
        write_chunk(&mut out, b"IDAT", &idat);
        write_chunk(&mut out, b"IEND", &[]);
        Ok(out)
    }
}

fn compress_scanlines(bitmap: &Bitmap, level: Compression) -> std::io::Result<Vec<u8>> {
    let stride = bitmap.width as usize * 3;
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    let mut filtered = vec![0u8; stride + 1];
    filtered[0] = FILTER_SUB;

    for y in 0..bitmap.height {
        let row = bitmap.row(y);
        for i in 0..stride {
            let left = if i >= 3 { row[i - 3] } else { 0 };
            filtered[i + 1] = row[i].wrapping_sub(left);
        }
        encoder.write_all(&filtered)?;
    }
    encoder.finish()
}

fn chunk_crc(kind: &[u8; 4], data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    crc.sum()
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(kind, data).to_be_bytes());
}

// =============================================================================
// Data URI
// =============================================================================

/// `data:<mime>;base64,<payload>`
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Checks a PNG data URI and returns the decoded image bytes.
///
/// ## Checks
/// 1. Tagged exactly `data:image/png;base64,`
/// 2. Payload is non-empty valid base64
/// 3. Decoded bytes start with the PNG signature
pub fn verify_data_uri(uri: &str) -> ExportResult<Vec<u8>> {
    let prefix = format!("data:{};base64,", PNG_MIME);
    let payload = uri.strip_prefix(&prefix).ok_or_else(|| {
        let tag: String = uri.chars().take(32).collect();
        ExportError::MalformedPayload(format!("unexpected data URI tag '{}'", tag))
    })?;

    if payload.is_empty() {
        return Err(ExportError::MalformedPayload("empty image payload".into()));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ExportError::MalformedPayload(format!("invalid base64: {}", e)))?;

    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(ExportError::MalformedPayload("payload is not a PNG".into()));
    }
    Ok(bytes)
}

// =============================================================================
// Reader
// =============================================================================

/// The parts of a PNG the PDF writer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    /// Concatenated IDAT data (one zlib stream).
    pub idat: Vec<u8>,
}

/// Walks the chunk list, verifying CRCs.
pub fn read_png(bytes: &[u8]) -> ExportResult<PngImage> {
    let malformed = |msg: &str| ExportError::MalformedPayload(msg.to_string());

    let mut rest = bytes
        .strip_prefix(&PNG_SIGNATURE[..])
        .ok_or_else(|| malformed("missing PNG signature"))?;

    let mut header: Option<(u32, u32, u8, u8)> = None;
    let mut idat = Vec::new();
    let mut ended = false;

    while !rest.is_empty() {
        if rest.len() < 12 {
            return Err(malformed("truncated chunk"));
        }
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let kind = [rest[4], rest[5], rest[6], rest[7]];
        if rest.len() < 12 + len {
            return Err(malformed("chunk runs past end of data"));
        }
        let data = &rest[8..8 + len];
        let stored = u32::from_be_bytes([rest[8 + len], rest[9 + len], rest[10 + len], rest[11 + len]]);
        if stored != chunk_crc(&kind, data) {
            return Err(malformed("chunk CRC mismatch"));
        }

        match &kind {
            b"IHDR" if data.len() == 13 => {
                let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
                header = Some((width, height, data[8], data[9]));
            }
            b"IDAT" => idat.extend_from_slice(data),
            b"IEND" => {
                ended = true;
                break;
            }
            _ => {}
        }
        rest = &rest[12 + len..];
    }

    let (width, height, bit_depth, color_type) = header.ok_or_else(|| malformed("missing IHDR"))?;
    if !ended {
        return Err(malformed("missing IEND"));
    }
    if idat.is_empty() {
        return Err(malformed("missing IDAT"));
    }
    if width == 0 || height == 0 {
        return Err(malformed("zero-sized image"));
    }

    Ok(PngImage {
        width,
        height,
        bit_depth,
        color_type,
        idat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Rgb;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn checker() -> Bitmap {
        let mut bitmap = Bitmap::new(4, 3, Rgb(255, 255, 255));
        bitmap.fill_rect(0, 0, 2, 1, Rgb(10, 20, 30));
        bitmap
    }

    #[test]
    fn test_encode_structure() {
        let png = PngEncoder::default().encode(&checker()).unwrap();
        assert!(png.starts_with(&PNG_SIGNATURE));
        assert_eq!(&png[12..16], b"IHDR");
        assert!(png.ends_with(&[0xAE, 0x42, 0x60, 0x82]), "IEND CRC");

        let info = read_png(&png).unwrap();
        assert_eq!((info.width, info.height), (4, 3));
        assert_eq!((info.bit_depth, info.color_type), (8, 2));
    }

    #[test]
    fn test_idat_unfilters_to_original_pixels() {
        let bitmap = checker();
        let info = read_png(&PngEncoder::default().encode(&bitmap).unwrap()).unwrap();

        let mut raw = Vec::new();
        ZlibDecoder::new(&info.idat[..]).read_to_end(&mut raw).unwrap();
        assert_eq!(raw.len(), (4 * 3 + 1) * 3);

        let first_row = &raw[1..13];
        let mut pixels = first_row.to_vec();
        for i in 3..pixels.len() {
            pixels[i] = pixels[i].wrapping_add(pixels[i - 3]);
        }
        assert_eq!(raw[0], FILTER_SUB);
        assert_eq!(pixels, bitmap.row(0));
    }

    #[test]
    fn test_data_uri_round_trip_is_verified() {
        let png = PngEncoder::default().encode(&checker()).unwrap();
        let uri = to_data_uri(PNG_MIME, &png);
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
        assert_eq!(verify_data_uri(&uri).unwrap(), png);
    }

    #[test]
    fn test_png_under_another_label_is_rejected() {
        let encoder = PngEncoder::default();
        assert_eq!(encoder.mime(), PNG_MIME);

        let png = encoder.encode(&checker()).unwrap();
        let uri = to_data_uri("image/webp", &png);
        assert!(matches!(verify_data_uri(&uri), Err(ExportError::MalformedPayload(_))));
    }

    #[test]
    fn test_verify_rejects_malformed_uris() {
        for uri in [
            "",
            "data:,",
            "data:image/png;base64,",
            "data:image/jpeg;base64,/9j/4AAQ",
            "data:image/png;base64,!!!",
            "data:image/png;base64,aGVsbG8=",
        ] {
            assert!(
                matches!(verify_data_uri(uri), Err(ExportError::MalformedPayload(_))),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn test_read_png_detects_corruption() {
        let mut png = PngEncoder::default().encode(&checker()).unwrap();
        let last = png.len() - 20;
        png[last] ^= 0xFF;
        assert!(read_png(&png).is_err());
        assert!(read_png(&PNG_SIGNATURE).is_err());
    }
}
