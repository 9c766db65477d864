//! # Layout Composer
//!
//! Turns a [`DocumentSnapshot`] into draw operations on a fixed-width page.
//!
//! ## Coordinate Space
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (0,0) ───────────────────────── width_px (794 for A4 at 96 px/in) ──►  │
//! │    │   ┌─ margin ──────────────────────────────────────────────────┐   │
//! │    │   │  header                                                   │   │
//! │    │   │  title band                                               │   │
//! │    │   │  client | vehicle                                         │   │
//! │    │   │  table                                                    │   │
//! │    │   │  totals                                                   │   │
//! │    │   │  terms                                                    │   │
//! │    ▼   │  signatures (pinned near the bottom of an A4 page)        │   │
//! │        └───────────────────────────────────────────────────────────┘   │
//! │  height = max(content, A4 height at this width)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Units are CSS pixels; the rasterizer multiplies by the supersample
//! factor. Layout is pure: same snapshot and settings, same ops.

use motorbill_core::{DocumentSnapshot, Money, SnapshotField};

use crate::config::PageSettings;
use crate::font::{chars_that_fit, text_width, CELL_HEIGHT};

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const INK: Rgb = Rgb(30, 41, 59);
pub const MUTED: Rgb = Rgb(100, 116, 139);
pub const ACCENT: Rgb = Rgb(37, 99, 235);
pub const RULE: Rgb = Rgb(203, 213, 225);
pub const STRIPE: Rgb = Rgb(241, 245, 249);

/// One drawing instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    Fill {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        color: Rgb,
    },
    Text {
        x: u32,
        y: u32,
        size: u32,
        color: Rgb,
        text: String,
    },
    /// A named asset scaled into the box.
    Image {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        asset: String,
    },
}

impl DrawOp {
    /// Top edge, in page pixels.
    pub fn top(&self) -> u32 {
        match self {
            DrawOp::Fill { y, .. } | DrawOp::Text { y, .. } | DrawOp::Image { y, .. } => *y,
        }
    }
}

/// A composed page, ready for rasterization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    /// Cuts the page at `max_height`, dropping ops that start below it.
    ///
    /// Returns `true` when anything was cut.
    pub fn clip_to(&mut self, max_height: u32) -> bool {
        if self.height <= max_height {
            return false;
        }
        self.height = max_height;
        self.ops.retain(|op| op.top() < max_height);
        true
    }

    /// Asset names referenced by image ops.
    pub fn assets(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { asset, .. } => Some(asset.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every text run, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Text Helpers
// =============================================================================

/// Truncates to `max` characters, ending in `..` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    if max <= 2 {
        return ".".repeat(max);
    }
    let mut out: String = text.chars().take(max - 2).collect();
    out.push_str("..");
    out
}

/// Greedy word wrap to lines of at most `max` characters.
///
/// Words longer than a line are split hard.
pub fn wrap(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Table amount: grouped digits, or `-` for zero.
fn amount_cell(amount: Money) -> String {
    if amount.is_zero() {
        "-".to_string()
    } else {
        amount.grouped()
    }
}

// =============================================================================
// Composer
// =============================================================================

const LOGO_SIZE: u32 = 64;
const LINE_GAP: u32 = 4;
const ROW_HEIGHT: u32 = 18;
const SIGNATURE_WIDTH: u32 = 200;

/// Table columns: header, width in px, right-aligned.
const COLUMNS: [(&str, u32, bool); 9] = [
    ("#", 28, false),
    ("DESCRIPTION", 0, false),
    ("QTY", 40, true),
    ("SPARES", 84, true),
    ("R/R", 66, true),
    ("D/R", 66, true),
    ("C/W", 66, true),
    ("PAINT", 66, true),
    ("TOTAL", 96, true),
];

struct Composer {
    left: u32,
    right: u32,
    y: u32,
    ops: Vec<DrawOp>,
}

impl Composer {
    fn content_width(&self) -> u32 {
        self.right - self.left
    }

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        self.ops.push(DrawOp::Fill { x, y, w, h, color });
    }

    fn text(&mut self, x: u32, y: u32, size: u32, color: Rgb, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.ops.push(DrawOp::Text { x, y, size, color, text });
        }
    }

    fn text_right(&mut self, right: u32, y: u32, size: u32, color: Rgb, text: impl Into<String>) {
        let text = text.into();
        let x = right.saturating_sub(text_width(&text, size));
        self.text(x, y, size, color, text);
    }

    fn rule(&mut self, thickness: u32, color: Rgb) {
        let (x, y, w) = (self.left, self.y, self.content_width());
        self.fill(x, y, w, thickness, color);
        self.y += thickness;
    }
}

/// Lays out one page. `logo` names a ready image asset to draw in the header.
pub fn compose(snapshot: &DocumentSnapshot, page: &PageSettings, logo: Option<&str>) -> PageLayout {
    let mut c = Composer {
        left: page.margin_px,
        right: page.width_px.saturating_sub(page.margin_px),
        y: page.margin_px,
        ops: Vec::new(),
    };

    header(&mut c, snapshot, logo);
    title_band(&mut c, snapshot);
    party_blocks(&mut c, snapshot);
    line_table(&mut c, snapshot);
    totals_block(&mut c, snapshot);
    terms(&mut c, snapshot);

    let min_height = page.min_height_px();
    let signature_top = (c.y + 48).max(min_height.saturating_sub(page.margin_px + 40));
    c.y = signature_top;
    signatures(&mut c, snapshot);

    PageLayout {
        width: page.width_px,
        height: (c.y + page.margin_px).max(min_height),
        ops: c.ops,
    }
}

fn header(c: &mut Composer, snap: &DocumentSnapshot, logo: Option<&str>) {
    let top = c.y;
    let mut x = c.left;
    if let Some(asset) = logo {
        c.ops.push(DrawOp::Image {
            x,
            y: top,
            w: LOGO_SIZE,
            h: LOGO_SIZE,
            asset: asset.to_string(),
        });
        x += LOGO_SIZE + 12;
    }

    let right = c.right;
    let proprietor_width = text_width(&snap.profile.proprietor, 1).min(c.content_width() / 3);
    let text_room = right.saturating_sub(x + proprietor_width + 12);

    let mut y = top;
    c.text(x, y, 3, INK, truncate(&snap.profile.name.to_uppercase(), chars_that_fit(text_room, 3)));
    y += CELL_HEIGHT * 3 + LINE_GAP;
    c.text(x, y, 1, ACCENT, truncate(&snap.profile.tagline, chars_that_fit(text_room, 1)));
    y += CELL_HEIGHT + LINE_GAP;
    for line in &snap.profile.address {
        c.text(x, y, 1, MUTED, truncate(line, chars_that_fit(text_room, 1)));
        y += CELL_HEIGHT + 2;
    }
    if !snap.profile.contact.is_empty() {
        c.text(x, y, 1, MUTED, truncate(&snap.profile.contact, chars_that_fit(text_room, 1)));
        y += CELL_HEIGHT + 2;
    }

    let proprietor = truncate(&snap.profile.proprietor, chars_that_fit(c.content_width() / 3, 1));
    c.text_right(right, top + 4, 1, INK, proprietor);

    let logo_bottom = if logo.is_some() { top + LOGO_SIZE } else { top };
    c.y = y.max(logo_bottom) + 8;
    c.rule(2, INK);
    c.y += 8;
}

fn title_band(c: &mut Composer, snap: &DocumentSnapshot) {
    let band = 28;
    let (left, right, y, width) = (c.left, c.right, c.y, c.content_width());
    c.fill(left, y, width, band, INK);

    let meta = match (snap.reference.is_empty(), snap.printed_date.is_empty()) {
        (false, false) => format!("REF: {}   DATE: {}", snap.reference, snap.printed_date),
        (false, true) => format!("REF: {}", snap.reference),
        (true, false) => format!("DATE: {}", snap.printed_date),
        (true, true) => String::new(),
    };
    let meta_width = text_width(&meta, 1);
    c.text_right(right - 8, y + 10, 1, WHITE, meta);

    let title_room = width.saturating_sub(meta_width + 32);
    c.text(left + 8, y + 6, 2, WHITE, truncate(&snap.title(), chars_that_fit(title_room, 2)));
    c.y += band + 12;
}

fn party_blocks(c: &mut Composer, snap: &DocumentSnapshot) {
    let gap = 16;
    let column = (c.content_width() - gap) / 2;
    let top = c.y;

    let mut client = snap.client.clone();
    if !snap.estimator.is_empty() {
        client.push(SnapshotField {
            label: "Estimated By".to_string(),
            value: snap.estimator.clone(),
        });
    }

    let left = c.left;
    let left_bottom = field_column(c, left, top, column, "CLIENT DETAILS", &client);
    let right_bottom = field_column(c, left + column + gap, top, column, "VEHICLE DETAILS", &snap.vehicle);
    c.y = left_bottom.max(right_bottom) + 12;
}

/// Draws a titled label/value column, returning its bottom edge.
fn field_column(
    c: &mut Composer,
    x: u32,
    top: u32,
    width: u32,
    title: &str,
    fields: &[SnapshotField],
) -> u32 {
    let label_width = 96;
    let mut y = top;
    c.text(x, y, 1, ACCENT, title);
    y += CELL_HEIGHT + 2;
    c.fill(x, y, width, 1, RULE);
    y += 6;

    let value_chars = chars_that_fit(width.saturating_sub(label_width), 1);
    for field in fields {
        c.text(x, y, 1, MUTED, field.label.to_uppercase());
        let lines = if field.value.is_empty() {
            vec!["-".to_string()]
        } else {
            wrap(&field.value, value_chars)
        };
        for line in lines {
            c.text(x + label_width, y, 1, INK, line);
            y += CELL_HEIGHT + 4;
        }
    }
    y
}

fn line_table(c: &mut Composer, snap: &DocumentSnapshot) {
    let fixed: u32 = COLUMNS.iter().map(|(_, w, _)| *w).sum();
    let description_width = c.content_width().saturating_sub(fixed);
    let widths: Vec<u32> = COLUMNS
        .iter()
        .map(|(_, w, _)| if *w == 0 { description_width } else { *w })
        .collect();

    let (left, width) = (c.left, c.content_width());
    let y = c.y;
    c.fill(left, y, width, ROW_HEIGHT, INK);
    let mut x = left;
    for ((label, _, right_aligned), w) in COLUMNS.iter().zip(&widths) {
        if *right_aligned {
            c.text_right(x + w - 4, y + 5, 1, WHITE, *label);
        } else {
            c.text(x + 4, y + 5, 1, WHITE, *label);
        }
        x += w;
    }
    c.y += ROW_HEIGHT;

    if snap.rows.is_empty() {
        let y = c.y;
        c.text(left + 4, y + 5, 1, MUTED, "No service lines");
        c.y += ROW_HEIGHT;
    }

    for (i, row) in snap.rows.iter().enumerate() {
        let y = c.y;
        if i % 2 == 1 {
            c.fill(left, y, width, ROW_HEIGHT, STRIPE);
        }
        let cells = [
            row.index.to_string(),
            row.description.clone(),
            row.quantity.to_string(),
            amount_cell(row.spares),
            amount_cell(row.rr),
            amount_cell(row.dr),
            amount_cell(row.cw),
            amount_cell(row.painting),
            row.line_total.grouped(),
        ];
        let mut x = left;
        for ((cell, w), (_, _, right_aligned)) in cells.into_iter().zip(&widths).zip(&COLUMNS) {
            let text = truncate(&cell, chars_that_fit(w.saturating_sub(8), 1));
            if *right_aligned {
                c.text_right(x + w - 4, y + 5, 1, INK, text);
            } else {
                c.text(x + 4, y + 5, 1, INK, text);
            }
            x += w;
        }
        c.y += ROW_HEIGHT;
    }
    c.rule(1, RULE);
    c.y += 10;
}

fn totals_block(c: &mut Composer, snap: &DocumentSnapshot) {
    let box_width = 280;
    let left = c.right.saturating_sub(box_width);
    let right = c.right;

    for (label, amount) in [
        ("SPARES SUBTOTAL", snap.totals.spares),
        ("LABOUR SUBTOTAL", snap.totals.labor),
    ] {
        let y = c.y;
        c.text(left + 8, y, 1, MUTED, label);
        c.text_right(right - 8, y, 1, INK, amount.grouped());
        c.y += CELL_HEIGHT + 6;
    }

    let y = c.y;
    c.fill(left, y, box_width, 26, INK);
    c.text(left + 8, y + 9, 1, WHITE, "GRAND TOTAL");
    c.text_right(right - 8, y + 5, 2, WHITE, snap.totals.grand.to_string());
    c.y += 26 + 16;
}

fn terms(c: &mut Composer, snap: &DocumentSnapshot) {
    let x = c.left;
    let y = c.y;
    c.text(x, y, 1, ACCENT, "TERMS & CONDITIONS");
    c.y += CELL_HEIGHT + 6;

    let max = chars_that_fit(c.content_width() - 24, 1);
    for (i, term) in snap.terms.iter().enumerate() {
        let y = c.y;
        c.text(x, y, 1, MUTED, format!("{}.", i + 1));
        for line in wrap(term, max) {
            let y = c.y;
            c.text(x + 24, y, 1, MUTED, line);
            c.y += CELL_HEIGHT + 3;
        }
    }
}

fn signatures(c: &mut Composer, snap: &DocumentSnapshot) {
    let y = c.y;
    let (left, right) = (c.left, c.right);
    let [customer, signatory] = &snap.signatures;

    c.fill(left, y, SIGNATURE_WIDTH, 1, INK);
    c.text(left, y + 6, 1, INK, customer.as_str());

    c.fill(right - SIGNATURE_WIDTH, y, SIGNATURE_WIDTH, 1, INK);
    c.text_right(right, y + 6, 1, INK, signatory.as_str());

    c.y = y + 6 + CELL_HEIGHT;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use motorbill_core::{
        compute_totals, FormRecord, LineField, LineStore, WorkshopProfile,
    };

    fn snapshot(rows: usize) -> DocumentSnapshot {
        let mut lines = LineStore::with_blank_rows(rows.max(1));
        for (n, id) in lines.ids().into_iter().take(rows).enumerate() {
            lines.update_line(id, LineField::Description, &format!("Item {}", n + 1));
            lines.update_line(id, LineField::Spares, "100");
        }
        let totals = compute_totals(lines.lines());
        let form = FormRecord::dated(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        DocumentSnapshot::project(&form, &lines, &totals, &WorkshopProfile::default())
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Front Bumper", 20), "Front Bumper");
        assert_eq!(truncate("Front Bumper Assembly", 10), "Front Bu..");
        assert_eq!(truncate("abcdef", 2), "..");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap("   ", 5).is_empty());
        for line in wrap("12/4, Gandhi Street, Peelamedu, Coimbatore 641004", 16) {
            assert!(line.chars().count() <= 16);
        }
    }

    #[test]
    fn test_layout_is_at_least_a4() {
        let page = PageSettings::default();
        let layout = compose(&snapshot(2), &page, None);
        assert_eq!(layout.width, 794);
        assert_eq!(layout.height, page.min_height_px());
        assert!(layout.assets().is_empty());
    }

    #[test]
    fn test_one_text_row_per_printed_line() {
        let layout = compose(&snapshot(3), &PageSettings::default(), None);
        let texts = layout.texts();
        assert!(texts.contains(&"Item 1"));
        assert!(texts.contains(&"Item 3"));
        assert!(texts.contains(&"₹300.00"));
        assert!(texts.contains(&"Authorised Signatory"));
    }

    #[test]
    fn test_long_tables_grow_the_page() {
        let page = PageSettings::default();
        let layout = compose(&snapshot(80), &page, None);
        assert!(layout.height > page.min_height_px());
    }

    #[test]
    fn test_clip_to_drops_rows_below_the_page() {
        let page = PageSettings::default();
        let mut layout = compose(&snapshot(120), &page, None);
        assert!(layout.texts().contains(&"Item 120"));

        assert!(layout.clip_to(page.min_height_px()));
        assert_eq!(layout.height, page.min_height_px());
        assert!(layout.ops.iter().all(|op| op.top() < layout.height));
        assert!(layout.texts().contains(&"Item 1"));
        assert!(!layout.texts().contains(&"Item 120"));

        let mut short = compose(&snapshot(2), &page, None);
        let ops = short.ops.len();
        assert!(!short.clip_to(page.min_height_px()));
        assert_eq!(short.ops.len(), ops);
    }

    #[test]
    fn test_logo_is_drawn_when_named() {
        let layout = compose(&snapshot(1), &PageSettings::default(), Some("logo"));
        assert_eq!(layout.assets(), vec!["logo"]);
    }

    #[test]
    fn test_ops_stay_inside_page_width() {
        let layout = compose(&snapshot(5), &PageSettings::default(), Some("logo"));
        for op in &layout.ops {
            let (x, w) = match op {
                DrawOp::Fill { x, w, .. } | DrawOp::Image { x, w, .. } => (*x, *w),
                DrawOp::Text { x, size, text, .. } => (*x, text_width(text, *size)),
            };
            assert!(x + w <= layout.width, "{op:?} overflows the page");
        }
    }
}
