//! Print rendering: layout, rasterization, and page slicing.
//!
//! The print serializer lays the whole sanitized tree out as one continuous
//! bitmap at a fixed CSS-pixel density (96 px/inch × `raster_scale`), then
//! slices that bitmap into page-height bands. Pagination is therefore purely
//! arithmetic: `pages = ceil(content_height / band_height)`, and a block can
//! split mid-line across a page boundary exactly like a browser's print
//! view. Visual fidelity of the continuous layout wins over typographic
//! widow/orphan control; that trade-off is the point of this serializer,
//! with the package serializer covering the reflowable case.
//!
//! Layout runs twice over the tree with identical arithmetic: a measuring
//! pass that only advances the cursor, then a drawing pass onto a bitmap
//! sized by the first pass.

use image::{imageops, Rgb, RgbImage};
use tracing::debug;

use crate::config::ExportConfig;
use crate::document::{marker_glyph, DocumentNode, DocumentTree, List, TableRow, TextRun};
use crate::error::ExportError;
use crate::pipeline::fonts::{draw_text, measure, FontSet};

/// CSS reference density: 96 px per inch, 25.4 mm per inch.
pub const CSS_PX_PER_MM: f32 = 96.0 / 25.4;

/// Heading font sizes in CSS pixels, indexed by `level - 1`.
const HEADING_SIZES_PX: [f32; 6] = [32.0, 28.0, 24.0, 20.0, 18.0, 16.0];
/// Vertical gap between block nodes, CSS pixels.
const BLOCK_GAP_PX: f32 = 10.0;
/// Gap between list items, CSS pixels.
const ITEM_GAP_PX: f32 = 4.0;
/// Indent per list nesting level, CSS pixels.
const LIST_INDENT_PX: f32 = 24.0;
/// Inner padding of a table cell, CSS pixels.
const CELL_PAD_PX: f32 = 6.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const BORDER_GRAY: Rgb<u8> = Rgb([160, 160, 160]);
const HEADER_BG: Rgb<u8> = Rgb([240, 240, 240]);

/// One page-height band cropped from the continuous layout bitmap.
pub struct PageSegment {
    pub image: RgbImage,
    pub width_mm: f32,
    pub height_mm: f32,
    /// Vertical offset of this band within the continuous layout, in mm.
    pub y_offset_mm: f32,
}

impl PageSegment {
    /// Encode the band as PNG, for page previews and debugging.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| ExportError::Render {
                detail: format!("PNG encode failed: {e}"),
            })?;
        Ok(buf)
    }
}

/// Render the tree to page segments.
///
/// # Errors
/// [`ExportError::Render`] when the document produces no visible content or
/// the embedded fonts fail to load.
pub fn render_to_pages(
    tree: &DocumentTree,
    config: &ExportConfig,
) -> Result<Vec<PageSegment>, ExportError> {
    let fonts = FontSet::load()?;
    let full = rasterize(tree, config, &fonts)?;
    let segments = slice_into_pages(full, config);
    debug!(pages = segments.len(), "sliced layout into pages");
    Ok(segments)
}

fn rasterize(
    tree: &DocumentTree,
    config: &ExportConfig,
    fonts: &FontSet,
) -> Result<RgbImage, ExportError> {
    let scale = config.raster_scale;
    let width_px = (config.content_width_mm() * CSS_PX_PER_MM * scale).round();
    if width_px < 1.0 {
        return Err(ExportError::Render {
            detail: "printable width is below one pixel".to_string(),
        });
    }

    let mut pass = Walker::new(fonts, config, width_px, None);
    pass.walk(tree);
    let height = pass.y;
    if height <= 0.0 {
        return Err(ExportError::Render {
            detail: "document produced no visible content".to_string(),
        });
    }

    let mut img = RgbImage::from_pixel(width_px as u32, height.ceil() as u32, WHITE);
    let mut draw = Walker::new(fonts, config, width_px, Some(&mut img));
    draw.walk(tree);
    debug!(
        width_px = img.width(),
        height_px = img.height(),
        scale,
        "rasterized continuous layout"
    );
    Ok(img)
}

/// Slice the continuous bitmap into page-height bands.
///
/// The band height is the printable area of one page at the raster density.
/// A trailing sliver at most `slice_epsilon_mm` tall is discarded rather
/// than emitted as a near-empty final page.
fn slice_into_pages(full: RgbImage, config: &ExportConfig) -> Vec<PageSegment> {
    let ppm = CSS_PX_PER_MM * config.raster_scale;
    let band_px = ((config.content_height_mm() * ppm).floor() as u32).max(1);
    let eps_px = config.slice_epsilon_mm * ppm;
    let width_mm = full.width() as f32 / ppm;

    let mut segments = Vec::new();
    let mut y = 0u32;
    while y < full.height() {
        let remaining = full.height() - y;
        if !segments.is_empty() && (remaining as f32) <= eps_px {
            break;
        }
        let slice_h = remaining.min(band_px);
        let image = imageops::crop_imm(&full, 0, y, full.width(), slice_h).to_image();
        segments.push(PageSegment {
            image,
            width_mm,
            height_mm: slice_h as f32 / ppm,
            y_offset_mm: y as f32 / ppm,
        });
        y += slice_h;
    }
    segments
}

/// Tree walker shared by the measure and draw passes. With `canvas == None`
/// only the cursor advances; the arithmetic is identical either way, which
/// is what keeps the two passes in agreement.
struct Walker<'a> {
    fonts: &'a FontSet,
    canvas: Option<&'a mut RgbImage>,
    scale: f32,
    width: f32,
    base: f32,
    y: f32,
}

impl<'a> Walker<'a> {
    fn new(
        fonts: &'a FontSet,
        config: &ExportConfig,
        width_px: f32,
        canvas: Option<&'a mut RgbImage>,
    ) -> Self {
        Self {
            fonts,
            canvas,
            scale: config.raster_scale,
            width: width_px,
            base: config.base_font_px * config.raster_scale,
            y: 0.0,
        }
    }

    fn walk(&mut self, tree: &DocumentTree) {
        let gap = BLOCK_GAP_PX * self.scale;
        for node in &tree.nodes {
            match node {
                DocumentNode::Heading { level, runs } => {
                    let idx = ((*level).clamp(1, 6) - 1) as usize;
                    let size = HEADING_SIZES_PX[idx] * self.scale;
                    let h = self.flow_runs(runs, size, 0.0, self.width, self.y, true);
                    self.y += h + gap;
                }
                DocumentNode::Paragraph { runs } => {
                    let h = self.flow_runs(runs, self.base, 0.0, self.width, self.y, true);
                    self.y += h + gap;
                }
                DocumentNode::List(list) => {
                    self.list(list, 0);
                    self.y += gap;
                }
                DocumentNode::Table { rows } => {
                    self.table(rows);
                    self.y += gap;
                }
                // Removed by the sanitizer; tolerated here so rendering an
                // unsanitized tree degrades to skipping, not panicking.
                DocumentNode::Embedded { .. } => {}
            }
        }
    }

    fn list(&mut self, list: &List, depth: usize) {
        let size = self.base;
        let indent = LIST_INDENT_PX * self.scale * (depth + 1) as f32;
        let item_gap = ITEM_GAP_PX * self.scale;
        let ascent = self.fonts.ascent(size);

        for (i, item) in list.items.iter().enumerate() {
            if !item.runs.is_empty() {
                let marker = marker_glyph(list.style, i);
                let face = self.fonts.face(false, false);
                let marker_w = measure(face, size, &marker) + 6.0 * self.scale;
                if let Some(img) = self.canvas.as_deref_mut() {
                    draw_text(img, face, size, indent, self.y + ascent, &marker, BLACK);
                }
                let x0 = indent + marker_w;
                let h = self.flow_runs(&item.runs, size, x0, self.width - x0, self.y, true);
                self.y += h + item_gap;
            }
            if let Some(nested) = &item.nested {
                self.list(nested, depth + 1);
            }
        }
    }

    fn table(&mut self, rows: &[TableRow]) {
        let cols = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        if cols == 0 {
            return;
        }
        let size = self.base;
        let pad = CELL_PAD_PX * self.scale;
        let col_w = self.width / cols as f32;
        let min_h = self.fonts.line_height(size) + 2.0 * pad;

        for row in rows {
            // Header cells render bold, so they must be measured bold too or
            // the drawn text can wrap one line further than the row height
            // accounts for.
            let cells: Vec<Vec<TextRun>> = row
                .cells
                .iter()
                .map(|cell| {
                    if row.is_header {
                        cell.iter()
                            .map(|r| TextRun {
                                bold: true,
                                ..r.clone()
                            })
                            .collect()
                    } else {
                        cell.clone()
                    }
                })
                .collect();

            // Row height is set by the tallest cell after wrapping.
            let mut row_h = min_h;
            for cell in &cells {
                let h = self.flow_runs(cell, size, 0.0, col_w - 2.0 * pad, self.y, false);
                row_h = row_h.max(h + 2.0 * pad);
            }

            // Cell counts may differ between rows; only the cells that exist
            // get backgrounds, borders, and text.
            for (ci, cell) in cells.iter().enumerate() {
                let x0 = ci as f32 * col_w;
                if row.is_header {
                    self.fill_rect(x0, self.y, col_w, row_h, HEADER_BG);
                }
                self.stroke_rect(x0, self.y, col_w, row_h, BORDER_GRAY);
                self.flow_runs(cell, size, x0 + pad, col_w - 2.0 * pad, self.y + pad, true);
            }
            self.y += row_h;
        }
    }

    /// Greedy word-wrap of styled runs into lines of at most `max_w` pixels,
    /// starting at vertical position `top`. Returns the height consumed.
    /// `'\n'` inside a run forces a line break (code blocks rely on this).
    /// Draws only when `draw` is set and a canvas is present.
    fn flow_runs(
        &mut self,
        runs: &[TextRun],
        size: f32,
        x0: f32,
        max_w: f32,
        top: f32,
        draw: bool,
    ) -> f32 {
        let line_h = self.fonts.line_height(size);
        let ascent = self.fonts.ascent(size);
        let mut line_top = top;
        let mut caret = x0;
        let mut any = false;

        for run in runs {
            let face = self.fonts.face(run.bold, run.italic);
            let color = parse_color(run.color.as_deref());
            let space_w = measure(face, size, " ");

            for (hi, hard) in run.text.split('\n').enumerate() {
                if hi > 0 {
                    line_top += line_h;
                    caret = x0;
                }
                let tokens: Vec<&str> = hard.split(' ').collect();
                for (ti, word) in tokens.iter().enumerate() {
                    if !word.is_empty() {
                        any = true;
                        let w = measure(face, size, word);
                        if caret > x0 && caret - x0 + w > max_w {
                            line_top += line_h;
                            caret = x0;
                        }
                        if draw {
                            if let Some(img) = self.canvas.as_deref_mut() {
                                let baseline = line_top + ascent;
                                draw_text(img, face, size, caret, baseline, word, color);
                                if run.underline {
                                    hline(img, caret, caret + w, baseline + size * 0.08, color);
                                }
                                if run.strikethrough {
                                    hline(img, caret, caret + w, baseline - size * 0.28, color);
                                }
                            }
                        }
                        caret += w;
                    }
                    if ti + 1 < tokens.len() {
                        caret += space_w;
                    }
                }
            }
        }

        if !any {
            return 0.0;
        }
        line_top + line_h - top
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb<u8>) {
        if let Some(img) = self.canvas.as_deref_mut() {
            let x1 = ((x + w) as u32).min(img.width());
            let y1 = ((y + h) as u32).min(img.height());
            for py in (y.max(0.0) as u32)..y1 {
                for px in (x.max(0.0) as u32)..x1 {
                    img.put_pixel(px, py, color);
                }
            }
        }
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb<u8>) {
        if let Some(img) = self.canvas.as_deref_mut() {
            hline(img, x, x + w, y, color);
            hline(img, x, x + w, y + h - 1.0, color);
            vline(img, x, y, y + h, color);
            vline(img, x + w - 1.0, y, y + h, color);
        }
    }
}

fn hline(img: &mut RgbImage, x0: f32, x1: f32, y: f32, color: Rgb<u8>) {
    if y < 0.0 || y as u32 >= img.height() {
        return;
    }
    let y = y as u32;
    let end = (x1 as u32).min(img.width());
    for px in (x0.max(0.0) as u32)..end {
        img.put_pixel(px, y, color);
    }
}

fn vline(img: &mut RgbImage, x: f32, y0: f32, y1: f32, color: Rgb<u8>) {
    if x < 0.0 || x as u32 >= img.width() {
        return;
    }
    let x = x as u32;
    let end = (y1 as u32).min(img.height());
    for py in (y0.max(0.0) as u32)..end {
        img.put_pixel(x, py, color);
    }
}

/// Parse a sanitized run colour. Unknown names fall back to black rather
/// than failing the export over a cosmetic value.
pub(crate) fn parse_color(value: Option<&str>) -> Rgb<u8> {
    let Some(v) = value else { return BLACK };
    if let Some(hex) = v.strip_prefix('#') {
        let expand = |c: u8| {
            let d = (c as char).to_digit(16).unwrap_or(0) as u8;
            d * 16 + d
        };
        let bytes = hex.as_bytes();
        return match bytes.len() {
            3 | 4 => Rgb([expand(bytes[0]), expand(bytes[1]), expand(bytes[2])]),
            6 | 8 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0)
                };
                Rgb([channel(0), channel(2), channel(4)])
            }
            _ => BLACK,
        };
    }
    match v.to_ascii_lowercase().as_str() {
        "white" => Rgb([255, 255, 255]),
        "red" => Rgb([220, 38, 38]),
        "green" => Rgb([22, 163, 74]),
        "blue" => Rgb([37, 99, 235]),
        "gray" | "grey" => Rgb([107, 114, 128]),
        "yellow" => Rgb([202, 138, 4]),
        "orange" => Rgb([234, 88, 12]),
        "purple" => Rgb([147, 51, 234]),
        _ => BLACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::parse;
    use crate::pipeline::sanitize::sanitize;

    fn band_px(config: &ExportConfig) -> u32 {
        let ppm = CSS_PX_PER_MM * config.raster_scale;
        ((config.content_height_mm() * ppm).floor() as u32).max(1)
    }

    #[test]
    fn layout_spanning_2_3_bands_yields_three_pages() {
        let config = ExportConfig::default();
        let band = band_px(&config);
        let h = (band as f32 * 2.3) as u32;
        let full = RgbImage::from_pixel(100, h, WHITE);

        let segments = slice_into_pages(full, &config);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments.len(), (h as f32 / band as f32).ceil() as usize);
        assert_eq!(segments[0].image.height(), band);
        assert_eq!(segments[1].image.height(), band);
        assert!(segments[2].image.height() < band);
        let offset = segments[0].height_mm + segments[1].height_mm;
        assert!((segments[2].y_offset_mm - offset).abs() < 1e-3);
    }

    #[test]
    fn exact_band_multiple_yields_exact_page_count() {
        let config = ExportConfig::default();
        let band = band_px(&config);
        let full = RgbImage::from_pixel(50, band * 2, WHITE);
        assert_eq!(slice_into_pages(full, &config).len(), 2);
    }

    #[test]
    fn sub_epsilon_sliver_is_not_a_page() {
        let config = ExportConfig::builder()
            .slice_epsilon_mm(1.0)
            .build()
            .unwrap();
        let band = band_px(&config);
        // 3 px past the band boundary is well under a 1 mm tolerance.
        let full = RgbImage::from_pixel(50, band + 3, WHITE);
        assert_eq!(slice_into_pages(full, &config).len(), 1);
    }

    #[test]
    fn tiny_document_still_gets_one_page() {
        let config = ExportConfig::default();
        let full = RgbImage::from_pixel(50, 2, WHITE);
        assert_eq!(slice_into_pages(full, &config).len(), 1);
    }

    #[test]
    fn render_produces_ink() {
        let tree = sanitize(parse("# Title\n\nSome paragraph text."));
        let config = ExportConfig::default();
        let pages = render_to_pages(&tree, &config).unwrap();
        assert_eq!(pages.len(), 1);
        let dark = pages[0].image.pixels().filter(|p| p[0] < 128).count();
        assert!(dark > 0, "page is blank");
    }

    #[test]
    fn empty_tree_is_a_render_error() {
        let err = render_to_pages(&DocumentTree::default(), &ExportConfig::default());
        assert!(matches!(err, Err(ExportError::Render { .. })));
    }

    #[test]
    fn long_document_paginates_by_ceil() {
        let body = "lorem ipsum dolor sit amet consectetur adipiscing elit ".repeat(40);
        let many: String = (0..40).map(|i| format!("## Section {i}\n\n{body}\n\n")).collect();
        let tree = sanitize(parse(&many));
        let config = ExportConfig::default();
        let fonts = FontSet::load().unwrap();
        let full = rasterize(&tree, &config, &fonts).unwrap();
        let expected = (full.height() as f32 / band_px(&config) as f32).ceil() as usize;
        let pages = slice_into_pages(full, &config);
        assert!(pages.len() > 1);
        assert_eq!(pages.len(), expected);
    }

    #[test]
    fn small_table_alone_fits_one_page() {
        let tree = sanitize(parse("|h1|h2|\n|---|---|\n|x|y|"));
        let pages = render_to_pages(&tree, &ExportConfig::default()).unwrap();
        assert_eq!(pages.len(), 1);
        let png = pages[0].to_png_bytes().unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        let gray = pages[0]
            .image
            .pixels()
            .filter(|p| **p == BORDER_GRAY)
            .count();
        assert!(gray > 0, "no border pixels found");
    }

    #[test]
    fn header_row_is_measured_at_its_bold_width() {
        // A header cell and a body cell whose runs are already bold take the
        // same text through the same wrap arithmetic, so the rendered bitmaps
        // must come out the same height. Long text makes any measure/draw
        // width mismatch show up as an extra wrapped line.
        let text = "width of a measured header line matters here ".repeat(12);
        let header = DocumentTree::new(vec![DocumentNode::Table {
            rows: vec![TableRow {
                is_header: true,
                cells: vec![vec![TextRun::plain(&text)]],
            }],
        }]);
        let bold_body = DocumentTree::new(vec![DocumentNode::Table {
            rows: vec![TableRow {
                is_header: false,
                cells: vec![vec![TextRun {
                    bold: true,
                    ..TextRun::plain(&text)
                }]],
            }],
        }]);

        let config = ExportConfig::default();
        let fonts = FontSet::load().unwrap();
        let a = rasterize(&header, &config, &fonts).unwrap();
        let b = rasterize(&bold_body, &config, &fonts).unwrap();
        assert_eq!(a.height(), b.height());
    }

    #[test]
    fn named_and_hex_colors_parse() {
        assert_eq!(parse_color(Some("#fff")), Rgb([255, 255, 255]));
        assert_eq!(parse_color(Some("#1a2b3c")), Rgb([0x1a, 0x2b, 0x3c]));
        assert_eq!(parse_color(Some("white")), Rgb([255, 255, 255]));
        assert_eq!(parse_color(Some("no-such-color")), BLACK);
        assert_eq!(parse_color(None), BLACK);
    }
}
