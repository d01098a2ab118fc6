//! Embedded fonts and glyph rasterization helpers.
//!
//! Print output must be identical on every host, so the four DejaVu Sans
//! faces are compiled into the binary instead of being resolved from system
//! font paths. `ab_glyph` parses the faces and rasterizes outlines with
//! per-pixel coverage, which the renderer blends onto its bitmap.

use ab_glyph::{point, Font, FontRef, GlyphId, PxScale, ScaleFont};
use image::{Rgb, RgbImage};

use crate::error::ExportError;

static REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
static OBLIQUE: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Oblique.ttf");
static BOLD_OBLIQUE: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-BoldOblique.ttf");

/// The four embedded faces used for rendering.
pub struct FontSet {
    regular: FontRef<'static>,
    bold: FontRef<'static>,
    oblique: FontRef<'static>,
    bold_oblique: FontRef<'static>,
}

impl FontSet {
    /// Parse the embedded faces.
    ///
    /// # Errors
    /// [`ExportError::Render`] if an embedded face fails to parse, which
    /// indicates a corrupt build rather than bad input.
    pub fn load() -> Result<Self, ExportError> {
        let parse = |bytes: &'static [u8], name: &str| {
            FontRef::try_from_slice(bytes).map_err(|e| ExportError::Render {
                detail: format!("embedded font '{name}' failed to parse: {e}"),
            })
        };
        Ok(Self {
            regular: parse(REGULAR, "DejaVuSans")?,
            bold: parse(BOLD, "DejaVuSans-Bold")?,
            oblique: parse(OBLIQUE, "DejaVuSans-Oblique")?,
            bold_oblique: parse(BOLD_OBLIQUE, "DejaVuSans-BoldOblique")?,
        })
    }

    /// Pick the face for a style combination.
    pub fn face(&self, bold: bool, italic: bool) -> &FontRef<'static> {
        match (bold, italic) {
            (false, false) => &self.regular,
            (true, false) => &self.bold,
            (false, true) => &self.oblique,
            (true, true) => &self.bold_oblique,
        }
    }

    /// Distance from the top of a line box to the baseline, in pixels.
    pub fn ascent(&self, size: f32) -> f32 {
        self.regular.as_scaled(PxScale::from(size)).ascent()
    }

    /// Full line box height (ascent + descent + line gap), in pixels.
    pub fn line_height(&self, size: f32) -> f32 {
        let scaled = self.regular.as_scaled(PxScale::from(size));
        scaled.height() + scaled.line_gap()
    }
}

/// Advance width of `text` at `size`, including kerning.
pub fn measure(face: &FontRef<'static>, size: f32, text: &str) -> f32 {
    let scaled = face.as_scaled(PxScale::from(size));
    let mut width = 0.0;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Draw `text` onto `img` with its baseline at `(x, baseline)`, blending
/// glyph coverage against whatever is already on the bitmap. Returns the
/// caret position after the last glyph.
pub fn draw_text(
    img: &mut RgbImage,
    face: &FontRef<'static>,
    size: f32,
    x: f32,
    baseline: f32,
    text: &str,
    color: Rgb<u8>,
) -> f32 {
    let scale = PxScale::from(size);
    let scaled = face.as_scaled(scale);
    let mut caret = x;
    let mut prev: Option<GlyphId> = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        if let Some(outlined) = face.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                    let pixel = img.get_pixel_mut(px as u32, py as u32);
                    *pixel = blend(*pixel, color, coverage);
                }
            });
        }
        caret += scaled.h_advance(id);
        prev = Some(id);
    }
    caret
}

fn blend(under: Rgb<u8>, over: Rgb<u8>, coverage: f32) -> Rgb<u8> {
    let a = coverage.clamp(0.0, 1.0);
    let mix = |u: u8, o: u8| (u as f32 * (1.0 - a) + o as f32 * a).round() as u8;
    Rgb([
        mix(under[0], over[0]),
        mix(under[1], over[1]),
        mix(under[2], over[2]),
    ])
}
