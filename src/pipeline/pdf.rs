//! PDF assembly: one page per rendered segment.
//!
//! Each [`PageSegment`] becomes a full PDF page with the segment bitmap
//! placed inside the configured margins. Every page puts its band at the
//! same top offset, so content flows across page boundaries exactly where
//! the slicer cut it.

use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument, Px,
};
use tracing::debug;

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::pipeline::render::PageSegment;

/// Assemble rendered segments into a complete PDF.
///
/// # Errors
/// [`ExportError::Render`] when there are no segments or the writer fails.
pub fn assemble(segments: Vec<PageSegment>, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    if segments.is_empty() {
        return Err(ExportError::Render {
            detail: "no rendered pages to assemble".to_string(),
        });
    }

    let page_w = Mm(config.page_width_mm);
    let page_h = Mm(config.page_height_mm);
    // Bitmap pixels are CSS pixels times the raster scale, so this dpi maps
    // them back to their intended physical size.
    let dpi = 96.0 * config.raster_scale;

    let (doc, first_page, first_layer) =
        PdfDocument::new(config.title.as_str(), page_w, page_h, "content");
    let page_count = segments.len();

    for (i, segment) in segments.into_iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(page_w, page_h, "content");
            doc.get_page(page).get_layer(layer)
        };

        let (width, height) = (segment.image.width(), segment.image.height());
        let xobject = ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: segment.image.into_raw(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        };

        // PDF origin is bottom-left; anchor the band flush to the top margin.
        Image::from(xobject).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(config.margin_left_mm)),
                translate_y: Some(Mm(
                    config.page_height_mm - config.margin_top_mm - segment.height_mm,
                )),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    let bytes = doc.save_to_bytes().map_err(|e| ExportError::Render {
        detail: format!("PDF writer failed: {e}"),
    })?;
    debug!(pages = page_count, bytes = bytes.len(), "assembled PDF");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn segment(w: u32, h: u32, config: &ExportConfig) -> PageSegment {
        let ppm = crate::pipeline::render::CSS_PX_PER_MM * config.raster_scale;
        PageSegment {
            image: RgbImage::from_pixel(w, h, Rgb([200, 200, 200])),
            width_mm: w as f32 / ppm,
            height_mm: h as f32 / ppm,
            y_offset_mm: 0.0,
        }
    }

    #[test]
    fn produces_pdf_header() {
        let config = ExportConfig::default();
        let bytes = assemble(vec![segment(100, 80, &config)], &config).unwrap();
        assert!(bytes.starts_with(b"%PDF"), "missing PDF magic");
        assert!(bytes.len() > 500);
    }

    #[test]
    fn multiple_segments_grow_the_document() {
        let config = ExportConfig::default();
        let one = assemble(vec![segment(100, 80, &config)], &config).unwrap();
        let two = assemble(
            vec![segment(100, 80, &config), segment(100, 80, &config)],
            &config,
        )
        .unwrap();
        assert!(two.len() > one.len());
    }

    #[test]
    fn no_segments_is_an_error() {
        let err = assemble(vec![], &ExportConfig::default());
        assert!(matches!(err, Err(ExportError::Render { .. })));
    }
}
