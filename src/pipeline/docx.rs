//! DOCX packaging: structural mapping into a Word document.
//!
//! Unlike the print serializer this path keeps the document reflowable:
//! headings map to Word heading styles, runs keep their formatting, and
//! tables stay real tables. Nested lists are deliberately flattened to
//! indented paragraphs with literal marker text — editors disagree wildly
//! about numbering-definition XML, and an indented `•`/`1.`/`i.` paragraph
//! looks identical everywhere while remaining editable.
//!
//! Mapping happens in two steps: tree → [`PackageElement`]s (pure, easily
//! tested), then elements → `docx-rs` document → ZIP bytes.

use std::io::Cursor;

use docx_rs::{
    Docx, PageMargin, Paragraph, Run, RunFonts, Style, StyleType, Table as DocxTable,
    TableCell, TableRow as DocxTableRow,
};
use tracing::debug;

use crate::config::ExportConfig;
use crate::document::{marker_glyph, DocumentNode, DocumentTree, List, TableRow, TextRun};
use crate::error::ExportError;
use crate::pipeline::render::parse_color;

/// Indent step per list nesting level, in twips (1/20 pt).
const INDENT_STEP_TWIPS: i32 = 720;

/// Word heading style sizes in half-points, indexed by `level - 1`.
const HEADING_SIZES_HALF_PT: [usize; 6] = [48, 36, 28, 26, 24, 22];

/// Flat, package-ready view of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageElement {
    Heading {
        level: u8,
        runs: Vec<TextRun>,
    },
    Paragraph {
        runs: Vec<TextRun>,
        /// `Some(depth)` for flattened list items; `None` for body text.
        indent_level: Option<usize>,
    },
    Table {
        rows: Vec<TableRow>,
    },
}

/// Map the tree to package elements, flattening nested lists.
pub fn map_to_elements(tree: &DocumentTree) -> Vec<PackageElement> {
    let mut elements = Vec::with_capacity(tree.len());
    for node in &tree.nodes {
        match node {
            DocumentNode::Heading { level, runs } => elements.push(PackageElement::Heading {
                level: (*level).clamp(1, 6),
                runs: runs.clone(),
            }),
            DocumentNode::Paragraph { runs } => elements.push(PackageElement::Paragraph {
                runs: runs.clone(),
                indent_level: None,
            }),
            DocumentNode::List(list) => flatten_list(list, 0, &mut elements),
            DocumentNode::Table { rows } => elements.push(PackageElement::Table {
                rows: rows.clone(),
            }),
            DocumentNode::Embedded { .. } => {
                debug!("skipping embedded node in package mapping");
            }
        }
    }
    elements
}

fn flatten_list(list: &List, depth: usize, elements: &mut Vec<PackageElement>) {
    for (i, item) in list.items.iter().enumerate() {
        if !item.runs.is_empty() {
            let mut runs = Vec::with_capacity(item.runs.len() + 1);
            runs.push(TextRun::plain(format!("{} ", marker_glyph(list.style, i))));
            runs.extend(item.runs.iter().cloned());
            elements.push(PackageElement::Paragraph {
                runs,
                indent_level: Some(depth),
            });
        }
        if let Some(nested) = &item.nested {
            flatten_list(nested, depth + 1, elements);
        }
    }
}

/// Package the tree into DOCX bytes.
///
/// # Errors
/// [`ExportError::Packaging`] when the tree maps to no content or the ZIP
/// writer fails.
pub fn assemble(tree: &DocumentTree, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    let elements = map_to_elements(tree);
    if elements.is_empty() {
        return Err(ExportError::Packaging {
            detail: "document maps to no package content".to_string(),
        });
    }
    let element_count = elements.len();

    let mut docx = Docx::new()
        .page_size(mm_to_twips(config.page_width_mm) as u32, mm_to_twips(config.page_height_mm) as u32)
        .page_margin(
            PageMargin::new()
                .top(mm_to_twips(config.margin_top_mm))
                .right(mm_to_twips(config.margin_right_mm))
                .bottom(mm_to_twips(config.margin_bottom_mm))
                .left(mm_to_twips(config.margin_left_mm)),
        );
    for level in 1..=6u8 {
        docx = docx.add_style(heading_style(level));
    }

    for element in elements {
        match element {
            PackageElement::Heading { level, runs } => {
                let mut p = Paragraph::new().style(&format!("Heading{level}"));
                for run in &runs {
                    p = p.add_run(to_docx_run(run));
                }
                docx = docx.add_paragraph(p);
            }
            PackageElement::Paragraph { runs, indent_level } => {
                let mut p = Paragraph::new();
                if let Some(depth) = indent_level {
                    p = p.indent(
                        Some(INDENT_STEP_TWIPS * (depth as i32 + 1)),
                        None,
                        None,
                        None,
                    );
                }
                for run in &runs {
                    p = p.add_run(to_docx_run(run));
                }
                docx = docx.add_paragraph(p);
            }
            PackageElement::Table { rows } => {
                docx = docx.add_table(to_docx_table(rows));
            }
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ExportError::Packaging {
            detail: format!("DOCX writer failed: {e}"),
        })?;
    let bytes = cursor.into_inner();
    debug!(elements = element_count, bytes = bytes.len(), "assembled DOCX");
    Ok(bytes)
}

fn mm_to_twips(mm: f32) -> i32 {
    (mm / 25.4 * 1440.0).round() as i32
}

fn heading_style(level: u8) -> Style {
    Style::new(format!("Heading{level}"), StyleType::Paragraph)
        .name(format!("Heading {level}"))
        .size(HEADING_SIZES_HALF_PT[(level - 1) as usize])
        .bold()
}

fn to_docx_run(run: &TextRun) -> Run {
    let mut r = Run::new().add_text(run.text.as_str());
    if run.bold {
        r = r.bold();
    }
    if run.italic {
        r = r.italic();
    }
    if run.underline {
        r = r.underline("single");
    }
    if run.strikethrough {
        r = r.strike();
    }
    if let Some(color) = &run.color {
        let rgb = parse_color(Some(color));
        r = r.color(format!("{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2]));
    }
    if let Some(family) = &run.font_family {
        r = r.fonts(RunFonts::new().ascii(family));
    }
    r
}

/// Rows keep exactly the cells they have; no padding to a rectangle.
fn to_docx_table(rows: Vec<TableRow>) -> DocxTable {
    let docx_rows = rows
        .into_iter()
        .map(|row| {
            let cells = row
                .cells
                .into_iter()
                .map(|cell| {
                    let mut p = Paragraph::new();
                    for run in &cell {
                        let mut r = to_docx_run(run);
                        if row.is_header {
                            r = r.bold();
                        }
                        p = p.add_run(r);
                    }
                    TableCell::new().add_paragraph(p)
                })
                .collect();
            DocxTableRow::new(cells)
        })
        .collect();
    DocxTable::new(docx_rows)
}
