//! Structural sanitization of the parsed tree.
//!
//! The tree, not the string, is the unit of trust: removal happens on whole
//! nodes, so tag obfuscation that survives string matching (split tags,
//! entity tricks) cannot survive here. Exports go straight into PDF and DOCX
//! viewers, so anything executable or unrenderable must be gone by the time
//! a serializer sees the tree.
//!
//! The pass is infallible and order-preserving. It removes every
//! [`DocumentNode::Embedded`] node, drops empty runs, clears style values
//! that fail validation (colors, font names), and clamps heading levels into
//! 1–6.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::document::{DocumentNode, DocumentTree, List, TextRun};

/// Sanitize a parsed tree in place, returning the cleaned tree.
pub fn sanitize(tree: DocumentTree) -> DocumentTree {
    let mut removed = 0usize;
    let nodes = tree
        .nodes
        .into_iter()
        .filter_map(|node| match node {
            DocumentNode::Embedded { .. } => {
                removed += 1;
                None
            }
            DocumentNode::Heading { level, runs } => {
                let runs = clean_runs(runs);
                (!runs.is_empty()).then(|| DocumentNode::Heading {
                    level: level.clamp(1, 6),
                    runs,
                })
            }
            DocumentNode::Paragraph { runs } => {
                let runs = clean_runs(runs);
                (!runs.is_empty()).then_some(DocumentNode::Paragraph { runs })
            }
            DocumentNode::List(list) => {
                let list = clean_list(list);
                (!list.items.is_empty()).then_some(DocumentNode::List(list))
            }
            DocumentNode::Table { mut rows } => {
                for row in &mut rows {
                    for cell in &mut row.cells {
                        let cleaned = clean_runs(std::mem::take(cell));
                        *cell = cleaned;
                    }
                }
                (!rows.is_empty()).then_some(DocumentNode::Table { rows })
            }
        })
        .collect();

    if removed > 0 {
        debug!(removed, "removed embedded markup nodes");
    }
    DocumentTree::new(nodes)
}

fn clean_list(mut list: List) -> List {
    list.items.retain_mut(|item| {
        item.runs = clean_runs(std::mem::take(&mut item.runs));
        if let Some(nested) = item.nested.take() {
            let nested = clean_list(*nested);
            if !nested.items.is_empty() {
                item.nested = Some(Box::new(nested));
            }
        }
        !item.runs.is_empty() || item.nested.is_some()
    });
    list
}

fn clean_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    runs.into_iter()
        .filter(|r| !r.text.is_empty())
        .map(|mut run| {
            if let Some(color) = run.color.take() {
                if is_valid_color(&color) {
                    run.color = Some(color);
                }
            }
            if let Some(family) = run.font_family.take() {
                if is_valid_font_family(&family) {
                    run.font_family = Some(family);
                }
            }
            run
        })
        .collect()
}

static RE_HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9A-Fa-f]{3,4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap());

/// Hex colors and bare alphabetic names pass; anything with url(), calc(),
/// or other CSS function syntax does not.
fn is_valid_color(value: &str) -> bool {
    RE_HEX_COLOR.is_match(value)
        || (!value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()))
}

fn is_valid_font_family(value: &str) -> bool {
    !value.trim().is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '_')
}
