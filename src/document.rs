//! The structural document tree shared by both serializers.
//!
//! A [`DocumentTree`] is built fresh per export from normalized text, is
//! immutable once built, and is consumed by exactly one serializer (or both,
//! independently, for parallel export requests). No node is shared or mutated
//! across exports — each conversion is a pure function of its input string
//! plus configuration.
//!
//! The node set is deliberately small: headings, paragraphs, lists, tables,
//! and styled text runs. Everything the parser cannot place in that set
//! degrades to a plain paragraph; raw markup that survived normalization is
//! held in [`DocumentNode::Embedded`] so the sanitizer can remove it as a
//! unit instead of string-matching tags.

use serde::{Deserialize, Serialize};

/// A styled span of text inside a block node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// CSS-style colour (`#rrggbb`, `#rgb`, or a plain name). Validated by
    /// the sanitizer; invalid values are cleared, not rendered.
    pub color: Option<String>,
    /// Font family name. Validated by the sanitizer.
    pub font_family: Option<String>,
}

impl TextRun {
    /// A run with no styling.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// True when this run carries the same style flags as `other`
    /// (text content is ignored). Used to merge adjacent runs.
    pub fn same_style(&self, other: &Self) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.strikethrough == other.strikethrough
            && self.color == other.color
            && self.font_family == other.font_family
    }
}

/// Marker style for ordered and unordered lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListStyle {
    /// `•` bullets (unordered lists).
    #[default]
    Bullet,
    /// `1.` `2.` `3.` (the common ordered style).
    Decimal,
    /// `a.` `b.` `c.`
    Alpha,
    /// `i.` `ii.` `iii.`
    Roman,
}

/// One item of a [`List`]. Nested sub-lists hang off the item that
/// introduced them, mirroring markdown indentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub runs: Vec<TextRun>,
    pub nested: Option<Box<List>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub ordered: bool,
    pub style: ListStyle,
    pub items: Vec<ListItem>,
}

/// One row of a [`DocumentNode::Table`].
///
/// Cell counts may legitimately differ between rows when the source table was
/// irregular; no padding is performed anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub is_header: bool,
    pub cells: Vec<Vec<TextRun>>,
}

/// A block-level node of the structural tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentNode {
    Heading { level: u8, runs: Vec<TextRun> },
    Paragraph { runs: Vec<TextRun> },
    List(List),
    Table { rows: Vec<TableRow> },
    /// Raw markup that survived normalization (e.g. a tag broken across
    /// lines). Never rendered: the sanitizer removes every one of these.
    Embedded { raw: String },
}

/// Ordered sequence of top-level nodes; order is document order and is
/// preserved through every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    pub nodes: Vec<DocumentNode>,
}

impl DocumentTree {
    pub fn new(nodes: Vec<DocumentNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Render an ordered-list marker for `style` at 0-based position `index`.
///
/// Bullet ignores the index. Alpha wraps after `z` (aa, ab, …) like a
/// spreadsheet column; Roman covers 1–3999 which is far beyond any sane list.
pub fn marker_glyph(style: ListStyle, index: usize) -> String {
    match style {
        ListStyle::Bullet => "•".to_string(),
        ListStyle::Decimal => format!("{}.", index + 1),
        ListStyle::Alpha => format!("{}.", to_alpha(index)),
        ListStyle::Roman => format!("{}.", to_roman(index + 1)),
    }
}

fn to_alpha(index: usize) -> String {
    let mut n = index;
    let mut out = String::new();
    loop {
        out.insert(0, (b'a' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out
}

fn to_roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, glyph) in TABLE {
        while n >= value {
            out.push_str(glyph);
            n -= value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_bullet_ignores_index() {
        assert_eq!(marker_glyph(ListStyle::Bullet, 0), "•");
        assert_eq!(marker_glyph(ListStyle::Bullet, 7), "•");
    }

    #[test]
    fn marker_decimal() {
        assert_eq!(marker_glyph(ListStyle::Decimal, 0), "1.");
        assert_eq!(marker_glyph(ListStyle::Decimal, 9), "10.");
    }

    #[test]
    fn marker_alpha_wraps() {
        assert_eq!(marker_glyph(ListStyle::Alpha, 0), "a.");
        assert_eq!(marker_glyph(ListStyle::Alpha, 25), "z.");
        assert_eq!(marker_glyph(ListStyle::Alpha, 26), "aa.");
    }

    #[test]
    fn marker_roman() {
        assert_eq!(marker_glyph(ListStyle::Roman, 0), "i.");
        assert_eq!(marker_glyph(ListStyle::Roman, 3), "iv.");
        assert_eq!(marker_glyph(ListStyle::Roman, 8), "ix.");
        assert_eq!(marker_glyph(ListStyle::Roman, 48), "xlix.");
    }

    #[test]
    fn same_style_ignores_text() {
        let a = TextRun::plain("a");
        let b = TextRun::plain("completely different");
        assert!(a.same_style(&b));

        let bold = TextRun {
            bold: true,
            ..TextRun::plain("a")
        };
        assert!(!a.same_style(&bold));
    }
}
