//! Structural parsing: normalized markdown → [`DocumentTree`].
//!
//! Built on `pulldown-cmark` with the table and strikethrough extensions
//! enabled. Parsing never fails: anything the grammar does not recognise
//! flows through as plain paragraph text, so a malformed document degrades
//! instead of erroring.
//!
//! Two post-parse touches go beyond stock markdown:
//!
//! * Adjacent text runs with identical styling are merged, so `**a** **b**`
//!   does not produce a fragmented run list.
//! * A paragraph whose lines *all* look like `i. …`/`ii. …` (or `a.`/`b.`)
//!   is promoted to a roman- or alpha-styled list. Markdown has no syntax
//!   for these, but extracted legal and academic text uses them constantly.

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::document::{
    DocumentNode, DocumentTree, List, ListItem, ListStyle, TableRow, TextRun,
};

/// Parse normalized markdown into a structural tree.
///
/// Infallible: unrecognized constructs degrade to plain paragraphs, and raw
/// markup is captured as [`DocumentNode::Embedded`] for the sanitizer to
/// remove.
pub fn parse(markdown: &str) -> DocumentTree {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = Builder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.handle(event);
    }
    DocumentTree::new(builder.nodes)
}

#[derive(Default)]
struct ListBuilder {
    ordered: bool,
    items: Vec<ListItem>,
    current: Option<ListItem>,
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<TableRow>,
    cells: Vec<Vec<TextRun>>,
}

#[derive(Default)]
struct Builder {
    nodes: Vec<DocumentNode>,
    runs: Vec<TextRun>,
    bold_depth: u32,
    italic_depth: u32,
    strike_depth: u32,
    list_stack: Vec<ListBuilder>,
    table: Option<TableBuilder>,
    html_block: Option<String>,
}

impl Builder {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) => {
                if let Some(buf) = self.html_block.as_mut() {
                    buf.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            // Inline code keeps its text but drops the code styling; the
            // document model has no monospace run.
            Event::Code(text) => self.push_text(&text),
            Event::SoftBreak | Event::HardBreak => self.push_text("\n"),
            Event::Html(html) => {
                if let Some(buf) = self.html_block.as_mut() {
                    buf.push_str(&html);
                } else {
                    self.nodes.push(DocumentNode::Embedded {
                        raw: html.to_string(),
                    });
                }
            }
            Event::InlineHtml(html) => {
                self.nodes.push(DocumentNode::Embedded {
                    raw: html.to_string(),
                });
            }
            // Rules, footnotes, task markers: nothing to place in the tree.
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::List(start) => {
                // A tight item's text is still pending when its sub-list
                // starts; settle it into the item before nesting deeper.
                let runs = self.take_runs();
                if let Some(list) = self.list_stack.last_mut() {
                    if let Some(item) = list.current.as_mut() {
                        append_item_runs(item, runs);
                    }
                } else {
                    self.finish_paragraph(runs);
                }
                self.list_stack.push(ListBuilder {
                    ordered: start.is_some(),
                    ..Default::default()
                });
            }
            Tag::Item => {
                if let Some(list) = self.list_stack.last_mut() {
                    list.current = Some(ListItem {
                        runs: Vec::new(),
                        nested: None,
                    });
                }
            }
            Tag::Table(_) => {
                self.table = Some(TableBuilder::default());
            }
            Tag::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.cells.clear();
                }
            }
            Tag::TableRow => {
                if let Some(t) = self.table.as_mut() {
                    t.cells.clear();
                }
            }
            Tag::Strong => self.bold_depth += 1,
            Tag::Emphasis => self.italic_depth += 1,
            Tag::Strikethrough => self.strike_depth += 1,
            Tag::HtmlBlock => self.html_block = Some(String::new()),
            // Paragraph and heading boundaries are handled on End; links
            // and images contribute only their text.
            _ => {}
        }
    }

    fn end(&mut self, end: TagEnd) {
        match end {
            TagEnd::Heading(level) => {
                let runs = self.take_runs();
                if !runs_are_blank(&runs) {
                    self.nodes.push(DocumentNode::Heading {
                        level: heading_level(level),
                        runs,
                    });
                }
            }
            TagEnd::Paragraph => {
                let runs = self.take_runs();
                self.finish_paragraph(runs);
            }
            TagEnd::Item => {
                let runs = self.take_runs();
                if let Some(list) = self.list_stack.last_mut() {
                    if let Some(mut item) = list.current.take() {
                        append_item_runs(&mut item, runs);
                        list.items.push(item);
                    }
                }
            }
            TagEnd::List(_) => {
                if let Some(built) = self.list_stack.pop() {
                    let list = List {
                        ordered: built.ordered,
                        style: if built.ordered {
                            ListStyle::Decimal
                        } else {
                            ListStyle::Bullet
                        },
                        items: built.items,
                    };
                    if let Some(parent) = self.list_stack.last_mut() {
                        // A sub-list closes while its introducing item is
                        // still open; hang it off that item.
                        if let Some(item) = parent.current.as_mut() {
                            item.nested = Some(Box::new(list));
                            return;
                        }
                        if let Some(item) = parent.items.last_mut() {
                            item.nested = Some(Box::new(list));
                            return;
                        }
                    }
                    if !list.items.is_empty() {
                        self.nodes.push(DocumentNode::List(list));
                    }
                }
            }
            TagEnd::TableCell => {
                let runs = self.take_runs();
                if let Some(t) = self.table.as_mut() {
                    t.cells.push(runs);
                }
            }
            TagEnd::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.rows.push(TableRow {
                        is_header: true,
                        cells: std::mem::take(&mut t.cells),
                    });
                }
            }
            TagEnd::TableRow => {
                if let Some(t) = self.table.as_mut() {
                    t.rows.push(TableRow {
                        is_header: false,
                        cells: std::mem::take(&mut t.cells),
                    });
                }
            }
            TagEnd::Table => {
                if let Some(t) = self.table.take() {
                    if !t.rows.is_empty() {
                        self.nodes.push(DocumentNode::Table { rows: t.rows });
                    }
                }
            }
            TagEnd::Strong => self.bold_depth = self.bold_depth.saturating_sub(1),
            TagEnd::Emphasis => self.italic_depth = self.italic_depth.saturating_sub(1),
            TagEnd::Strikethrough => self.strike_depth = self.strike_depth.saturating_sub(1),
            TagEnd::CodeBlock => {
                let runs = self.take_runs();
                // Code blocks stay literal: no list promotion, newlines kept
                // as hard breaks for the renderer.
                if !runs_are_blank(&runs) {
                    self.nodes.push(DocumentNode::Paragraph { runs });
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(raw) = self.html_block.take() {
                    if !raw.trim().is_empty() {
                        self.nodes.push(DocumentNode::Embedded { raw });
                    }
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let run = TextRun {
            text: text.to_string(),
            bold: self.bold_depth > 0,
            italic: self.italic_depth > 0,
            strikethrough: self.strike_depth > 0,
            ..TextRun::default()
        };
        if let Some(last) = self.runs.last_mut() {
            if last.same_style(&run) {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(run);
    }

    fn take_runs(&mut self) -> Vec<TextRun> {
        std::mem::take(&mut self.runs)
    }

    /// Close a paragraph: inside a list item the runs belong to that item;
    /// at the top level the paragraph may be promoted to a roman/alpha list.
    fn finish_paragraph(&mut self, runs: Vec<TextRun>) {
        if runs_are_blank(&runs) {
            return;
        }
        if let Some(list) = self.list_stack.last_mut() {
            if let Some(item) = list.current.as_mut() {
                append_item_runs(item, runs);
                return;
            }
        }
        if let Some(list) = promote_manual_list(&runs) {
            self.nodes.push(DocumentNode::List(list));
            return;
        }
        self.nodes.push(DocumentNode::Paragraph {
            runs: soften_breaks(runs),
        });
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn runs_are_blank(runs: &[TextRun]) -> bool {
    runs.iter().all(|r| r.text.trim().is_empty())
}

/// Append a closed paragraph's runs to a list item, separating multiple
/// paragraphs of a loose item with a space.
fn append_item_runs(item: &mut ListItem, runs: Vec<TextRun>) {
    if runs.is_empty() {
        return;
    }
    let mut runs = soften_breaks(runs);
    if !item.runs.is_empty() {
        item.runs.push(TextRun::plain(" "));
    }
    item.runs.append(&mut runs);
}

/// Replace soft line breaks with spaces inside paragraph runs.
fn soften_breaks(mut runs: Vec<TextRun>) -> Vec<TextRun> {
    for run in &mut runs {
        if run.text.contains('\n') {
            run.text = run.text.replace('\n', " ");
        }
    }
    runs
}

static RE_ROMAN_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(x{0,3}(?:ix|iv|v?i{0,3}))\.\s+(\S.*)$").unwrap());
static RE_ALPHA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z])\.\s+(\S.*)$").unwrap());

/// Promote a plain multi-line paragraph whose every line carries a roman or
/// single-letter marker into a styled ordered list. Requires at least two
/// lines so an isolated "v. something" sentence is left alone, and only
/// unstyled runs, so promotion never discards formatting.
fn promote_manual_list(runs: &[TextRun]) -> Option<List> {
    if !runs.iter().all(|r| r.same_style(&TextRun::default())) {
        return None;
    }
    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }

    let extract = |re: &Regex| -> Option<Vec<ListItem>> {
        lines
            .iter()
            .map(|line| {
                let caps = re.captures(line)?;
                if caps[1].is_empty() {
                    return None;
                }
                Some(ListItem {
                    runs: vec![TextRun::plain(&caps[2])],
                    nested: None,
                })
            })
            .collect()
    };

    if let Some(items) = extract(&RE_ROMAN_LINE) {
        return Some(List {
            ordered: true,
            style: ListStyle::Roman,
            items,
        });
    }
    if let Some(items) = extract(&RE_ALPHA_LINE) {
        return Some(List {
            ordered: true,
            style: ListStyle::Alpha,
            items,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_text(runs: &[TextRun]) -> String {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn bullet_list_parses_in_order() {
        let tree = parse("things to do:\n- alpha\n- beta\n- gamma");
        assert_eq!(tree.len(), 2);
        match &tree.nodes[1] {
            DocumentNode::List(list) => {
                assert!(!list.ordered);
                assert_eq!(list.style, ListStyle::Bullet);
                let texts: Vec<String> =
                    list.items.iter().map(|i| plain_text(&i.runs)).collect();
                assert_eq!(texts, ["alpha", "beta", "gamma"]);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn ordered_list_is_decimal() {
        let tree = parse("1. one\n2. two");
        match &tree.nodes[0] {
            DocumentNode::List(list) => {
                assert!(list.ordered);
                assert_eq!(list.style, ListStyle::Decimal);
                assert_eq!(list.items.len(), 2);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn nested_list_hangs_off_introducing_item() {
        let tree = parse("- top\n  - sub one\n  - sub two\n- second");
        match &tree.nodes[0] {
            DocumentNode::List(list) => {
                assert_eq!(list.items.len(), 2);
                let nested = list.items[0].nested.as_ref().expect("nested list");
                assert_eq!(nested.items.len(), 2);
                assert_eq!(plain_text(&nested.items[1].runs), "sub two");
                assert!(list.items[1].nested.is_none());
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn table_rows_and_header_flag() {
        let tree = parse("|h1|h2|\n|---|---|\n|x|y|\n|p|q|");
        match &tree.nodes[0] {
            DocumentNode::Table { rows } => {
                assert_eq!(rows.len(), 3);
                assert!(rows[0].is_header);
                assert!(!rows[1].is_header);
                assert_eq!(rows[0].cells.len(), 2);
                assert_eq!(plain_text(&rows[0].cells[1]), "h2");
                assert_eq!(plain_text(&rows[2].cells[0]), "p");
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn inline_styles_set_run_flags() {
        let tree = parse("**bold** and *italic* and ~~gone~~");
        match &tree.nodes[0] {
            DocumentNode::Paragraph { runs } => {
                assert!(runs[0].bold && !runs[0].italic);
                assert_eq!(runs[0].text, "bold");
                let italic = runs.iter().find(|r| r.italic).expect("italic run");
                assert_eq!(italic.text, "italic");
                let struck = runs.iter().find(|r| r.strikethrough).expect("struck run");
                assert_eq!(struck.text, "gone");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_same_style_runs_merge() {
        let tree = parse("plain one two three");
        match &tree.nodes[0] {
            DocumentNode::Paragraph { runs } => assert_eq!(runs.len(), 1),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn roman_lines_promote_to_roman_list() {
        let tree = parse("i. first\nii. second\niii. third");
        match &tree.nodes[0] {
            DocumentNode::List(list) => {
                assert!(list.ordered);
                assert_eq!(list.style, ListStyle::Roman);
                assert_eq!(plain_text(&list.items[2].runs), "third");
            }
            other => panic!("expected roman list, got {other:?}"),
        }
    }

    #[test]
    fn alpha_lines_promote_to_alpha_list() {
        let tree = parse("a. one\nb. two");
        match &tree.nodes[0] {
            DocumentNode::List(list) => {
                assert_eq!(list.style, ListStyle::Alpha);
                assert_eq!(list.items.len(), 2);
            }
            other => panic!("expected alpha list, got {other:?}"),
        }
    }

    #[test]
    fn single_roman_line_stays_a_paragraph() {
        let tree = parse("v. the fifth clause applies");
        assert!(matches!(tree.nodes[0], DocumentNode::Paragraph { .. }));
    }

    #[test]
    fn spaceless_hash_is_not_a_heading() {
        let tree = parse("#Intro");
        match &tree.nodes[0] {
            DocumentNode::Paragraph { runs } => assert_eq!(plain_text(runs), "#Intro"),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn heading_levels_map() {
        let tree = parse("# One\n\n### Three");
        match (&tree.nodes[0], &tree.nodes[1]) {
            (
                DocumentNode::Heading { level: 1, .. },
                DocumentNode::Heading { level: 3, .. },
            ) => {}
            other => panic!("unexpected nodes: {other:?}"),
        }
    }

    #[test]
    fn html_block_becomes_embedded() {
        let tree = parse("before\n\n<div>\nraw stuff\n</div>\n\nafter");
        assert!(tree
            .nodes
            .iter()
            .any(|n| matches!(n, DocumentNode::Embedded { .. })));
    }

    #[test]
    fn soft_breaks_become_spaces() {
        let tree = parse("line one\nline two");
        match &tree.nodes[0] {
            DocumentNode::Paragraph { runs } => {
                assert_eq!(plain_text(runs), "line one line two");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn junk_input_never_panics() {
        for junk in ["|||", "####### eight", "- \n- \n", "~~~~", "**", "> > >"] {
            let _ = parse(junk);
        }
    }
}
