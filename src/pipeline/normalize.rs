//! Markdown repair: deterministic cleanup of raw extracted text.
//!
//! ## Why is normalization necessary?
//!
//! The upstream extraction service is asked for markdown but routinely emits
//! structure glued onto the preceding sentence — headings, list markers, and
//! table pipes appearing mid-line — plus residual HTML tags when the source
//! document confused it. Downstream parsing only recognises block structure
//! at line starts, so without repair a whole page can collapse into one
//! paragraph.
//!
//! This module applies ordered, deterministic regex/string rules that fix
//! those defects without touching content. Each rule is a pure function
//! (`&str → String`), independently testable, and never fails.
//!
//! ## Rule order
//!
//! Order matters: residual tags are converted before marker isolation so tag
//! output participates in spacing repair, and blank-line collapsing runs
//! after every rule that inserts newlines. Every rule's precondition ("not
//! already at line start") is false on its own output, which is what makes
//! the whole chain idempotent: `normalize(normalize(s)) == normalize(s)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all repair rules to raw extracted text.
///
/// Rules (applied in order):
/// 1. Convert residual structural HTML tags to markdown, strip the rest
/// 2. Break heading markers (`#`–`######`) onto their own line, with a
///    blank line before each heading line
/// 3. Break unordered (`-`/`*` + space) and ordered (`digits.` + space)
///    list markers onto their own line
/// 4. Break bare roman-numeral markers (`i.`, `ii.`, …) onto their own line
/// 5. Break table rows (first `|` of a line) onto their own line
/// 6. Collapse 3+ consecutive newlines down to exactly 2
/// 7. Trim leading/trailing whitespace
pub fn normalize(raw: &str) -> String {
    let s = convert_residual_markup(raw);
    let s = isolate_heading_markers(&s);
    let s = isolate_list_markers(&s);
    let s = isolate_roman_markers(&s);
    let s = isolate_table_rows(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Convert residual markup tags ─────────────────────────────────────
//
// The extraction service occasionally answers in HTML despite the prompt.
// Common structural tags are converted to their markdown equivalents; any
// remaining single-line tag is stripped. Tags broken across lines survive
// this pass on purpose — the sanitizer removes them structurally, so
// obfuscated markup cannot sneak through on a string-matching technicality.

static RE_HEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>").unwrap());
static RE_PARAGRAPH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
static RE_LIST_ITEM_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap());
static RE_LIST_WRAPPER_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?[uo]l[^>]*>").unwrap());
static RE_BOLD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:strong|b)>(.*?)</(?:strong|b)>").unwrap());
static RE_ITALIC_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:em|i)>(.*?)</(?:em|i)>").unwrap());
static RE_BREAK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static RE_ANY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?([A-Za-z][A-Za-z0-9]*)[^>\n]*>").unwrap());

fn convert_residual_markup(input: &str) -> String {
    if !input.contains('<') {
        return input.to_string();
    }
    let s = RE_HEADING_TAG.replace_all(input, |caps: &regex::Captures<'_>| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("{} {}\n\n", "#".repeat(level), caps[2].trim())
    });
    let s = RE_PARAGRAPH_TAG.replace_all(&s, "$1\n\n");
    let s = RE_LIST_ITEM_TAG.replace_all(&s, "- $1\n");
    let s = RE_LIST_WRAPPER_TAG.replace_all(&s, "\n");
    let s = RE_BOLD_TAG.replace_all(&s, "**$1**");
    let s = RE_ITALIC_TAG.replace_all(&s, "*$1*");
    let s = RE_BREAK_TAG.replace_all(&s, "\n");
    // Script and style tags are kept so the parser captures the whole
    // element (tags plus payload) as one embedded node for the sanitizer.
    // Stripping only the tags here would launder the payload into plain
    // text.
    RE_ANY_TAG
        .replace_all(&s, |caps: &regex::Captures<'_>| {
            match caps[1].to_ascii_lowercase().as_str() {
                "script" | "style" => caps[0].to_string(),
                _ => String::new(),
            }
        })
        .to_string()
}

// ── Rule 2: Isolate heading markers ──────────────────────────────────────────
//
// The preceding character class excludes `#` (so long hash runs are not
// split internally) and whitespace (intervening spaces are consumed by the
// `[ \t]*` group, leaving no trailing blanks on the split line).

static RE_INLINE_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\s#])[ \t]*(#{1,6} )").unwrap());

/// A line opening with 1–6 `#` characters is treated as a heading line even
/// without the space CommonMark requires — the extraction service often
/// omits it, and spacing repair must not depend on it.
fn is_heading_line(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes)
}

fn isolate_heading_markers(input: &str) -> String {
    // First break `text ## Heading` onto its own line …
    let s = RE_INLINE_HEADING.replace_all(input, "$1\n$2");

    // … then ensure a blank line before every heading line (unless it is
    // the very first line).
    let mut result = String::with_capacity(s.len() + 64);
    for (i, line) in s.lines().enumerate() {
        if is_heading_line(line) && i > 0 {
            let trimmed = result.trim_end_matches('\n');
            result.truncate(trimmed.len());
            result.push_str("\n\n");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

// ── Rule 3: Isolate list markers ─────────────────────────────────────────────
//
// The preceding character classes exclude the marker character itself (so
// `**bold**` and `--` runs are not split), whitespace (so indented nested
// items stay indented and no trailing blanks are left behind), and for
// ordered markers digits (so `10.` is never split between its own digits).

static RE_INLINE_DASH_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^\s-])[ \t]*(- )").unwrap());
static RE_INLINE_STAR_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\s*])[ \t]*(\* )").unwrap());
static RE_INLINE_ORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\s0-9])[ \t]*([0-9]+\. )").unwrap());

fn isolate_list_markers(input: &str) -> String {
    let s = RE_INLINE_DASH_ITEM.replace_all(input, "$1\n$2");
    let s = RE_INLINE_STAR_ITEM.replace_all(&s, "$1\n$2");
    RE_INLINE_ORDERED_ITEM.replace_all(&s, "$1\n$2").to_string()
}

// ── Rule 4: Isolate roman-numeral markers ────────────────────────────────────
//
// `i.`/`ii.`/`iv.` markers are invisible to markdown parsers but common in
// extracted legal and academic text. Putting them on their own line lets
// the structural parser promote runs of them into roman-styled lists. A
// marker must be separated from the preceding word by whitespace, so the
// trailing `i.` of "ascii. next" is not mistaken for one.

static RE_INLINE_ROMAN_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\S)[ \t]+((?:viii|vii|vi|iv|iii|ii|ix|x|v|i)\. )").unwrap()
});
static RE_ROMAN_LINE_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:viii|vii|vi|iv|iii|ii|ix|x|v|i)\. ").unwrap()
});

fn isolate_roman_markers(input: &str) -> String {
    let s = RE_INLINE_ROMAN_ITEM.replace_all(input, "$1\n$2");
    // Roman markers are plain paragraph text to a markdown parser; a blank
    // line before the first one keeps the marker run out of the preceding
    // paragraph so it can be recognised as a list.
    separate_block_starts(&s, |line| RE_ROMAN_LINE_START.is_match(line))
}

// ── Rule 5: Isolate table rows ───────────────────────────────────────────────
//
// Only the first pipe of a line that does not already start with one marks
// the start of a glued-on table row. Pipes inside an existing row are cell
// delimiters and must stay put.

static RE_INLINE_TABLE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([^|\n]+?)[ \t]*(\|)").unwrap());

fn isolate_table_rows(input: &str) -> String {
    let s = RE_INLINE_TABLE_ROW.replace_all(input, "$1\n$2");
    // A table cannot interrupt a paragraph, so the first row of a run of
    // rows also needs a blank line before it.
    separate_block_starts(&s, |line| line.starts_with('|'))
}

/// Insert a blank line before the first line of each run of lines matching
/// `is_start`, so those runs form their own block. Lines already preceded
/// by a matching line or a blank line are left alone, keeping the pass
/// idempotent.
fn separate_block_starts(input: &str, is_start: impl Fn(&str) -> bool) -> String {
    let mut result = String::with_capacity(input.len() + 16);
    let mut prev: Option<&str> = None;
    for line in input.lines() {
        if let Some(p) = prev {
            if is_start(line) && !is_start(p) && !p.is_empty() {
                result.push('\n');
            }
        }
        result.push_str(line);
        result.push('\n');
        prev = Some(line);
    }
    result
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_glued_to_text_gets_blank_line() {
        // Scenario A: no space is inserted after the marker, only spacing
        // around it is repaired.
        assert_eq!(normalize("Title\n#Intro"), "Title\n\n#Intro");
    }

    #[test]
    fn inline_heading_marker_moves_to_own_line() {
        assert_eq!(normalize("intro text ## Section"), "intro text\n\n## Section");
    }

    #[test]
    fn heading_at_start_is_untouched() {
        assert_eq!(normalize("# Title\n\nBody"), "# Title\n\nBody");
    }

    #[test]
    fn every_heading_marker_preceded_by_newline() {
        let out = normalize("a # one b ## two ### three");
        for (i, _) in out.match_indices('#') {
            if i > 0 && !out[..i].ends_with('#') {
                assert_eq!(&out[i - 1..i], "\n", "marker at {i} not at line start: {out:?}");
            }
        }
    }

    #[test]
    fn inline_list_markers_split() {
        assert_eq!(normalize("things: - a - b"), "things:\n- a\n- b");
        assert_eq!(normalize("steps 1. first 2. second"), "steps\n1. first\n2. second");
    }

    #[test]
    fn indented_nested_items_stay_indented() {
        let input = "- top\n  - nested\n  - nested two";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn bold_markup_is_not_mistaken_for_list_marker() {
        assert_eq!(normalize("**bold** and more"), "**bold** and more");
    }

    #[test]
    fn multi_digit_ordered_marker_not_split_internally() {
        assert_eq!(normalize("see 10. ten"), "see\n10. ten");
    }

    #[test]
    fn roman_markers_move_to_own_lines() {
        assert_eq!(
            normalize("i. first ii. second iii. third"),
            "i. first\nii. second\niii. third"
        );
    }

    #[test]
    fn word_final_i_is_not_a_roman_marker() {
        assert_eq!(normalize("ascii. next words"), "ascii. next words");
    }

    #[test]
    fn glued_table_row_splits_at_first_pipe_only() {
        assert_eq!(normalize("intro |h1|h2|"), "intro\n\n|h1|h2|");
    }

    #[test]
    fn table_run_is_separated_from_preceding_text() {
        assert_eq!(
            normalize("see below |a|b|\n|---|---|\n|1|2|"),
            "see below\n\n|a|b|\n|---|---|\n|1|2|"
        );
    }

    #[test]
    fn roman_run_is_separated_from_preceding_text() {
        assert_eq!(normalize("notes: i. first ii. second"), "notes:\n\ni. first\nii. second");
    }

    #[test]
    fn intact_table_is_untouched() {
        let table = "|h1|h2|\n|---|---|\n|x|y|";
        assert_eq!(normalize(table), table);
    }

    #[test]
    fn residual_markup_converts_to_markdown() {
        let out = normalize("<h2>Section</h2><p>Body text</p><ul><li>one</li><li>two</li></ul>");
        assert_eq!(out, "## Section\n\nBody text\n\n- one\n- two");
    }

    #[test]
    fn inline_style_tags_convert() {
        assert_eq!(normalize("<b>bold</b> and <em>italic</em>"), "**bold** and *italic*");
    }

    #[test]
    fn unknown_tags_are_stripped() {
        assert_eq!(normalize("text <span class=\"x\">inner</span> more"), "text inner more");
    }

    #[test]
    fn script_element_is_kept_whole_for_the_sanitizer() {
        let out = normalize("<script>alert(1)</script>");
        assert_eq!(out, "<script>alert(1)</script>");
    }

    #[test]
    fn multiline_tag_survives_for_the_sanitizer() {
        // A tag broken across lines cannot be safely string-stripped; it is
        // left for structural removal.
        let out = normalize("safe <scr\nipt>alert(1)</script> text");
        assert!(out.contains("<scr"));
    }

    #[test]
    fn excess_blank_lines_collapse_to_two() {
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn output_is_trimmed() {
        assert_eq!(normalize("  \n\nhello\n\n  "), "hello");
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t\n  "), "");
    }

    #[test]
    fn batch_separator_survives() {
        assert_eq!(normalize("first\n\n---\n\nsecond"), "first\n\n---\n\nsecond");
    }

    #[test]
    fn idempotent_on_assorted_inputs() {
        let cases = [
            "Title\n#Intro",
            "things: - a - b * c",
            "i. first ii. second",
            "intro |a|b|\n|---|---|\n|1|2|",
            "<h1>Hi</h1><p>x</p>",
            "a # one b ## two",
            "plain paragraph with **bold** text",
            "steps 1. first 2. second 10. tenth",
            "- top\n  - nested",
            "notes: i. audited ii. unaudited",
            "see below |a|b|\n|---|---|\n|1|2|",
        ];
        for case in cases {
            let once = normalize(case);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {case:?}");
        }
    }
}
