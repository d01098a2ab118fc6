//! # md2doc
//!
//! Convert messy extracted text into polished PDF and DOCX documents.
//!
//! ## Why this crate?
//!
//! Text that comes out of OCR and vision-model extraction is *almost*
//! markdown: headings glued to the previous sentence, list markers buried
//! mid-line, stray HTML, table rows run together. Feeding it straight to a
//! renderer produces a wall of paragraphs. This crate repairs those defects
//! deterministically, parses the result into a structural tree, strips
//! anything executable, and serializes the tree through one of two
//! deliberately different back ends:
//!
//! * **PDF** — print fidelity: the whole document is laid out as one
//!   continuous bitmap and sliced into page-height bands, like a browser's
//!   print view. What you measure is what you get.
//! * **DOCX** — editability: headings, styled runs, and tables map to real
//!   Word structures so the recipient can keep working on the text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! raw text
//!  │
//!  ├─ 1. Normalize  7 ordered repair rules (idempotent, pure)
//!  ├─ 2. Parse      markdown → DocumentTree (tables, lists, styled runs)
//!  ├─ 3. Sanitize   structural removal of embedded markup
//!  ├─ 4a. Render    continuous bitmap → page bands → PDF
//!  └─ 4b. Package   tree → Word structures → DOCX
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2doc::{export_to_file, ExportConfig, ExportFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let raw = "Quarterly Report\n#Summary revenue grew - up 12% - churn flat";
//!     let config = ExportConfig::default(); // A4, 10 mm margins, 2× raster
//!     let output = export_to_file(raw, ExportFormat::Pdf, &config, "report.pdf").await?;
//!     eprintln!("{} pages, {} bytes", output.stats.page_count.unwrap_or(0), output.bytes.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2doc` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2doc = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{join_items, BatchOutcome, ITEM_SEPARATOR};
pub use config::{ExportConfig, ExportConfigBuilder};
pub use document::{DocumentNode, DocumentTree, List, ListItem, ListStyle, TableRow, TextRun};
pub use error::{ExportError, ItemError};
pub use export::{export, export_sync, export_to_file, ExportFormat};
pub use output::{ExportOutput, ExportStats};
pub use pipeline::normalize::normalize;
