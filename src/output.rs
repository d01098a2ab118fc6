//! Export result types: final bytes plus run statistics.

use crate::export::ExportFormat;
use serde::{Deserialize, Serialize};

/// The result of a successful export: full artifact bytes for the requested
/// format. Never a partial or truncated artifact — failures surface as
/// [`crate::error::ExportError`] instead.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// The complete artifact (PDF or DOCX bytes).
    pub bytes: Vec<u8>,
    /// The format that was produced.
    pub format: ExportFormat,
    /// Statistics about the run.
    pub stats: ExportStats,
}

impl ExportOutput {
    /// Conventional download filename for this artifact
    /// (`document.pdf` / `document.docx`).
    pub fn suggested_filename(&self) -> &'static str {
        self.format.suggested_filename()
    }
}

/// Statistics about an export run, serialisable for logging and diffing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportStats {
    /// Top-level nodes in the sanitized tree.
    pub node_count: usize,
    /// Pages emitted by the print serializer; `None` for package exports,
    /// which have no fixed pagination.
    pub page_count: Option<usize>,
    /// Wall-clock time spent in the rasterization stage.
    pub render_duration_ms: u64,
    /// Wall-clock time for the whole export.
    pub total_duration_ms: u64,
}
