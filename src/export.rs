//! Export coordination: the public entry points of the crate.
//!
//! [`export`] is the main async API; it runs the whole pipeline on a
//! blocking thread because layout and rasterization are CPU-bound and would
//! otherwise stall the async runtime. [`export_sync`] serves non-async
//! callers, and [`export_to_file`] writes the artifact atomically (temp file
//! then rename) so a crash never leaves a half-written document behind.
//!
//! Exactly one serializer runs per request; the PDF path never pays DOCX
//! costs and vice versa.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::output::{ExportOutput, ExportStats};
use crate::pipeline::{docx, normalize::normalize, parse::parse, pdf, render, sanitize::sanitize};

/// The two supported artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    /// Conventional download filename for this format.
    pub fn suggested_filename(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "document.pdf",
            ExportFormat::Docx => "document.docx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            _ => Err(ExportError::UnsupportedFormat {
                requested: s.to_string(),
            }),
        }
    }
}

/// Convert raw extracted text to a document artifact.
///
/// Runs the pipeline on a blocking thread; the returned future is cheap to
/// poll.
///
/// # Example
/// ```rust,no_run
/// use md2doc::{export, ExportConfig, ExportFormat};
///
/// # async fn run() -> Result<(), md2doc::ExportError> {
/// let output = export("# Report\n\nAll good.", ExportFormat::Pdf, &ExportConfig::default()).await?;
/// assert!(output.bytes.starts_with(b"%PDF"));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// See [`ExportError`]; notably [`ExportError::EmptyInput`] when the text
/// normalizes to nothing.
pub async fn export(
    raw: impl Into<String>,
    format: ExportFormat,
    config: &ExportConfig,
) -> Result<ExportOutput, ExportError> {
    let raw = raw.into();
    let config = config.clone();
    tokio::task::spawn_blocking(move || export_blocking(&raw, format, &config))
        .await
        .map_err(|e| ExportError::Internal(format!("export task failed: {e}")))?
}

/// Synchronous variant of [`export`] for non-async callers.
pub fn export_sync(
    raw: &str,
    format: ExportFormat,
    config: &ExportConfig,
) -> Result<ExportOutput, ExportError> {
    export_blocking(raw, format, config)
}

/// Export and write the artifact to `path` atomically.
///
/// The bytes go to a sibling temp file first and are renamed into place, so
/// `path` either holds the previous content or the complete new artifact.
pub async fn export_to_file(
    raw: impl Into<String>,
    format: ExportFormat,
    config: &ExportConfig,
    path: impl AsRef<Path>,
) -> Result<ExportOutput, ExportError> {
    let path = path.as_ref();
    let output = export(raw, format, config).await?;

    let write_failed = |source: std::io::Error| ExportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &output.bytes)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_failed)?;

    info!(path = %path.display(), bytes = output.bytes.len(), "wrote export artifact");
    Ok(output)
}

fn export_blocking(
    raw: &str,
    format: ExportFormat,
    config: &ExportConfig,
) -> Result<ExportOutput, ExportError> {
    let started = Instant::now();

    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(ExportError::EmptyInput);
    }
    let tree = sanitize(parse(&normalized));
    let node_count = tree.len();

    let (bytes, page_count, render_duration_ms) = match format {
        ExportFormat::Pdf => {
            let render_started = Instant::now();
            let segments = render::render_to_pages(&tree, config)?;
            let render_ms = render_started.elapsed().as_millis() as u64;
            let pages = segments.len();
            (pdf::assemble(segments, config)?, Some(pages), render_ms)
        }
        ExportFormat::Docx => (docx::assemble(&tree, config)?, None, 0),
    };

    let stats = ExportStats {
        node_count,
        page_count,
        render_duration_ms,
        total_duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        format = %format,
        nodes = node_count,
        pages = ?page_count,
        bytes = bytes.len(),
        total_ms = stats.total_duration_ms,
        "export complete"
    );

    Ok(ExportOutput {
        bytes,
        format,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_round_trips_through_str() {
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("DOCX".parse::<ExportFormat>().unwrap(), ExportFormat::Docx);
        assert_eq!(ExportFormat::Pdf.to_string(), "pdf");
    }

    #[test]
    fn unknown_format_is_rejected_with_its_name() {
        let err = "rtf".parse::<ExportFormat>().unwrap_err();
        match err {
            ExportError::UnsupportedFormat { requested } => assert_eq!(requested, "rtf"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_rejected_before_any_rendering() {
        for raw in ["", "   \n\t  ", "<div></div>"] {
            let err = export_sync(raw, ExportFormat::Pdf, &ExportConfig::default());
            assert!(matches!(err, Err(ExportError::EmptyInput)), "input: {raw:?}");
        }
    }

    #[test]
    fn sync_pdf_export_produces_pdf_bytes() {
        let out = export_sync("# Hello\n\nWorld.", ExportFormat::Pdf, &ExportConfig::default())
            .unwrap();
        assert!(out.bytes.starts_with(b"%PDF"));
        assert_eq!(out.format, ExportFormat::Pdf);
        assert_eq!(out.stats.page_count, Some(1));
        assert_eq!(out.stats.node_count, 2);
    }

    #[test]
    fn sync_docx_export_produces_zip_bytes() {
        let out = export_sync("# Hello\n\nWorld.", ExportFormat::Docx, &ExportConfig::default())
            .unwrap();
        assert!(out.bytes.starts_with(b"PK"));
        assert_eq!(out.stats.page_count, None);
    }
}
