//! Error types for the md2doc library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExportError`] — **Fatal**: the export cannot produce bytes at all
//!   (empty input, unknown format, serializer backend failure). Returned as
//!   `Err(ExportError)` from the top-level `export*` functions. No partial
//!   artifact is ever returned alongside one of these.
//!
//! * [`ItemError`] — **Non-fatal**: a single item in a multi-item extraction
//!   batch failed while the others are fine. Reported inside
//!   [`crate::batch::BatchOutcome`] so callers can inspect partial success
//!   rather than losing the whole batch to one bad item.
//!
//! Normalization and parsing never fail — unrecognized input degrades to a
//! plain-paragraph fallback. Only the two serializers and the coordinator's
//! format dispatch produce errors, and none are retried internally.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2doc library.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Raw text is empty or whitespace-only after normalization.
    #[error("Input text is empty after normalization; nothing to export.")]
    EmptyInput,

    /// The requested export format is not one of the supported kinds.
    #[error("Unsupported export format '{requested}' (expected 'pdf' or 'docx')")]
    UnsupportedFormat { requested: String },

    /// The rasterization stage could not produce page content.
    #[error("Rendering failed: {detail}")]
    Render { detail: String },

    /// Structured-package assembly failed.
    #[error("Document packaging failed: {detail}")]
    Packaging { detail: String },

    /// Every item in an extraction batch failed; there is nothing to join.
    #[error("All {total} extraction items failed.\nFirst error: {first_error}")]
    AllItemsFailed { total: usize, first_error: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single item of a multi-item extraction batch.
///
/// The batch proceeds with the remaining successful items unless every
/// item fails (see [`crate::batch::join_items`]).
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The upstream extraction call failed for this item.
    #[error("Item {item}: extraction failed: {detail}")]
    ExtractionFailed { item: usize, detail: String },

    /// The upstream extraction succeeded but returned no usable text.
    #[error("Item {item}: extraction produced no text")]
    EmptyItem { item: usize },
}

impl ItemError {
    /// 1-indexed position of the failed item in submission order.
    pub fn item(&self) -> usize {
        match self {
            ItemError::ExtractionFailed { item, .. } | ItemError::EmptyItem { item } => *item,
        }
    }
}
