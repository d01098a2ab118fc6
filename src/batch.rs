//! Joining multi-item extraction batches into one pipeline input.
//!
//! When several source images are uploaded at once, the upstream collaborator
//! extracts them concurrently but must hand us the results **in submission
//! order**, not completion order. This module joins them with a fixed
//! separator and applies the partial-success policy: a failed item is
//! excluded and reported, the batch proceeds with the rest, and only a batch
//! where *every* item failed is a hard error.

use crate::error::{ExportError, ItemError};
use tracing::warn;

/// Literal separator inserted between joined extraction segments.
pub const ITEM_SEPARATOR: &str = "\n\n---\n\n";

/// Result of joining an extraction batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Successful segments joined in submission order with [`ITEM_SEPARATOR`].
    pub text: String,
    /// Per-item failures, in submission order. Empty on full success.
    pub failures: Vec<ItemError>,
}

impl BatchOutcome {
    /// True when at least one item was excluded from the joined text.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Join per-item extraction results into one input string.
///
/// `items` must be in submission order; indices in reported [`ItemError`]s
/// are 1-based positions within it. Items that succeeded with only
/// whitespace are treated as failures ([`ItemError::EmptyItem`]) since they
/// contribute nothing to the document.
///
/// # Errors
/// [`ExportError::AllItemsFailed`] when no item produced usable text.
pub fn join_items(
    items: Vec<Result<String, ItemError>>,
) -> Result<BatchOutcome, ExportError> {
    let total = items.len();
    let mut segments: Vec<String> = Vec::with_capacity(total);
    let mut failures: Vec<ItemError> = Vec::new();

    for (i, item) in items.into_iter().enumerate() {
        match item {
            Ok(text) if !text.trim().is_empty() => segments.push(text),
            Ok(_) => {
                warn!(item = i + 1, "extraction item produced no text; excluding");
                failures.push(ItemError::EmptyItem { item: i + 1 });
            }
            Err(e) => {
                warn!(item = i + 1, error = %e, "extraction item failed; excluding");
                failures.push(e);
            }
        }
    }

    if segments.is_empty() {
        let first_error = failures
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "empty batch".to_string());
        return Err(ExportError::AllItemsFailed { total, first_error });
    }

    Ok(BatchOutcome {
        text: segments.join(ITEM_SEPARATOR),
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_in_submission_order() {
        let out = join_items(vec![
            Ok("first".to_string()),
            Ok("second".to_string()),
            Ok("third".to_string()),
        ])
        .unwrap();
        assert_eq!(out.text, "first\n\n---\n\nsecond\n\n---\n\nthird");
        assert!(!out.is_partial());
    }

    #[test]
    fn failed_item_is_excluded_and_reported() {
        let out = join_items(vec![
            Ok("first".to_string()),
            Err(ItemError::ExtractionFailed {
                item: 2,
                detail: "api timeout".into(),
            }),
            Ok("third".to_string()),
        ])
        .unwrap();
        assert_eq!(out.text, "first\n\n---\n\nthird");
        assert!(out.is_partial());
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].item(), 2);
    }

    #[test]
    fn whitespace_only_item_counts_as_failure() {
        let out = join_items(vec![Ok("text".into()), Ok("   \n ".into())]).unwrap();
        assert_eq!(out.text, "text");
        assert!(matches!(out.failures[0], ItemError::EmptyItem { item: 2 }));
    }

    #[test]
    fn all_failed_is_a_hard_error() {
        let err = join_items(vec![
            Err(ItemError::ExtractionFailed {
                item: 1,
                detail: "boom".into(),
            }),
            Ok(String::new()),
        ]);
        match err {
            Err(ExportError::AllItemsFailed { total, first_error }) => {
                assert_eq!(total, 2);
                assert!(first_error.contains("boom"));
            }
            other => panic!("expected AllItemsFailed, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_a_hard_error() {
        assert!(matches!(
            join_items(vec![]),
            Err(ExportError::AllItemsFailed { total: 0, .. })
        ));
    }
}
