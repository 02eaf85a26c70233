use std::sync::Arc;

use crate::core::types::IndexedDocument;

/// User-supplied document scoring.
///
/// The returned vector is the sort key, compared lexicographically; an empty
/// vector drops the document from the results. `fields` is whatever the
/// caller attached to the document at index time, or `None` when nothing
/// was attached.
pub trait ScoringCriteria<F>: Send + Sync {
    fn score(&self, doc: &IndexedDocument, fields: Option<&F>) -> Vec<f32>;
}

/// Ranks purely by the BM25 value computed during lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankByBm25;

impl<F> ScoringCriteria<F> for RankByBm25 {
    fn score(&self, doc: &IndexedDocument, _fields: Option<&F>) -> Vec<f32> {
        vec![doc.bm25]
    }
}

#[derive(Clone)]
pub struct RankOptions<F> {
    pub scoring_criteria: Arc<dyn ScoringCriteria<F>>,
    /// Ascending instead of the default descending order.
    pub reverse_order: bool,
    /// Results before this rank are dropped.
    pub output_offset: usize,
    /// Result cap; zero means unlimited.
    pub max_outputs: usize,
}

impl<F> Default for RankOptions<F> {
    fn default() -> Self {
        RankOptions {
            scoring_criteria: Arc::new(RankByBm25),
            reverse_order: false,
            output_offset: 0,
            max_outputs: 0,
        }
    }
}
