use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::types::{IndexedDocument, ScoredDocument, ScoringFields};
use crate::scoring::criteria::RankOptions;

/// Per-document data owned by a shard: the caller's scoring fields plus the
/// token length maintained by the indexer.
#[derive(Debug, Clone)]
pub struct DocInfo<F> {
    pub fields: Option<F>,
    pub token_length: f32,
}

impl<F> Default for DocInfo<F> {
    fn default() -> Self {
        DocInfo {
            fields: None,
            token_length: 0.0,
        }
    }
}

/// The document table of one shard, shared between its indexer and ranker
/// behind a single read/write guard.
#[derive(Debug)]
pub struct DocInfosShard<F> {
    pub doc_infos: HashMap<u64, DocInfo<F>>,
    /// Distinct documents seen by this shard; deletions decrement it. An
    /// approximation, used only for idf.
    pub num_documents: u64,
}

impl<F> Default for DocInfosShard<F> {
    fn default() -> Self {
        DocInfosShard {
            doc_infos: HashMap::new(),
            num_documents: 0,
        }
    }
}

/// One shard's ranker: scores lookup hits with the configured criteria and
/// sorts them.
pub struct Ranker<F: ScoringFields> {
    doc_infos: Arc<RwLock<DocInfosShard<F>>>,
}

impl<F: ScoringFields> Ranker<F> {
    pub fn new(doc_infos: Arc<RwLock<DocInfosShard<F>>>) -> Self {
        Ranker { doc_infos }
    }

    /// Attaches (or replaces) a document's scoring fields.
    pub fn add_doc(&self, doc_id: u64, fields: Option<F>) {
        let mut infos = self.doc_infos.write();
        if !infos.doc_infos.contains_key(&doc_id) {
            infos.num_documents += 1;
        }
        infos.doc_infos.entry(doc_id).or_default().fields = fields;
    }

    /// Tombstones a document. Posting lists are untouched; the document
    /// simply stops resolving here and is filtered from future results.
    pub fn remove_doc(&self, doc_id: u64) {
        let mut infos = self.doc_infos.write();
        if infos.doc_infos.remove(&doc_id).is_some() {
            infos.num_documents -= 1;
        }
    }

    /// Scores and sorts lookup hits. Tombstoned documents and documents the
    /// criteria scores empty are dropped; the rest sort by lexicographic
    /// score comparison and are windowed by offset/max. Returns the window
    /// and the pre-window count.
    pub fn rank(
        &self,
        docs: &[IndexedDocument],
        options: &RankOptions<F>,
        count_docs_only: bool,
    ) -> (Vec<ScoredDocument>, usize) {
        // Snapshot the fields first so user scoring code runs without the
        // shard guard held.
        let candidates: Vec<(&IndexedDocument, Option<F>)> = {
            let infos = self.doc_infos.read();
            docs.iter()
                .filter_map(|doc| {
                    infos
                        .doc_infos
                        .get(&doc.doc_id)
                        .map(|info| (doc, info.fields.clone()))
                })
                .collect()
        };

        let mut output = Vec::new();
        let mut num_docs = 0;
        for (doc, fields) in candidates {
            let scores = options.scoring_criteria.score(doc, fields.as_ref());
            if scores.is_empty() {
                continue;
            }
            num_docs += 1;
            if !count_docs_only {
                output.push(ScoredDocument {
                    doc_id: doc.doc_id,
                    scores,
                    token_snippet_locations: doc.token_snippet_locations.clone(),
                    token_locations: doc.token_locations.clone(),
                });
            }
        }

        if !count_docs_only {
            sort_scored(&mut output, options.reverse_order);

            let start = options.output_offset.min(output.len());
            let end = if options.max_outputs != 0 {
                (options.output_offset + options.max_outputs).min(output.len())
            } else {
                output.len()
            };
            output.drain(..start);
            output.truncate(end - start);
        }

        (output, num_docs)
    }
}

/// Stable sort by lexicographic score comparison, descending unless
/// reversed. Stability preserves the descending-doc-id arrival order from
/// the lookup scan, so ties break towards higher doc ids.
pub(crate) fn sort_scored(docs: &mut [ScoredDocument], reverse_order: bool) {
    if reverse_order {
        docs.sort_by(|a, b| compare_scores(&b.scores, &a.scores));
    } else {
        docs.sort_by(|a, b| compare_scores(&a.scores, &b.scores));
    }
}

/// Lexicographic comparison placing higher scores first.
fn compare_scores(a: &[f32], b: &[f32]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match y.partial_cmp(x) {
            Some(Ordering::Equal) | None => continue,
            Some(ordering) => return ordering,
        }
    }
    b.len().cmp(&a.len())
}
