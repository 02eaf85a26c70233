use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam::channel::{Receiver, Sender};

use crate::core::types::{DocumentIndex, ScoredDocument, ScoringFields};
use crate::engine::engine::EngineInner;
use crate::engine::ranker_worker::{RankRequest, RankerAddRequest, RankerOutput};
use crate::scoring::criteria::RankOptions;

pub(crate) struct IndexerAddRequest<F> {
    pub document: DocumentIndex,
    pub fields: Option<F>,
}

pub(crate) struct LookupRequest<F> {
    pub tokens: Vec<String>,
    pub labels: Vec<String>,
    pub doc_ids: Option<Arc<HashSet<u64>>>,
    pub options: RankOptions<F>,
    pub count_docs_only: bool,
    pub orderless: bool,
    pub results: Sender<RankerOutput>,
}

/// Applies inserts to the shard's index, then forwards the document's
/// scoring fields to the ranker-add queue, so the ranker sees a document
/// only after its postings are in place.
pub(crate) fn indexer_add_worker<F: ScoringFields>(
    inner: Arc<EngineInner<F>>,
    shard: usize,
    requests: Receiver<IndexerAddRequest<F>>,
    ranker_add: Sender<RankerAddRequest<F>>,
) {
    while let Ok(request) = requests.recv() {
        inner.indexers[shard].add_document(&request.document);
        inner
            .counters
            .num_token_index_added
            .fetch_add(request.document.keywords.len() as u64, Ordering::SeqCst);
        let _ = ranker_add.send(RankerAddRequest::Add {
            doc_id: request.document.doc_id,
            fields: request.fields,
        });
    }
}

/// Runs intersection lookups for one shard. Hits continue to the shard's
/// rank queue; empty, count-only and orderless lookups answer the caller's
/// return queue directly.
pub(crate) fn indexer_lookup_worker<F: ScoringFields>(
    inner: Arc<EngineInner<F>>,
    shard: usize,
    requests: Receiver<LookupRequest<F>>,
    rank: Sender<RankRequest<F>>,
) {
    while let Ok(request) = requests.recv() {
        let (docs, num_docs) = inner.indexers[shard].lookup(
            &request.tokens,
            &request.labels,
            request.doc_ids.as_deref(),
            request.count_docs_only,
        );

        if request.count_docs_only || docs.is_empty() {
            let _ = request.results.send(RankerOutput {
                docs: Vec::new(),
                num_docs,
            });
            continue;
        }
        if request.orderless {
            let docs = docs
                .into_iter()
                .map(|doc| ScoredDocument {
                    doc_id: doc.doc_id,
                    scores: Vec::new(),
                    token_snippet_locations: doc.token_snippet_locations,
                    token_locations: doc.token_locations,
                })
                .collect();
            let _ = request.results.send(RankerOutput { docs, num_docs });
            continue;
        }

        let _ = rank.send(RankRequest {
            docs,
            options: request.options,
            results: request.results,
        });
    }
}
