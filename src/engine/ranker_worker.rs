use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam::channel::{Receiver, Sender};

use crate::core::types::{IndexedDocument, ScoredDocument, ScoringFields};
use crate::engine::engine::EngineInner;
use crate::scoring::criteria::RankOptions;

/// The write side of a shard's ranker shares one queue so that field
/// attachments and tombstones apply in submission order.
pub(crate) enum RankerAddRequest<F> {
    Add { doc_id: u64, fields: Option<F> },
    Remove { doc_id: u64 },
}

pub(crate) struct RankRequest<F> {
    pub docs: Vec<IndexedDocument>,
    pub options: RankOptions<F>,
    pub results: Sender<RankerOutput>,
}

/// One shard's contribution to a search.
pub(crate) struct RankerOutput {
    pub docs: Vec<ScoredDocument>,
    pub num_docs: usize,
}

/// Applies field attachments and tombstones. Requests count as indexed
/// here, at the end of the write path, so the flush rendezvous covers the
/// index insert, the ranker fields and tombstones alike.
pub(crate) fn ranker_add_worker<F: ScoringFields>(
    inner: Arc<EngineInner<F>>,
    shard: usize,
    requests: Receiver<RankerAddRequest<F>>,
) {
    while let Ok(request) = requests.recv() {
        match request {
            RankerAddRequest::Add { doc_id, fields } => {
                inner.rankers[shard].add_doc(doc_id, fields);
            }
            RankerAddRequest::Remove { doc_id } => {
                inner.rankers[shard].remove_doc(doc_id);
            }
        }
        inner
            .counters
            .num_documents_indexed
            .fetch_add(1, Ordering::SeqCst);
    }
}

/// Scores and sorts one shard's lookup hits, then hands the partial result
/// to the caller's return queue.
pub(crate) fn ranker_rank_worker<F: ScoringFields>(
    inner: Arc<EngineInner<F>>,
    shard: usize,
    requests: Receiver<RankRequest<F>>,
) {
    while let Ok(mut request) = requests.recv() {
        // Fold the window into a plain cap: the offset is applied once, at
        // the cross-shard merge, not per shard.
        if request.options.max_outputs != 0 {
            request.options.max_outputs += request.options.output_offset;
        }
        request.options.output_offset = 0;

        let (docs, num_docs) = inner.rankers[shard].rank(&request.docs, &request.options, false);
        let _ = request.results.send(RankerOutput { docs, num_docs });
    }
}
