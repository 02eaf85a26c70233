use std::collections::HashMap;
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};

use crate::core::types::{DocumentIndex, DocumentIndexData, KeywordIndex, ScoringFields};
use crate::engine::engine::EngineInner;
use crate::engine::indexer_worker::IndexerAddRequest;
use crate::engine::storage_worker::StorageRequest;

pub(crate) struct SegmenterRequest<F> {
    pub doc_id: u64,
    pub data: DocumentIndexData<F>,
}

/// Turns raw index requests into segmented documents and fans them out to
/// the owning shard's indexer (and storage, when snapshotting).
pub(crate) fn segmenter_worker<F: ScoringFields>(
    inner: Arc<EngineInner<F>>,
    requests: Receiver<SegmenterRequest<F>>,
    indexer_add: Vec<Sender<IndexerAddRequest<F>>>,
    storage: Option<Vec<Sender<StorageRequest<F>>>>,
) {
    while let Ok(request) = requests.recv() {
        let shard = inner.router.shard_for(request.doc_id);

        let mut token_starts: HashMap<String, Vec<usize>> = HashMap::new();
        let num_tokens;
        if !request.data.content.is_empty() {
            let tokens = inner.tokenizer.tokenize(&request.data.content);
            num_tokens = tokens.len();
            for token in tokens {
                if !inner.stop_tokens.is_stop_token(&token.text) {
                    token_starts.entry(token.text).or_default().push(token.start);
                }
            }
        } else {
            num_tokens = request.data.tokens.len();
            for token in &request.data.tokens {
                if !inner.stop_tokens.is_stop_token(&token.text) {
                    token_starts.insert(token.text.clone(), token.locations.clone());
                }
            }
        }

        // Labels are searchable but have no position in the text. A label
        // that collides with a content token deliberately clears its
        // locations, matching the established lookup fallback.
        for label in &request.data.labels {
            if !inner.stop_tokens.is_stop_token(label) {
                token_starts.insert(label.clone(), Vec::new());
            }
        }

        let keywords: Vec<KeywordIndex> = token_starts
            .into_iter()
            .map(|(text, starts)| KeywordIndex {
                frequency: starts.len() as f32,
                text,
                starts,
            })
            .collect();
        let document = DocumentIndex {
            doc_id: request.doc_id,
            token_length: num_tokens as f32,
            keywords,
        };

        if let Some(storage) = &storage {
            let _ = storage[shard].send(StorageRequest::Store {
                document: document.clone(),
                fields: request.data.fields.clone(),
            });
        }
        let _ = indexer_add[shard].send(IndexerAddRequest {
            document,
            fields: request.data.fields,
        });
    }
}
