use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::types::{DocumentIndex, ScoringFields};
use crate::engine::engine::EngineInner;
use crate::storage::varint;

/// What the doc-record store holds per document: the segmented index entry
/// plus the caller's scoring fields, enough to replay the whole write on
/// restart.
#[derive(Serialize, Deserialize)]
pub(crate) struct StoredDocument<F> {
    pub index: DocumentIndex,
    pub fields: Option<F>,
}

pub(crate) enum StorageRequest<F> {
    Store {
        document: DocumentIndex,
        fields: Option<F>,
    },
    Delete {
        doc_id: u64,
    },
}

/// Write-through persistence for one shard. Failed writes are logged and
/// still counted as stored: a wedged disk must not wedge `flush_index`.
pub(crate) fn storage_worker<F: ScoringFields>(
    inner: Arc<EngineInner<F>>,
    shard: usize,
    requests: Receiver<StorageRequest<F>>,
) {
    let Some(storage) = &inner.storage else {
        return;
    };
    while let Ok(request) = requests.recv() {
        match request {
            StorageRequest::Store { document, fields } => {
                let key = varint::encode_u64(document.doc_id);
                let doc_id = document.doc_id;
                let record = StoredDocument {
                    index: document,
                    fields,
                };
                match bincode::serialize(&record) {
                    Ok(value) => {
                        if let Err(err) = storage[shard].doc_records.set(&key, &value) {
                            warn!(shard, doc_id, error = %err, "snapshot write failed");
                        }
                    }
                    Err(err) => {
                        warn!(shard, doc_id, error = %err, "snapshot encode failed");
                    }
                }
                inner
                    .counters
                    .num_documents_stored
                    .fetch_add(1, Ordering::SeqCst);
            }
            StorageRequest::Delete { doc_id } => {
                if let Err(err) = storage[shard].doc_records.delete(&varint::encode_u64(doc_id)) {
                    warn!(shard, doc_id, error = %err, "snapshot delete failed");
                }
                inner
                    .counters
                    .num_documents_stored
                    .fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
