use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::analysis::stopwords::StopTokens;
use crate::analysis::tokenizer::{DictionaryTokenizer, Tokenizer, WhitespaceTokenizer};
use crate::core::config::EngineOptions;
use crate::core::error::Result;
use crate::core::types::{
    DocumentIndexData, ScoringFields, SearchRequest, SearchResponse,
};
use crate::engine::indexer_worker::{
    IndexerAddRequest, LookupRequest, indexer_add_worker, indexer_lookup_worker,
};
use crate::engine::ranker_worker::{
    RankerAddRequest, ranker_add_worker, ranker_rank_worker,
};
use crate::engine::router::ShardRouter;
use crate::engine::segmenter_worker::{SegmenterRequest, segmenter_worker};
use crate::engine::storage_worker::{StorageRequest, StoredDocument, storage_worker};
use crate::index::inverted::Indexer;
use crate::index::posting::KeywordIndices;
use crate::scoring::ranker::{DocInfosShard, Ranker, sort_scored};
use crate::storage::file_kv::FileKvStore;
use crate::storage::kv::KvStore;
use crate::storage::varint;

/// The two snapshot namespaces of one shard.
pub(crate) struct StorageShard {
    /// varint(doc id) -> bincode(StoredDocument), written through on index.
    pub doc_records: Box<dyn KvStore>,
    /// token bytes -> bincode(KeywordIndices), written on close.
    pub postings: Box<dyn KvStore>,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub num_indexing_requests: AtomicU64,
    pub num_documents_indexed: AtomicU64,
    pub num_documents_stored: AtomicU64,
    pub num_token_index_added: AtomicU64,
}

/// Progress counters, mostly useful for monitoring and tests.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Index and remove requests accepted so far.
    pub num_indexing_requests: u64,
    /// Requests fully applied to a shard's index and ranker.
    pub num_documents_indexed: u64,
    /// Requests applied to the snapshot store (zero without storage).
    pub num_documents_stored: u64,
    /// Total (keyword, document) pairs inserted.
    pub num_token_index_added: u64,
}

/// State shared between the facade and every worker thread.
pub(crate) struct EngineInner<F: ScoringFields> {
    pub options: EngineOptions<F>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub stop_tokens: StopTokens,
    pub router: ShardRouter,
    pub indexers: Vec<Indexer<F>>,
    pub rankers: Vec<Ranker<F>>,
    pub counters: Counters,
    pub storage: Option<Vec<StorageShard>>,
}

/// The search engine facade.
///
/// Writes flow segmenter -> per-shard indexer -> per-shard ranker over
/// bounded queues serviced by long-lived worker threads; searches broadcast
/// to every shard and merge the partial results. All operations take
/// `&self` and are safe to call concurrently.
pub struct Engine<F: ScoringFields> {
    inner: Arc<EngineInner<F>>,
    segmenter_tx: Sender<SegmenterRequest<F>>,
    lookup_txs: Vec<Sender<LookupRequest<F>>>,
    ranker_add_txs: Vec<Sender<RankerAddRequest<F>>>,
    storage_txs: Option<Vec<Sender<StorageRequest<F>>>>,
}

impl<F: ScoringFields> Engine<F> {
    /// Builds the engine: loads the tokenizer and stop tokens, starts the
    /// worker pools and, when a storage folder is configured, restores the
    /// snapshots before returning. Construction failures (unreadable
    /// dictionary, unusable storage folder) are fatal for the engine.
    pub fn new(mut options: EngineOptions<F>) -> Result<Engine<F>> {
        options.normalize();

        let tokenizer: Arc<dyn Tokenizer> = match options.tokenizer.clone() {
            Some(custom) => custom,
            None => match &options.dictionary_path {
                Some(path) => Arc::new(DictionaryTokenizer::from_path(path)?),
                None => Arc::new(WhitespaceTokenizer::default()),
            },
        };
        let stop_tokens = match &options.stop_token_path {
            Some(path) => StopTokens::from_path(path)?,
            None => StopTokens::new(),
        };

        let num_shards = options.num_shards;
        let mut indexers = Vec::with_capacity(num_shards);
        let mut rankers = Vec::with_capacity(num_shards);
        for _ in 0..num_shards {
            let doc_infos = Arc::new(RwLock::new(DocInfosShard::default()));
            indexers.push(Indexer::new(options.indexer.clone(), doc_infos.clone()));
            rankers.push(Ranker::new(doc_infos));
        }

        let storage = match &options.storage_folder {
            Some(folder) => {
                fs::create_dir_all(folder)?;
                let mut shards: Vec<StorageShard> = Vec::with_capacity(num_shards);
                for shard in 0..num_shards {
                    shards.push(StorageShard {
                        doc_records: Box::new(FileKvStore::open(
                            folder.join(format!("docs.{shard}.kv")),
                        )?),
                        postings: Box::new(FileKvStore::open(
                            folder.join(format!("postings.{shard}.kv")),
                        )?),
                    });
                }
                Some(shards)
            }
            None => None,
        };

        let inner = Arc::new(EngineInner {
            tokenizer,
            stop_tokens,
            router: ShardRouter::new(num_shards),
            indexers,
            rankers,
            counters: Counters::default(),
            storage,
            options,
        });

        let (segmenter_tx, segmenter_rx) =
            bounded(inner.options.num_segmenter_workers);
        let mut indexer_add_txs = Vec::with_capacity(num_shards);
        let mut indexer_add_rxs = Vec::with_capacity(num_shards);
        let mut lookup_txs = Vec::with_capacity(num_shards);
        let mut lookup_rxs = Vec::with_capacity(num_shards);
        let mut ranker_add_txs = Vec::with_capacity(num_shards);
        let mut ranker_add_rxs = Vec::with_capacity(num_shards);
        let mut rank_txs = Vec::with_capacity(num_shards);
        let mut rank_rxs = Vec::with_capacity(num_shards);
        for _ in 0..num_shards {
            let (tx, rx) = bounded(inner.options.indexer_buffer_length);
            indexer_add_txs.push(tx);
            indexer_add_rxs.push(rx);
            let (tx, rx) = bounded(inner.options.indexer_buffer_length);
            lookup_txs.push(tx);
            lookup_rxs.push(rx);
            let (tx, rx) = bounded(inner.options.ranker_buffer_length);
            ranker_add_txs.push(tx);
            ranker_add_rxs.push(rx);
            let (tx, rx) = bounded(inner.options.ranker_buffer_length);
            rank_txs.push(tx);
            rank_rxs.push(rx);
        }
        let mut storage_txs = None;
        let mut storage_rxs = Vec::new();
        if inner.storage.is_some() {
            let mut txs = Vec::with_capacity(num_shards);
            for _ in 0..num_shards {
                let (tx, rx) = bounded(inner.options.indexer_buffer_length);
                txs.push(tx);
                storage_rxs.push(rx);
            }
            storage_txs = Some(txs);
        }

        for i in 0..inner.options.num_segmenter_workers {
            spawn_worker(format!("wren-segmenter-{i}"), {
                let inner = inner.clone();
                let requests = segmenter_rx.clone();
                let indexer_add = indexer_add_txs.clone();
                let storage = storage_txs.clone();
                move || segmenter_worker(inner, requests, indexer_add, storage)
            })?;
        }
        for shard in 0..num_shards {
            spawn_worker(format!("wren-indexer-add-{shard}"), {
                let inner = inner.clone();
                let requests = indexer_add_rxs[shard].clone();
                let ranker_add = ranker_add_txs[shard].clone();
                move || indexer_add_worker(inner, shard, requests, ranker_add)
            })?;
            spawn_worker(format!("wren-ranker-add-{shard}"), {
                let inner = inner.clone();
                let requests = ranker_add_rxs[shard].clone();
                move || ranker_add_worker(inner, shard, requests)
            })?;
            for i in 0..inner.options.num_indexer_workers_per_shard {
                spawn_worker(format!("wren-lookup-{shard}-{i}"), {
                    let inner = inner.clone();
                    let requests = lookup_rxs[shard].clone();
                    let rank = rank_txs[shard].clone();
                    move || indexer_lookup_worker(inner, shard, requests, rank)
                })?;
            }
            for i in 0..inner.options.num_ranker_workers_per_shard {
                spawn_worker(format!("wren-rank-{shard}-{i}"), {
                    let inner = inner.clone();
                    let requests = rank_rxs[shard].clone();
                    move || ranker_rank_worker(inner, shard, requests)
                })?;
            }
            if inner.storage.is_some() {
                spawn_worker(format!("wren-storage-{shard}"), {
                    let inner = inner.clone();
                    let requests = storage_rxs[shard].clone();
                    move || storage_worker(inner, shard, requests)
                })?;
            }
        }

        let engine = Engine {
            inner,
            segmenter_tx,
            lookup_txs,
            ranker_add_txs,
            storage_txs,
        };
        if engine.inner.storage.is_some() {
            engine.restore_snapshots(&indexer_add_txs);
            engine.flush_index();
        }
        Ok(engine)
    }

    /// Queues a document for indexing. Asynchronous: the document becomes
    /// searchable some time after this returns; `flush_index` forces the
    /// rendezvous. Re-indexing an existing id upserts it.
    pub fn index_document(&self, doc_id: u64, data: DocumentIndexData<F>) {
        self.inner
            .counters
            .num_indexing_requests
            .fetch_add(1, Ordering::SeqCst);
        let _ = self.segmenter_tx.send(SegmenterRequest { doc_id, data });
    }

    /// Queues a tombstone for a document. Only the ranker forgets the
    /// document; posting lists keep referencing it and lookups filter it
    /// out. The snapshot record is deleted so the tombstone survives
    /// restarts.
    pub fn remove_document(&self, doc_id: u64) {
        self.inner
            .counters
            .num_indexing_requests
            .fetch_add(1, Ordering::SeqCst);
        let shard = self.inner.router.shard_for(doc_id);
        let _ = self.ranker_add_txs[shard].send(RankerAddRequest::Remove { doc_id });
        if let Some(storage_txs) = &self.storage_txs {
            let _ = storage_txs[shard].send(StorageRequest::Delete { doc_id });
        }
    }

    /// Blocks until every previously submitted write (index and remove) has
    /// taken effect on its shard, and reached the snapshot store when
    /// storage is enabled.
    pub fn flush_index(&self) {
        let counters = &self.inner.counters;
        let with_storage = self.inner.storage.is_some();
        loop {
            let requests = counters.num_indexing_requests.load(Ordering::SeqCst);
            let indexed = counters.num_documents_indexed.load(Ordering::SeqCst);
            let stored = counters.num_documents_stored.load(Ordering::SeqCst);
            if requests == indexed && (!with_storage || requests == stored) {
                return;
            }
            thread::yield_now();
        }
    }

    /// Searches all shards for documents matching every query token and
    /// label, ranked by the configured criteria.
    ///
    /// With a positive `timeout_ms`, shards that miss the deadline are
    /// dropped and the response is flagged `timeout`. `count_docs_only`
    /// returns only the match count; `orderless` returns raw unranked
    /// matches.
    pub fn search(&self, request: SearchRequest<F>) -> SearchResponse {
        let rank_options = request
            .rank
            .unwrap_or_else(|| self.inner.options.default_rank.clone());

        let mut tokens = Vec::new();
        if !request.text.is_empty() {
            for token in self.inner.tokenizer.tokenize(&request.text) {
                if !self.inner.stop_tokens.is_stop_token(&token.text) {
                    tokens.push(token.text);
                }
            }
        } else {
            tokens.extend(request.tokens.iter().cloned());
        }

        let num_shards = self.inner.options.num_shards;
        let (results_tx, results_rx) = bounded(num_shards);
        let doc_ids = request.doc_ids.map(Arc::new);
        for shard in 0..num_shards {
            let _ = self.lookup_txs[shard].send(LookupRequest {
                tokens: tokens.clone(),
                labels: request.labels.clone(),
                doc_ids: doc_ids.clone(),
                options: rank_options.clone(),
                count_docs_only: request.count_docs_only,
                orderless: request.orderless,
                results: results_tx.clone(),
            });
        }
        drop(results_tx);

        let mut docs = Vec::new();
        let mut num_docs = 0;
        let mut timeout = false;
        if request.timeout_ms <= 0 {
            for _ in 0..num_shards {
                match results_rx.recv() {
                    Ok(output) => {
                        num_docs += output.num_docs;
                        docs.extend(output.docs);
                    }
                    Err(_) => break,
                }
            }
        } else {
            let deadline = Instant::now() + Duration::from_millis(request.timeout_ms as u64);
            for _ in 0..num_shards {
                match results_rx.recv_deadline(deadline) {
                    Ok(output) => {
                        num_docs += output.num_docs;
                        docs.extend(output.docs);
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        timeout = true;
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }

        // Top-K merge across the per-shard partials.
        if !request.orderless && !request.count_docs_only {
            sort_scored(&mut docs, rank_options.reverse_order);
        }
        let start = rank_options.output_offset.min(docs.len());
        let end = if rank_options.max_outputs != 0 {
            (start + rank_options.max_outputs).min(docs.len())
        } else {
            docs.len()
        };
        docs.drain(..start);
        docs.truncate(end - start);

        SearchResponse {
            tokens,
            docs,
            num_docs,
            timeout,
        }
    }

    pub fn stats(&self) -> EngineStats {
        let counters = &self.inner.counters;
        EngineStats {
            num_indexing_requests: counters.num_indexing_requests.load(Ordering::SeqCst),
            num_documents_indexed: counters.num_documents_indexed.load(Ordering::SeqCst),
            num_documents_stored: counters.num_documents_stored.load(Ordering::SeqCst),
            num_token_index_added: counters.num_token_index_added.load(Ordering::SeqCst),
        }
    }

    /// Flushes pending writes, snapshots the posting tables and closes the
    /// stores. Workers wind down once the engine is dropped.
    pub fn close(self) -> Result<()> {
        self.flush_index();
        if let Some(storage) = &self.inner.storage {
            for (shard, stores) in storage.iter().enumerate() {
                for (token, indices) in self.inner.indexers[shard].snapshot_postings() {
                    match bincode::serialize(&indices) {
                        Ok(value) => {
                            if let Err(err) = stores.postings.set(token.as_bytes(), &value) {
                                warn!(shard, token = %token, error = %err, "posting snapshot write failed");
                            }
                        }
                        Err(err) => {
                            warn!(shard, token = %token, error = %err, "posting snapshot encode failed");
                        }
                    }
                }
                stores.doc_records.close()?;
                stores.postings.close()?;
            }
        }
        Ok(())
    }

    /// Loads both snapshot namespaces: posting tables install directly,
    /// document records replay through the indexer queues. Undecodable
    /// records are logged and skipped; the rest of the restore continues.
    fn restore_snapshots(&self, indexer_add_txs: &[Sender<IndexerAddRequest<F>>]) {
        let Some(storage) = &self.inner.storage else {
            return;
        };
        let counters = &self.inner.counters;
        for (shard, stores) in storage.iter().enumerate() {
            let mut num_postings = 0u64;
            let result = stores.postings.for_each(&mut |key, value| {
                match (
                    std::str::from_utf8(key),
                    bincode::deserialize::<KeywordIndices>(value),
                ) {
                    (Ok(token), Ok(indices)) => {
                        self.inner.indexers[shard].install_posting(token.to_string(), indices);
                        num_postings += 1;
                    }
                    _ => warn!(shard, "undecodable posting snapshot record, skipping"),
                }
            });
            if let Err(err) = result {
                warn!(shard, error = %err, "posting snapshot restore failed");
            }

            let mut num_documents = 0u64;
            let result = stores.doc_records.for_each(&mut |key, value| {
                if varint::decode_u64(key).is_err() {
                    warn!(shard, "undecodable document snapshot key, skipping");
                    return;
                }
                match bincode::deserialize::<StoredDocument<F>>(value) {
                    Ok(record) => {
                        counters.num_indexing_requests.fetch_add(1, Ordering::SeqCst);
                        counters.num_documents_stored.fetch_add(1, Ordering::SeqCst);
                        let _ = indexer_add_txs[shard].send(IndexerAddRequest {
                            document: record.index,
                            fields: record.fields,
                        });
                        num_documents += 1;
                    }
                    Err(err) => {
                        warn!(shard, error = %err, "undecodable document snapshot record, skipping")
                    }
                }
            });
            if let Err(err) = result {
                warn!(shard, error = %err, "document snapshot restore failed");
            }
            debug!(shard, num_postings, num_documents, "snapshot restored");
        }
    }
}

fn spawn_worker(
    name: String,
    work: impl FnOnce() + Send + 'static,
) -> Result<()> {
    thread::Builder::new().name(name).spawn(work)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Bm25Parameters, IndexType, IndexerOptions};
    use crate::core::types::{IndexedDocument, TokenData};
    use crate::scoring::criteria::{RankByBm25, RankOptions, ScoringCriteria};
    use serde::{Deserialize, Serialize};
    use std::collections::HashSet;
    use std::io::Write;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestFields {
        a: f32,
        b: f32,
    }

    /// Higher score for tighter token packing; infeasible proximity drops
    /// the document.
    struct RankByProximity;

    impl ScoringCriteria<TestFields> for RankByProximity {
        fn score(&self, doc: &IndexedDocument, _fields: Option<&TestFields>) -> Vec<f32> {
            if doc.token_proximity < 0 {
                return Vec::new();
            }
            vec![1.0 / (doc.token_proximity as f32 + 1.0)]
        }
    }

    struct SleepyCriteria;

    impl ScoringCriteria<TestFields> for SleepyCriteria {
        fn score(&self, _doc: &IndexedDocument, _fields: Option<&TestFields>) -> Vec<f32> {
            thread::sleep(Duration::from_millis(300));
            vec![1.0]
        }
    }

    fn proximity_options() -> EngineOptions<TestFields> {
        EngineOptions {
            indexer: IndexerOptions {
                index_type: IndexType::Locations,
                bm25: Some(Bm25Parameters::default()),
            },
            default_rank: RankOptions {
                scoring_criteria: Arc::new(RankByProximity),
                ..RankOptions::default()
            },
            ..EngineOptions::default()
        }
    }

    fn token(text: &str, locations: &[usize]) -> TokenData {
        TokenData {
            text: text.to_string(),
            locations: locations.to_vec(),
        }
    }

    /// Three pre-tokenized documents over tokens "aa" and "bb" with
    /// proximities 16, 4 and 1.
    fn add_proximity_docs(engine: &Engine<TestFields>) {
        engine.index_document(
            1,
            DocumentIndexData {
                tokens: vec![token("aa", &[0]), token("bb", &[18, 24])],
                fields: Some(TestFields { a: 1.0, b: 2.0 }),
                ..DocumentIndexData::default()
            },
        );
        engine.index_document(
            2,
            DocumentIndexData {
                tokens: vec![token("aa", &[0]), token("bb", &[6])],
                ..DocumentIndexData::default()
            },
        );
        engine.index_document(
            3,
            DocumentIndexData {
                tokens: vec![token("aa", &[0]), token("bb", &[3])],
                fields: Some(TestFields { a: 0.0, b: 9.0 }),
                ..DocumentIndexData::default()
            },
        );
        engine.flush_index();
    }

    fn results(response: &SearchResponse) -> Vec<(u64, i32, Vec<usize>)> {
        response
            .docs
            .iter()
            .map(|doc| {
                (
                    doc.doc_id,
                    (doc.scores[0] * 1000.0) as i32,
                    doc.token_snippet_locations.clone(),
                )
            })
            .collect()
    }

    fn query(tokens: &[&str]) -> SearchRequest<TestFields> {
        SearchRequest {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..SearchRequest::default()
        }
    }

    #[test]
    fn pretokenized_search_ranks_by_proximity() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        let response = engine.search(query(&["aa", "bb"]));
        assert_eq!(response.num_docs, 3);
        assert!(!response.timeout);
        assert_eq!(
            results(&response),
            vec![
                (3, 500, vec![0, 3]),
                (2, 200, vec![0, 6]),
                (1, 58, vec![0, 18]),
            ]
        );
    }

    #[test]
    fn content_search_uses_tokenizer_and_stop_tokens() {
        let mut stop_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(stop_file, "the").unwrap();

        let engine = Engine::new(EngineOptions {
            stop_token_path: Some(stop_file.path().to_path_buf()),
            ..proximity_options()
        })
        .unwrap();
        engine.index_document(
            1,
            DocumentIndexData {
                content: "the quick brown fox".to_string(),
                ..DocumentIndexData::default()
            },
        );
        engine.index_document(
            2,
            DocumentIndexData {
                content: "quick fox".to_string(),
                ..DocumentIndexData::default()
            },
        );
        engine.index_document(
            3,
            DocumentIndexData {
                content: "the lazy dog".to_string(),
                ..DocumentIndexData::default()
            },
        );
        engine.flush_index();

        let response = engine.search(SearchRequest {
            text: "The Quick fox".to_string(),
            ..SearchRequest::default()
        });
        assert_eq!(response.tokens, vec!["quick", "fox"]);
        assert_eq!(
            results(&response),
            vec![(2, 500, vec![0, 6]), (1, 125, vec![4, 16])]
        );
    }

    #[test]
    fn reverse_order_and_windowing() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        let reversed = SearchRequest {
            rank: Some(RankOptions {
                scoring_criteria: Arc::new(RankByProximity),
                reverse_order: true,
                ..RankOptions::default()
            }),
            ..query(&["aa", "bb"])
        };
        let response = engine.search(reversed);
        let ids: Vec<u64> = response.docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let windowed = SearchRequest {
            rank: Some(RankOptions {
                scoring_criteria: Arc::new(RankByProximity),
                output_offset: 1,
                max_outputs: 2,
                ..RankOptions::default()
            }),
            ..query(&["aa", "bb"])
        };
        let response = engine.search(windowed);
        let ids: Vec<u64> = response.docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(response.num_docs, 3);

        let offset_past_end = SearchRequest {
            rank: Some(RankOptions {
                scoring_criteria: Arc::new(RankByProximity),
                output_offset: 10,
                ..RankOptions::default()
            }),
            ..query(&["aa", "bb"])
        };
        assert!(engine.search(offset_past_end).docs.is_empty());
    }

    #[test]
    fn bm25_ranking_over_frequencies_index() {
        let engine: Engine<TestFields> = Engine::new(EngineOptions {
            indexer: IndexerOptions {
                index_type: IndexType::Frequencies,
                bm25: Some(Bm25Parameters::default()),
            },
            default_rank: RankOptions {
                scoring_criteria: Arc::new(RankByBm25),
                ..RankOptions::default()
            },
            ..EngineOptions::default()
        })
        .unwrap();
        engine.index_document(
            1,
            DocumentIndexData {
                content: "aa bb aa".to_string(),
                ..DocumentIndexData::default()
            },
        );
        engine.index_document(
            2,
            DocumentIndexData {
                content: "aa cc dd ee".to_string(),
                ..DocumentIndexData::default()
            },
        );
        engine.flush_index();

        let response = engine.search(query(&["aa"]));
        assert_eq!(response.num_docs, 2);
        let ids: Vec<u64> = response.docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(response.docs[0].scores[0] > response.docs[1].scores[0]);
        assert!(response.docs[1].scores[0] > 0.0);
    }

    #[test]
    fn count_docs_only_returns_just_the_count() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        let response = engine.search(SearchRequest {
            count_docs_only: true,
            ..query(&["aa", "bb"])
        });
        assert!(response.docs.is_empty());
        assert_eq!(response.num_docs, 3);
        assert_eq!(response.tokens, vec!["aa", "bb"]);
    }

    #[test]
    fn doc_id_whitelist_limits_the_search() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        let whitelist: HashSet<u64> = [1, 3].into_iter().collect();
        let response = engine.search(SearchRequest {
            doc_ids: Some(whitelist),
            ..query(&["aa", "bb"])
        });
        let ids: Vec<u64> = response.docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(response.num_docs, 2);
    }

    #[test]
    fn removed_documents_stay_out_of_results() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        engine.remove_document(2);
        engine.flush_index();

        let response = engine.search(query(&["aa", "bb"]));
        let ids: Vec<u64> = response.docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(response.num_docs, 2);
    }

    #[test]
    fn orderless_returns_raw_matches() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        let response = engine.search(SearchRequest {
            orderless: true,
            ..query(&["aa", "bb"])
        });
        assert_eq!(response.num_docs, 3);
        let ids: HashSet<u64> = response.docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, [1, 2, 3].into_iter().collect());
        assert!(response.docs.iter().all(|d| d.scores.is_empty()));
    }

    #[test]
    fn labels_match_without_scoring() {
        let engine = Engine::new(proximity_options()).unwrap();
        engine.index_document(
            1,
            DocumentIndexData {
                content: "aa zz".to_string(),
                labels: vec!["sports".to_string()],
                ..DocumentIndexData::default()
            },
        );
        engine.index_document(
            2,
            DocumentIndexData {
                content: "aa yy".to_string(),
                ..DocumentIndexData::default()
            },
        );
        engine.flush_index();

        let response = engine.search(SearchRequest {
            labels: vec!["sports".to_string()],
            ..query(&["aa"])
        });
        let ids: Vec<u64> = response.docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn missing_tokens_yield_an_empty_response() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        let response = engine.search(query(&["zz"]));
        assert!(response.docs.is_empty());
        assert_eq!(response.num_docs, 0);
        assert!(!response.timeout);
    }

    #[test]
    fn flush_settles_the_counters() {
        let engine = Engine::new(proximity_options()).unwrap();
        add_proximity_docs(&engine);

        let stats = engine.stats();
        assert_eq!(stats.num_indexing_requests, 3);
        assert_eq!(stats.num_documents_indexed, 3);
        assert_eq!(stats.num_token_index_added, 6);
        assert_eq!(stats.num_documents_stored, 0);
    }

    #[test]
    fn search_timeout_reports_partial_results() {
        let engine = Engine::new(EngineOptions {
            default_rank: RankOptions {
                scoring_criteria: Arc::new(SleepyCriteria),
                ..RankOptions::default()
            },
            ..proximity_options()
        })
        .unwrap();
        add_proximity_docs(&engine);

        let response = engine.search(SearchRequest {
            timeout_ms: 5,
            ..query(&["aa", "bb"])
        });
        assert!(response.timeout);
    }

    #[test]
    fn snapshots_restore_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let options = || EngineOptions {
            storage_folder: Some(dir.path().to_path_buf()),
            ..proximity_options()
        };

        let engine = Engine::new(options()).unwrap();
        add_proximity_docs(&engine);
        engine.remove_document(2);
        engine.flush_index();
        let stats = engine.stats();
        assert_eq!(stats.num_indexing_requests, 4);
        assert_eq!(stats.num_documents_stored, 4);
        engine.close().unwrap();

        let restored = Engine::new(options()).unwrap();
        let response = restored.search(query(&["aa", "bb"]));
        assert_eq!(
            results(&response),
            vec![(3, 500, vec![0, 3]), (1, 58, vec![0, 18])]
        );
        assert_eq!(response.num_docs, 2);
        restored.close().unwrap();
    }
}
