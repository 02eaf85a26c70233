use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::config::{IndexType, IndexerOptions};
use crate::core::types::{DocumentIndex, IndexedDocument, ScoringFields};
use crate::index::posting::KeywordIndices;
use crate::index::proximity::compute_token_proximity;
use crate::scoring::ranker::DocInfosShard;

/// The keyword table of one shard, plus the running token-length total used
/// for BM25 length normalization.
#[derive(Debug, Default)]
pub struct InvertedIndexShard {
    pub table: HashMap<String, KeywordIndices>,
    pub total_token_length: f32,
}

/// One shard's inverted index.
///
/// The posting table has its own read/write guard; per-document bookkeeping
/// (token lengths, the document count) lives in the `DocInfosShard` shared
/// with the shard's ranker, behind a second guard. Writers are the shard's
/// single add worker; lookup workers take shared access for the whole scan.
pub struct Indexer<F: ScoringFields> {
    options: IndexerOptions,
    shard: RwLock<InvertedIndexShard>,
    doc_infos: Arc<RwLock<DocInfosShard<F>>>,
}

impl<F: ScoringFields> Indexer<F> {
    pub fn new(options: IndexerOptions, doc_infos: Arc<RwLock<DocInfosShard<F>>>) -> Self {
        Indexer {
            options,
            shard: RwLock::new(InvertedIndexShard::default()),
            doc_infos,
        }
    }

    /// Adds (or re-adds) a segmented document to the shard.
    ///
    /// Posting lists stay ordered by doc id: an existing entry for this
    /// document is overwritten in place, a new one is inserted at its sorted
    /// position. Re-adding is therefore idempotent.
    pub fn add_document(&self, document: &DocumentIndex) {
        // Token-length bookkeeping first; the table update reuses the delta.
        let delta = {
            let mut infos = self.doc_infos.write();
            if !infos.doc_infos.contains_key(&document.doc_id) {
                infos.num_documents += 1;
            }
            let info = infos.doc_infos.entry(document.doc_id).or_default();
            if document.token_length != 0.0 {
                let delta = document.token_length - info.token_length;
                info.token_length = document.token_length;
                delta
            } else {
                0.0
            }
        };

        let mut shard = self.shard.write();
        shard.total_token_length += delta;

        for keyword in &document.keywords {
            if let Some(indices) = shard.table.get_mut(&keyword.text) {
                let (position, found) = indices.search(indices.len(), document.doc_id);
                if found {
                    indices.overwrite(self.options.index_type, position, keyword);
                } else {
                    indices.insert(self.options.index_type, position, document.doc_id, keyword);
                }
            } else {
                shard.table.insert(
                    keyword.text.clone(),
                    KeywordIndices::with_first(self.options.index_type, document.doc_id, keyword),
                );
            }
        }
    }

    /// Finds documents containing all `tokens` and all `labels` (boolean
    /// AND), restricted to `whitelist` when given.
    ///
    /// Tokens are scored (BM25, proximity); labels only have to match. The
    /// scan walks posting lists from high doc ids to low, so results arrive
    /// in descending id order. Returns the hits and the match count; with
    /// `count_docs_only` only the count is produced.
    ///
    /// Legacy quirk, kept on purpose: under a locations index, a keyword
    /// whose location list is empty for the current document (a label
    /// shadowing a content token) yields a single default-proximity result
    /// and stops the scan.
    pub fn lookup(
        &self,
        tokens: &[String],
        labels: &[String],
        whitelist: Option<&HashSet<u64>>,
        count_docs_only: bool,
    ) -> (Vec<IndexedDocument>, usize) {
        let mut docs = Vec::new();
        let mut num_docs = 0;

        let infos = self.doc_infos.read();
        if infos.num_documents == 0 {
            return (docs, num_docs);
        }

        let keywords: Vec<&str> = tokens
            .iter()
            .chain(labels.iter())
            .map(String::as_str)
            .collect();
        if keywords.is_empty() {
            return (docs, num_docs);
        }

        let shard = self.shard.read();
        let mut table: Vec<&KeywordIndices> = Vec::with_capacity(keywords.len());
        for keyword in &keywords {
            match shard.table.get(*keyword) {
                // An unknown keyword can never intersect to anything.
                None => return (docs, num_docs),
                Some(indices) => table.push(indices),
            }
        }

        let avg_doc_length = shard.total_token_length / infos.num_documents as f32;

        // One cursor per keyword; every posting list is walked at most once
        // because cursors only ever move towards lower doc ids.
        let mut cursors: Vec<usize> = table.iter().map(|indices| indices.len() - 1).collect();
        let mut cursor = table[0].len();
        while cursor > 0 {
            cursor -= 1;
            cursors[0] = cursor;
            let base = table[0].doc_ids[cursor];

            if let Some(whitelist) = whitelist {
                if !whitelist.contains(&base) {
                    continue;
                }
            }

            let mut found = true;
            for i in 1..table.len() {
                let (position, matched) = table[i].search(cursors[i] + 1, base);
                if matched {
                    cursors[i] = position;
                } else if position == 0 {
                    // Every remaining id under this keyword is larger than
                    // `base`; no smaller base can match either.
                    return (docs, num_docs);
                } else {
                    cursors[i] = position - 1;
                    found = false;
                    break;
                }
            }
            if !found {
                continue;
            }

            let mut indexed = IndexedDocument {
                doc_id: base,
                ..IndexedDocument::default()
            };

            if self.options.index_type == IndexType::Locations {
                let num_tokens_with_locations = (0..tokens.len())
                    .filter(|&i| !table[i].locations[cursors[i]].is_empty())
                    .count();
                if num_tokens_with_locations != tokens.len() {
                    num_docs += 1;
                    if !count_docs_only {
                        docs.push(IndexedDocument {
                            doc_id: base,
                            ..IndexedDocument::default()
                        });
                    }
                    break;
                }

                if !tokens.is_empty() {
                    let lists: Vec<&[usize]> = (0..tokens.len())
                        .map(|i| table[i].locations[cursors[i]].as_slice())
                        .collect();
                    let lengths: Vec<usize> = tokens.iter().map(|token| token.len()).collect();
                    let (proximity, snippet) = compute_token_proximity(&lists, &lengths);
                    indexed.token_proximity = proximity;
                    indexed.token_snippet_locations = snippet;
                    indexed.token_locations = lists.iter().map(|list| list.to_vec()).collect();
                }
            }

            if matches!(
                self.options.index_type,
                IndexType::Locations | IndexType::Frequencies
            ) {
                indexed.bm25 = self.compute_bm25(&table[..tokens.len()], &cursors, base, avg_doc_length, &infos);
            }

            num_docs += 1;
            if !count_docs_only {
                docs.push(indexed);
            }
        }

        (docs, num_docs)
    }

    fn compute_bm25(
        &self,
        token_table: &[&KeywordIndices],
        cursors: &[usize],
        doc_id: u64,
        avg_doc_length: f32,
        infos: &DocInfosShard<F>,
    ) -> f32 {
        let Some(params) = self.options.bm25 else {
            return 0.0;
        };
        let doc_length = infos
            .doc_infos
            .get(&doc_id)
            .map(|info| info.token_length)
            .unwrap_or(0.0);

        let mut bm25 = 0.0;
        for (i, indices) in token_table.iter().enumerate() {
            let frequency = match self.options.index_type {
                IndexType::Locations => indices.locations[cursors[i]].len() as f32,
                IndexType::Frequencies => indices.frequencies[cursors[i]],
                IndexType::DocIds => 0.0,
            };
            if indices.is_empty() || frequency <= 0.0 || avg_doc_length == 0.0 {
                continue;
            }
            // Smoothed idf; non-standard on purpose, kept for score
            // stability with existing deployments.
            let idf =
                (infos.num_documents as f32 / indices.doc_ids.len() as f32 + 1.0).log2();
            bm25 += idf * frequency * (params.k1 + 1.0)
                / (frequency + params.k1 * (1.0 - params.b + params.b * doc_length / avg_doc_length));
        }
        bm25
    }

    /// Installs a posting list as restored from a snapshot.
    pub(crate) fn install_posting(&self, token: String, indices: KeywordIndices) {
        self.shard.write().table.insert(token, indices);
    }

    /// Clones the posting table for snapshotting.
    pub(crate) fn snapshot_postings(&self) -> Vec<(String, KeywordIndices)> {
        self.shard
            .read()
            .table
            .iter()
            .map(|(token, indices)| (token.clone(), indices.clone()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn posting_doc_ids(&self, token: &str) -> Vec<u64> {
        self.shard
            .read()
            .table
            .get(token)
            .map(|indices| indices.doc_ids.clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn posting_len(&self, token: &str) -> usize {
        self.posting_doc_ids(token).len()
    }
}
