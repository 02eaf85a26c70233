use std::path::PathBuf;
use std::sync::Arc;

use crate::analysis::tokenizer::Tokenizer;
use crate::core::types::ScoringFields;
use crate::scoring::criteria::RankOptions;

/// What a posting list stores per document, beyond the document id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// Membership only; smallest footprint, no scoring signal.
    DocIds,
    /// Per-document term frequencies; enables BM25.
    Frequencies,
    /// Per-document byte offsets; enables BM25 and token proximity.
    Locations,
}

#[derive(Debug, Clone, Copy)]
pub struct Bm25Parameters {
    /// Term-frequency saturation.
    pub k1: f32,
    /// Document-length normalization strength.
    pub b: f32,
}

impl Default for Bm25Parameters {
    fn default() -> Self {
        Bm25Parameters { k1: 2.0, b: 0.75 }
    }
}

#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub index_type: IndexType,
    /// BM25 is skipped entirely when absent.
    pub bm25: Option<Bm25Parameters>,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        IndexerOptions {
            index_type: IndexType::DocIds,
            bm25: Some(Bm25Parameters::default()),
        }
    }
}

pub const DEFAULT_NUM_SHARDS: usize = 2;

/// Engine construction options. Zero-valued worker and buffer fields are
/// filled in from the CPU count by `normalize`, which `Engine::new` calls
/// before anything else.
#[derive(Clone)]
pub struct EngineOptions<F: ScoringFields> {
    pub num_shards: usize,
    pub num_segmenter_workers: usize,
    /// Capacity of each shard's indexer add and lookup queues.
    pub indexer_buffer_length: usize,
    pub num_indexer_workers_per_shard: usize,
    /// Capacity of each shard's ranker add and rank queues.
    pub ranker_buffer_length: usize,
    pub num_ranker_workers_per_shard: usize,
    pub indexer: IndexerOptions,
    pub default_rank: RankOptions<F>,
    /// Custom tokenizer; overrides `dictionary_path` when set.
    pub tokenizer: Option<Arc<dyn Tokenizer>>,
    /// Term dictionary for the built-in maximum-matching tokenizer.
    /// An unreadable path fails `Engine::new`.
    pub dictionary_path: Option<PathBuf>,
    /// Stop-token file, one token per line.
    pub stop_token_path: Option<PathBuf>,
    /// Enables write-through snapshots and warm restart when set.
    pub storage_folder: Option<PathBuf>,
}

impl<F: ScoringFields> Default for EngineOptions<F> {
    fn default() -> Self {
        EngineOptions {
            num_shards: 0,
            num_segmenter_workers: 0,
            indexer_buffer_length: 0,
            num_indexer_workers_per_shard: 0,
            ranker_buffer_length: 0,
            num_ranker_workers_per_shard: 0,
            indexer: IndexerOptions::default(),
            default_rank: RankOptions::default(),
            tokenizer: None,
            dictionary_path: None,
            stop_token_path: None,
            storage_folder: None,
        }
    }
}

impl<F: ScoringFields> EngineOptions<F> {
    pub fn normalize(&mut self) {
        let cpus = num_cpus::get().max(1);
        if self.num_shards == 0 {
            self.num_shards = DEFAULT_NUM_SHARDS;
        }
        if self.num_segmenter_workers == 0 {
            self.num_segmenter_workers = cpus;
        }
        if self.indexer_buffer_length == 0 {
            self.indexer_buffer_length = cpus;
        }
        if self.num_indexer_workers_per_shard == 0 {
            self.num_indexer_workers_per_shard = (cpus / self.num_shards).max(1);
        }
        if self.ranker_buffer_length == 0 {
            self.ranker_buffer_length = cpus;
        }
        if self.num_ranker_workers_per_shard == 0 {
            self.num_ranker_workers_per_shard = (cpus / self.num_shards).max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_fills_zero_fields() {
        let mut options: EngineOptions<()> = EngineOptions::default();
        options.normalize();
        assert_eq!(options.num_shards, DEFAULT_NUM_SHARDS);
        assert!(options.num_segmenter_workers >= 1);
        assert!(options.indexer_buffer_length >= 1);
        assert!(options.num_indexer_workers_per_shard >= 1);
        assert!(options.num_ranker_workers_per_shard >= 1);
    }

    #[test]
    fn normalize_keeps_explicit_fields() {
        let mut options: EngineOptions<()> = EngineOptions {
            num_shards: 8,
            indexer_buffer_length: 3,
            ..EngineOptions::default()
        };
        options.normalize();
        assert_eq!(options.num_shards, 8);
        assert_eq!(options.indexer_buffer_length, 3);
    }
}
