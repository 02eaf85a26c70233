//! Sharded in-memory full-text search engine for short documents.
//!
//! Documents are tokenized, routed to a shard by id and inserted into that
//! shard's inverted index through a pipeline of worker threads. Searches are
//! boolean AND over tokens and labels, scored by BM25 and token proximity
//! and ranked by pluggable criteria; optional write-through snapshots allow
//! warm restarts.

pub mod analysis;
pub mod core;
pub mod engine;
pub mod index;
pub mod scoring;
pub mod storage;

pub use crate::core::config::{
    Bm25Parameters, EngineOptions, IndexType, IndexerOptions,
};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{
    DocumentIndexData, IndexedDocument, ScoredDocument, ScoringFields, SearchRequest,
    SearchResponse, TokenData,
};
pub use crate::engine::engine::{Engine, EngineStats};
pub use crate::scoring::criteria::{RankByBm25, RankOptions, ScoringCriteria};
