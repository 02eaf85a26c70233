use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::scoring::criteria::RankOptions;

/// Marker for user-supplied per-document scoring fields. The engine is
/// generic over the field type; anything cloneable and serde-compatible
/// qualifies via the blanket impl.
pub trait ScoringFields: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> ScoringFields for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

/// A pre-tokenized term with its byte offsets in the document, for callers
/// that run their own tokenizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub text: String,
    pub locations: Vec<usize>,
}

/// Everything the caller hands over for one document.
///
/// When `content` is non-empty it is tokenized by the engine; otherwise the
/// pre-tokenized `tokens` are used as-is. `labels` are searchable keys that
/// do not occur in the text (categories, sources, ...) and never score.
#[derive(Debug, Clone)]
pub struct DocumentIndexData<F> {
    pub content: String,
    pub tokens: Vec<TokenData>,
    pub labels: Vec<String>,
    pub fields: Option<F>,
}

impl<F> Default for DocumentIndexData<F> {
    fn default() -> Self {
        DocumentIndexData {
            content: String::new(),
            tokens: Vec::new(),
            labels: Vec::new(),
            fields: None,
        }
    }
}

/// One (keyword, document) pair produced by segmentation.
/// `starts` holds ascending byte offsets of the keyword in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordIndex {
    pub text: String,
    pub frequency: f32,
    pub starts: Vec<usize>,
}

/// A fully segmented document, the message between the segmenter and a
/// shard's indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIndex {
    pub doc_id: u64,
    /// Token count of the document text, used for BM25 length normalization.
    pub token_length: f32,
    pub keywords: Vec<KeywordIndex>,
}

/// A lookup hit before ranking.
///
/// `bm25` is meaningful for `Frequencies` and `Locations` indexes;
/// proximity and the location vectors only for `Locations` indexes.
/// `token_proximity == -1` means no feasible position selection existed.
#[derive(Debug, Clone, Default)]
pub struct IndexedDocument {
    pub doc_id: u64,
    pub bm25: f32,
    pub token_proximity: i32,
    /// One position per query token, chosen by the proximity computation.
    pub token_snippet_locations: Vec<usize>,
    /// All positions per query token.
    pub token_locations: Vec<Vec<usize>>,
}

/// A ranked result. `scores` is the lexicographic sort key produced by the
/// scoring criteria.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub doc_id: u64,
    pub scores: Vec<f32>,
    pub token_snippet_locations: Vec<usize>,
    pub token_locations: Vec<Vec<usize>>,
}

#[derive(Clone)]
pub struct SearchRequest<F> {
    /// Query phrase; tokenized by the engine when non-empty.
    pub text: String,
    /// Explicit query tokens, used when `text` is empty.
    pub tokens: Vec<String>,
    pub labels: Vec<String>,
    /// When present, only these documents are searched.
    pub doc_ids: Option<HashSet<u64>>,
    /// Per-request rank options; the engine default applies when `None`.
    pub rank: Option<RankOptions<F>>,
    /// Milliseconds; zero or negative disables the deadline.
    pub timeout_ms: i64,
    /// Return only the matched document count.
    pub count_docs_only: bool,
    /// Skip ranking and return raw matches.
    pub orderless: bool,
}

impl<F> Default for SearchRequest<F> {
    fn default() -> Self {
        SearchRequest {
            text: String::new(),
            tokens: Vec::new(),
            labels: Vec::new(),
            doc_ids: None,
            rank: None,
            timeout_ms: 0,
            count_docs_only: false,
            orderless: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// The query tokens actually used, after tokenization and stop filtering.
    pub tokens: Vec<String>,
    pub docs: Vec<ScoredDocument>,
    /// Matched document count; with `count_docs_only` this is the only output.
    pub num_docs: usize,
    /// Set when the deadline expired before every shard reported.
    pub timeout: bool,
}
