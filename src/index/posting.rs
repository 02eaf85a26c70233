use serde::{Deserialize, Serialize};

use crate::core::config::IndexType;
use crate::core::types::KeywordIndex;

/// One row of the inverted table: every document a keyword occurs in,
/// ordered by ascending doc id.
///
/// Which parallel array is populated depends on the shard's `IndexType`;
/// the populated one always has the same length as `doc_ids`, with
/// index-aligned entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordIndices {
    pub doc_ids: Vec<u64>,
    /// `IndexType::Frequencies` only.
    pub frequencies: Vec<f32>,
    /// `IndexType::Locations` only; each inner list is ascending byte starts.
    pub locations: Vec<Vec<usize>>,
}

impl KeywordIndices {
    /// A fresh posting list holding a single document.
    pub fn with_first(index_type: IndexType, doc_id: u64, keyword: &KeywordIndex) -> Self {
        let mut indices = KeywordIndices {
            doc_ids: vec![doc_id],
            ..KeywordIndices::default()
        };
        match index_type {
            IndexType::Locations => indices.locations.push(keyword.starts.clone()),
            IndexType::Frequencies => indices.frequencies.push(keyword.frequency),
            IndexType::DocIds => {}
        }
        indices
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Binary search for `doc_id` within `doc_ids[..upper]`. Returns the
    /// match position, or the insertion point that keeps the list ordered.
    pub fn search(&self, upper: usize, doc_id: u64) -> (usize, bool) {
        match self.doc_ids[..upper].binary_search(&doc_id) {
            Ok(position) => (position, true),
            Err(position) => (position, false),
        }
    }

    /// Replaces the per-document payload at `position` with the keyword's.
    pub fn overwrite(&mut self, index_type: IndexType, position: usize, keyword: &KeywordIndex) {
        match index_type {
            IndexType::Locations => self.locations[position] = keyword.starts.clone(),
            IndexType::Frequencies => self.frequencies[position] = keyword.frequency,
            IndexType::DocIds => {}
        }
    }

    /// Inserts a document at `position`, shifting the tail of every parallel
    /// array by one.
    pub fn insert(
        &mut self,
        index_type: IndexType,
        position: usize,
        doc_id: u64,
        keyword: &KeywordIndex,
    ) {
        match index_type {
            IndexType::Locations => self.locations.insert(position, keyword.starts.clone()),
            IndexType::Frequencies => self.frequencies.insert(position, keyword.frequency),
            IndexType::DocIds => {}
        }
        self.doc_ids.insert(position, doc_id);
    }
}
