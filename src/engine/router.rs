/// Deterministic document-to-shard routing.
///
/// Only the document id feeds the hash: routing must stay identical across
/// re-indexes of the same document (content can change on upsert) and across
/// process restarts, or a document would end up owned by two shards.
#[derive(Debug, Clone, Copy)]
pub struct ShardRouter {
    num_shards: usize,
}

impl ShardRouter {
    pub fn new(num_shards: usize) -> Self {
        ShardRouter { num_shards }
    }

    pub fn shard_for(&self, doc_id: u64) -> usize {
        crc32fast::hash(&doc_id.to_le_bytes()) as usize % self.num_shards
    }
}
