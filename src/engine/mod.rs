pub mod engine;
pub mod router;

pub(crate) mod indexer_worker;
pub(crate) mod ranker_worker;
pub(crate) mod segmenter_worker;
pub(crate) mod storage_worker;
