pub mod criteria;
pub mod ranker;
