//! Consultation search retrieval core
//!
//! Vector math, record storage, similarity ranking and the retrieval
//! service that ties them to the embedding gateway

mod engine;
mod ranker;
mod similarity;
mod store;
mod types;

pub use engine::RetrievalService;
pub use ranker::{ExactRanker, SimilarityRanker};
pub use similarity::{cosine_similarity, dot, norm};
pub use store::{JsonRecordStore, RecordStore};
pub use types::{
    IndexStats, PageInfo, RankedPage, Record, SearchOutcome, SearchParams, SimilarityMatch,
    DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT, DEFAULT_THRESHOLD,
};
