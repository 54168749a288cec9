use chrono::{DateTime, Utc};
use consult_common::{ConsultError, Result};
use serde::{Deserialize, Serialize};

use crate::similarity::norm;

/// Default minimum similarity for a match
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// Default page size for search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Default page size for listing
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Stored consultation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Monotonically assigned, never reused
    pub id: u64,

    /// Consultation text (trimmed, non-empty)
    pub text: String,

    /// Embedding vector; empty for legacy or failed records
    #[serde(default)]
    pub embedding: Vec<f32>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last text/embedding change
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Whether the record carries a scorable embedding of the given
    /// dimension: non-empty, finite and not all zeros
    pub fn has_usable_embedding(&self, dimension: usize) -> bool {
        if self.embedding.is_empty() || self.embedding.len() != dimension {
            return false;
        }
        let n = norm(&self.embedding);
        n.is_finite() && n > 0.0
    }
}

/// One scored record for a single query evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub record: Record,

    /// Cosine similarity in [-1.0, 1.0]
    pub similarity: f32,
}

/// Threshold and window for one search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Minimum similarity, inclusive, within [0.0, 1.0]
    pub threshold: f32,

    /// Top-ranked post-filter matches to skip
    pub skip: usize,

    /// Maximum matches to return (positive)
    pub limit: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            skip: 0,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchParams {
    pub fn new(threshold: f32, skip: usize, limit: usize) -> Self {
        Self { threshold, skip, limit }
    }

    /// Reject out-of-range threshold (including NaN) and a zero limit
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConsultError::invalid_parameters(format!(
                "Similarity threshold must be between 0.0 and 1.0, got {}",
                self.threshold
            )));
        }
        if self.limit == 0 {
            return Err(ConsultError::invalid_parameters("Limit must be positive"));
        }
        Ok(())
    }
}

/// Ranker output: the requested window plus the full match count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedPage {
    pub matches: Vec<SimilarityMatch>,

    /// Matches at or above the threshold, independent of skip/limit
    pub total_count: usize,
}

/// Pagination metadata derived from a result window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    /// Derive page metadata; `limit` must be positive
    pub fn new(total: usize, skip: usize, limit: usize) -> Self {
        let limit = limit.max(1);
        let page = 1 + skip / limit;
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Result of a search through the retrieval service
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub matches: Vec<SimilarityMatch>,
    pub total: usize,
    pub page: PageInfo,
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_records: usize,

    /// Records whose embedding is missing or of the wrong dimension
    pub missing_embeddings: usize,

    pub embedding_model: String,
    pub embedding_dimension: usize,
}
