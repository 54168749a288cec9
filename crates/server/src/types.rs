use chrono::{DateTime, Utc};
use consult_vector::{
    PageInfo, Record, SearchOutcome, SearchParams, SimilarityMatch, DEFAULT_LIST_LIMIT,
    DEFAULT_SEARCH_LIMIT, DEFAULT_THRESHOLD,
};
use serde::{Deserialize, Serialize};

/// Create/update request body
#[derive(Debug, Deserialize)]
pub struct ConsultationRequest {
    /// Consultation text
    pub text: String,
}

/// Bulk create request body
#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub texts: Vec<String>,
}

/// List query string
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: usize,

    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

/// Search request body
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Search query text
    pub query: String,

    /// Page size
    pub limit: Option<usize>,

    /// Matches to skip; wins over `page` when both are given
    pub skip: Option<usize>,

    /// 1-based page number, used only when `skip` is absent
    pub page: Option<usize>,

    /// Minimum similarity (0.0 - 1.0)
    pub similarity_threshold: Option<f32>,
}

impl SearchRequest {
    /// Resolve threshold and window, deriving `skip` from `page` if needed
    pub fn params(&self) -> SearchParams {
        let limit = self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let skip = match (self.skip, self.page) {
            (Some(skip), _) => skip,
            (None, Some(page)) => page.saturating_sub(1).saturating_mul(limit),
            (None, None) => 0,
        };
        SearchParams::new(
            self.similarity_threshold.unwrap_or(DEFAULT_THRESHOLD),
            skip,
            limit,
        )
    }
}

/// Record as returned to clients (no embedding)
#[derive(Debug, Serialize)]
pub struct ConsultationResponse {
    pub id: u64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Record> for ConsultationResponse {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            text: record.text,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Bulk create response
#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub created: Vec<ConsultationResponse>,
}

/// One search hit
#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub id: u64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub similarity: f32,
}

impl From<SimilarityMatch> for SearchResultItem {
    fn from(m: SimilarityMatch) -> Self {
        Self {
            id: m.record.id,
            text: m.record.text,
            created_at: m.record.created_at,
            updated_at: m.record.updated_at,
            similarity: m.similarity,
        }
    }
}

/// Search response with page metadata
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        let PageInfo {
            page,
            limit,
            total_pages,
            has_next,
            has_prev,
        } = outcome.page;

        Self {
            results: outcome.matches.into_iter().map(SearchResultItem::from).collect(),
            total: outcome.total,
            page,
            limit,
            total_pages,
            has_next,
            has_prev,
        }
    }
}

/// Incremental embedding response
#[derive(Debug, Serialize)]
pub struct IncrementalEmbeddingResponse {
    pub success: bool,
    pub processed_count: usize,
    pub message: String,
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
