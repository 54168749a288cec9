use consult_vector::RetrievalService;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    /// Retrieval service (store + embeddings + ranking)
    pub service: Arc<RetrievalService>,
}

impl AppState {
    /// Create new application state
    pub fn new(service: Arc<RetrievalService>) -> Self {
        Self { service }
    }
}
