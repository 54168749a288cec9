use actix_web::{post, web, HttpResponse};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::IncrementalEmbeddingResponse;

/// Re-embed every record whose embedding is missing or has the wrong dimension
#[post("/incremental_embedding")]
pub async fn incremental_embedding(
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    info!("Starting incremental embedding");

    let processed_count = state
        .service
        .reindex_missing()
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(IncrementalEmbeddingResponse {
        success: true,
        processed_count,
        message: format!("Incremental embedding complete: {} records processed", processed_count),
    }))
}
