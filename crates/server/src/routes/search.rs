use actix_web::{get, post, web, HttpResponse};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{SearchRequest, SearchResponse};

/// Search consultations by vector similarity
#[post("/consultations/search")]
pub async fn search(
    req: web::Json<SearchRequest>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let outcome = state
        .service
        .search(&req.query, req.params())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(SearchResponse::from(outcome)))
}

#[get("/search/stats")]
pub async fn search_stats(
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let stats = state.service.stats().await.map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(stats))
}
