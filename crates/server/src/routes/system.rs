use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use crate::state::AppState;
use crate::types::MessageResponse;

#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::new("Consultation vector search API"))
}

/// Liveness plus embedding model status
#[get("/health")]
pub async fn health(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let gateway = state.service.gateway();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "embedding_model": gateway.model_name(),
        "model_loaded": gateway.is_offline() || gateway.is_loaded(),
    }))
}
