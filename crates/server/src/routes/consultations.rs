use actix_web::{delete, get, post, put, web, HttpResponse};
use std::sync::Arc;
use tracing::info;

use crate::error::{not_found, ApiError};
use crate::state::AppState;
use crate::types::{
    BatchCreateRequest, BatchCreateResponse, ConsultationRequest, ConsultationResponse,
    ListQuery, MessageResponse,
};

/// Create a new consultation
#[post("/consultations")]
pub async fn create_consultation(
    req: web::Json<ConsultationRequest>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let record = state.service.create(&req.text).await.map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(ConsultationResponse::from(record)))
}

/// Create many consultations in one call
#[post("/consultations/batch")]
pub async fn create_consultations(
    req: web::Json<BatchCreateRequest>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    info!("Bulk create requested: {} texts", req.texts.len());

    let records = state
        .service
        .create_many(&req.texts)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(BatchCreateResponse {
        created: records.into_iter().map(ConsultationResponse::from).collect(),
    }))
}

/// List consultations, newest first
#[get("/consultations")]
pub async fn list_consultations(
    query: web::Query<ListQuery>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let records = state
        .service
        .list(query.skip, query.limit)
        .await
        .map_err(ApiError::from)?;

    let body: Vec<ConsultationResponse> =
        records.into_iter().map(ConsultationResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[get("/consultations/{id}")]
pub async fn get_consultation(
    path: web::Path<u64>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let id = path.into_inner();
    match state.service.get(id).await.map_err(ApiError::from)? {
        Some(record) => Ok(HttpResponse::Ok().json(ConsultationResponse::from(record))),
        None => Ok(not_found(id)),
    }
}

/// Replace text and recompute the embedding
#[put("/consultations/{id}")]
pub async fn update_consultation(
    path: web::Path<u64>,
    req: web::Json<ConsultationRequest>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let id = path.into_inner();
    match state.service.update(id, &req.text).await.map_err(ApiError::from)? {
        Some(record) => Ok(HttpResponse::Ok().json(ConsultationResponse::from(record))),
        None => Ok(not_found(id)),
    }
}

#[delete("/consultations/{id}")]
pub async fn delete_consultation(
    path: web::Path<u64>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    let id = path.into_inner();
    match state.service.delete(id).await.map_err(ApiError::from)? {
        Some(_) => Ok(HttpResponse::Ok().json(MessageResponse::new("Consultation deleted"))),
        None => Ok(not_found(id)),
    }
}
