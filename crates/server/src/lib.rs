//! Consultation search HTTP server
//!
//! Actix-web REST API over the retrieval service

mod error;
mod routes;
mod state;
mod types;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use consult_common::{AppConfig, ConsultError, Result};
use consult_vector::RetrievalService;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub use error::ApiError;
pub use state::AppState;
pub use types::{SearchRequest, SearchResponse};

/// API version prefix
pub const API_PREFIX: &str = "/api/v1";

/// Register every route; static `/consultations/*` paths before `{id}`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::system::root)
        .service(routes::system::health)
        .service(
            web::scope(API_PREFIX)
                .service(routes::search::search)
                .service(routes::search::search_stats)
                .service(routes::consultations::create_consultations)
                .service(routes::consultations::create_consultation)
                .service(routes::consultations::list_consultations)
                .service(routes::consultations::get_consultation)
                .service(routes::consultations::update_consultation)
                .service(routes::consultations::delete_consultation)
                .service(routes::embedding::incremental_embedding),
        );
}

fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

/// Start the HTTP server and run until shutdown
pub async fn start_server(config: AppConfig, service: Arc<RetrievalService>) -> Result<()> {
    let bind_addr = config.server_bind_address();
    let origins = config.cors_origins.clone();
    let state = web::Data::new(Arc::new(AppState::new(service)));

    info!("HTTP server listening on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&bind_addr)
    .map_err(|e| ConsultError::config(format!("Failed to bind {}: {}", bind_addr, e)))?
    .run()
    .await?;

    info!("HTTP server stopped");
    Ok(())
}
