use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use consult_common::ConsultError;
use std::fmt;
use tracing::error;

/// HTTP face of `ConsultError`
#[derive(Debug)]
pub struct ApiError(pub ConsultError);

impl From<ConsultError> for ApiError {
    fn from(err: ConsultError) -> Self {
        Self(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if !self.0.is_client_error() {
            error!("Request failed: {}", self.0);
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "detail": self.0.to_string(),
        }))
    }
}

/// 404 body for an unknown consultation id
pub fn not_found(id: u64) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "detail": format!("Consultation {} not found", id),
    }))
}
