use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

use super::types::{ErrorDetail, ErrorResponse};
use crate::error::ServiceError;

/// Failure returned by a handler: either a domain error or a body that could
/// not be decoded.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    InvalidRequest(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::InvalidInput(_) | ServiceError::TeamExists(_) => StatusCode::BAD_REQUEST,
        ServiceError::PrExists(_)
        | ServiceError::PrMerged(_)
        | ServiceError::NotAssigned { .. }
        | ServiceError::NoCandidate(_) => StatusCode::CONFLICT,
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::ConfigError(_) | ServiceError::DatabaseError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_body(status: StatusCode, code: &str, message: String) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message,
        },
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = match &self {
            ServiceError::DatabaseError(e) => {
                // Storage details stay in the log
                error!("Database error: {}", e);
                "internal server error".to_string()
            }
            ServiceError::ConfigError(e) => {
                error!("Configuration error: {}", e);
                "internal server error".to_string()
            }
            other => {
                warn!("Request failed: {}", other);
                other.to_string()
            }
        };
        error_body(status, self.code(), message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(err) => err.into_response(),
            ApiError::InvalidRequest(message) => {
                warn!("Rejected request body: {}", message);
                error_body(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
            }
        }
    }
}
