//! API error type
//!
//! Every handler failure becomes a JSON body `{ "error": <code>, "message": ... }`.
//! Validation failures add a `fields` array and use 422.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use uhan_common::export::ExportError;
use uhan_common::members::MemberError;
use uhan_common::validation::ValidationReport;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{}", .0.summary())]
    Validation(ValidationReport),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Common(#[from] uhan_common::Error),
}

impl From<MemberError> for ApiError {
    fn from(e: MemberError) -> Self {
        match e {
            MemberError::NotFound(id) => ApiError::NotFound(format!("Member not found: {}", id)),
            MemberError::Invalid(report) => ApiError::Validation(report),
            MemberError::Storage(e) => ApiError::Common(e),
        }
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::SessionNotFound(_) | ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
            ApiError::Export(ExportError::InProgress) => (StatusCode::CONFLICT, "export_in_progress"),
            ApiError::Export(ExportError::Pack(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "export_failed"),
            ApiError::Export(_) => (StatusCode::UNPROCESSABLE_ENTITY, "export_failed"),
            ApiError::Common(uhan_common::Error::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Common(uhan_common::Error::InvalidInput(_)) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Common(e) if e.is_io() => (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
            ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("{}: {}", code, self);
        }

        let body = match &self {
            ApiError::Validation(report) => json!({
                "error": code,
                "message": self.to_string(),
                "fields": report.errors,
            }),
            _ => json!({
                "error": code,
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
