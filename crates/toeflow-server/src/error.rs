//! API errors and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use toeflow_core::SessionError;
use toeflow_review::ReviewError;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or blank {0} header")]
    MissingActor(&'static str),

    #[error(transparent)]
    Review(#[from] ReviewError),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Review(err.into())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        let review = match self {
            Self::MissingActor(_) => return (StatusCode::UNAUTHORIZED, "MISSING_ACTOR"),
            Self::Review(review) => review,
        };
        if review.is_not_found() {
            return (StatusCode::NOT_FOUND, "NOT_FOUND");
        }
        match review {
            ReviewError::InvalidTransition(_) | ReviewError::ReviewsOutstanding { .. } => {
                (StatusCode::CONFLICT, "INVALID_TRANSITION")
            }
            ReviewError::StaleSubmission { .. }
            | ReviewError::Session(SessionError::StaleRequest { .. }) => {
                (StatusCode::CONFLICT, "STALE_SUBMISSION")
            }
            ReviewError::DocumentSigned(_) => (StatusCode::CONFLICT, "DOCUMENT_SIGNED"),
            ReviewError::EmptyReviewerSet => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_REVIEWER_SET"),
            ReviewError::NotAssignedReviewer { .. } => (StatusCode::FORBIDDEN, "NOT_ASSIGNED_REVIEWER"),
            ReviewError::Session(_) | ReviewError::InvalidField(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
            ReviewError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
