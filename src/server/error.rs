//! HTTP error mapping
//!
//! Every failure leaves the service as `{"detail": "..."}` with a fixed
//! status. Internal failures carry a stable code only; their cause is logged
//! where it happens and never sent to the client.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::services::QuotaError;

/// Request payload failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("output_text must be at least {min} characters")]
    TextTooShort { min: usize },

    #[error("output_text exceeds max length of {max} characters")]
    TextTooLong { max: usize },

    #[error("seed must be between 0 and {max}")]
    SeedOutOfRange { max: u64 },

    #[error("items must contain at least 1 entry")]
    EmptyBatch,

    #[error("batch size exceeds limit of {max}")]
    BatchTooLarge { max: usize },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Body could not be decoded as the expected JSON shape
    #[error("{detail}")]
    Malformed { status: StatusCode, detail: String },

    #[error("rate_limit_exceeded")]
    RateLimited,

    #[error("quota_exceeded")]
    QuotaExceeded(#[from] QuotaError),

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Malformed { status, .. } => *status,
            ApiError::RateLimited | ApiError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::EmptyBatch).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::from(QuotaError::UserQuotaExceeded("u".into())).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Internal("reverse_engineering_failed").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_quota_detail_hides_identity() {
        let err = ApiError::from(QuotaError::KeyQuotaExceeded("secret-key".into()));
        assert_eq!(err.to_string(), "quota_exceeded");
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::TextTooLong { max: 12000 }.to_string(),
            "output_text exceeds max length of 12000 characters"
        );
        assert_eq!(
            ValidationError::BatchTooLarge { max: 20 }.to_string(),
            "batch size exceeds limit of 20"
        );
    }
}
