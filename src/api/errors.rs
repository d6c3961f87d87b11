//! API error handling.
//!
//! Structured error responses with machine-readable reason codes, proper
//! HTTP status codes, and request tracking.

use crate::errors::GameError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Top-level API error response with request tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error category (validation, phase, insufficient_funds, ...).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Phase reason when the category is `phase` (too_late, betting_closed, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A game rejection bound to the request that triggered it.
#[derive(Debug)]
pub struct ApiError {
    pub error: GameError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(request_id: String, error: GameError) -> Self {
        Self { error, request_id }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.error {
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::Phase { .. } => StatusCode::CONFLICT,
            GameError::InsufficientFunds => StatusCode::BAD_REQUEST,
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Banned => StatusCode::FORBIDDEN,
            GameError::Fairness(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: self.error.code().to_string(),
                message: self.error.to_string(),
                reason: self.error.phase_reason().map(|r| r.to_string()),
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GameError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (GameError::phase("too_late"), StatusCode::CONFLICT),
            (GameError::InsufficientFunds, StatusCode::BAD_REQUEST),
            (GameError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (GameError::Banned, StatusCode::FORBIDDEN),
        ];
        for (error, expected) in cases {
            let response = ApiError::new("req-1".into(), error).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
