// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the content management service.
//!
//! Every failure class carries its own variant so the HTTP layer can map it to
//! the documented status code without inspecting message strings. Reader-side
//! failures are never surfaced through this type; the reader degrades to empty
//! results instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::validator::FieldError;

/// Application error types for the admin write path.
#[derive(Debug, Error)]
pub enum AppError {
    /// Slug or remote file does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// One or more payload fields failed schema validation.
    #[error("validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Missing session or the session lacks the admin role.
    #[error("unauthorized")]
    Auth,

    /// Missing, unknown, expired, or session-mismatched CSRF token.
    #[error("invalid CSRF token")]
    Forbidden,

    /// Client exceeded the configured request budget.
    #[error("too many requests")]
    RateLimited,

    /// Remote version token no longer matches; the write lost a race.
    #[error("remote content changed concurrently: {0}")]
    Conflict(String),

    /// Transport or API failure talking to the remote store.
    #[error("remote store error during {operation} on {path}: {message}")]
    RemoteStore {
        operation: &'static str,
        path: String,
        message: String,
    },

    /// Anything that should never happen during normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error, per the write API contract.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RemoteStore { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body: `{"error": {"message": ..., "details": [...]}}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "request failed");
        }
        let details = match self {
            Self::Validation(ref fields) => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for write-path operations.
pub type Result<T> = std::result::Result<T, AppError>;
