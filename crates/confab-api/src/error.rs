//! # API Error Types
//!
//! [`AppError`] is the translatable-error chain: each non-internal variant
//! already maps to a well-formed HTTP response whose body carries a
//! `detail` key, which the envelope renderer lifts into the canonical
//! `message` field at the transport boundary.
//!
//! `Internal` is the opaque case. Its `IntoResponse` emits a placeholder
//! body only — the exception normalizer rewrites it with environment-aware
//! redaction. Every `AppError` response carries a [`FailureReport`] in its
//! extensions so the normalization middleware can log with request context.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use confab_core::envelope::default_message;

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request failed business-rule validation (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid session (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — gate denied the caller (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Anything unforeseen (500). Logged in full, redacted for clients
    /// outside development mode by the exception normalizer.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-facing detail line.
    ///
    /// For `Internal` this is only a placeholder: the normalizer replaces
    /// the whole body before it can reach a client.
    pub fn detail(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg) => msg.clone(),
            Self::Internal(_) => default_message(500).to_string(),
        }
    }

    /// Whether this failure is opaque (must be redacted outside development).
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Failure record smuggled through response extensions.
///
/// The normalization middleware reads it to log the structured error line
/// with request context and, for opaque failures, to rewrite the body.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// Full display form of the originating failure, for logs only.
    pub error: String,
    /// The client-facing detail line the response body carries.
    pub detail: String,
    /// True for opaque failures.
    pub opaque: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.detail();
        // Opaque failures report the underlying error chain verbatim; the
        // variant prefix would otherwise leak into development-mode details.
        let error = match &self {
            Self::Internal(inner) => format!("{inner:#}"),
            other => other.to_string(),
        };
        let report = FailureReport {
            error,
            detail: detail.clone(),
            opaque: self.is_opaque(),
        };

        let mut response =
            (status, Json(serde_json::json!({ "detail": detail }))).into_response();
        response.extensions_mut().insert(report);
        response
    }
}
