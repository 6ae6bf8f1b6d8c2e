//! # Handler Response Helpers
//!
//! Thin axum adapters over the core payload builders. Handlers emit raw
//! `{message, data}` bodies; the envelope renderer does the final wrapping
//! once, at the transport boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use confab_core::envelope::{error_body, success_body};

use crate::error::AppError;

/// 200 success response. Argument order is `(message, payload)`.
pub fn success(message: &str, payload: Option<Value>) -> Response {
    success_with_status(StatusCode::OK, message, payload)
}

/// Success response with an explicit status code.
pub fn success_with_status(status: StatusCode, message: &str, payload: Option<Value>) -> Response {
    (status, Json(success_body(message, payload))).into_response()
}

/// 201 shortcut. Same `(message, payload)` order as [`success`].
pub fn created(message: &str, payload: Option<Value>) -> Response {
    success_with_status(StatusCode::CREATED, message, payload)
}

/// Error response with the given status.
pub fn error(status: StatusCode, message: &str, details: Option<Value>) -> Response {
    (status, Json(error_body(message, details))).into_response()
}

/// 204 with no body. Carries no JSON content type, so the renderer leaves
/// it untouched.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Serialize a DTO into a payload value, mapping the (practically
/// unreachable) failure into the opaque error funnel.
pub fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|err| AppError::Internal(anyhow::Error::new(err)))
}
