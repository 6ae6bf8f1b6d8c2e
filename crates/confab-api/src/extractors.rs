//! # Request Extraction & Validation
//!
//! Request DTOs implement [`Validate`] for the business rules serde cannot
//! express. Handlers take `Result<Json<T>, JsonRejection>` and run it
//! through [`validated_json`], so malformed bodies become 400s instead of
//! axum's default rejection shape.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Business-rule validation beyond what deserialization checks.
pub trait Validate {
    /// Return a human-readable message describing the first violated rule.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body extraction and apply its business rules.
///
/// Deserialization failures map to [`AppError::BadRequest`], rule
/// violations to [`AppError::Validation`].
pub fn validated_json<T: Validate>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    let Json(value) = result.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
