//! # API Route Modules
//!
//! - `users` — accounts, sessions, profile, and admin checks.
//!
//! The fallback below replaces axum's empty 404 with a body the envelope
//! renderer can wrap, so unmatched routes come back envelope-shaped like
//! everything else.

pub mod users;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use confab_core::envelope::default_message;

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": default_message(404) })),
    )
        .into_response()
}
