//! # Exception Normalization
//!
//! The single fatal-error funnel. Translatable failures ([`AppError`]'s
//! non-internal variants) already carry a well-formed response: they are
//! logged with request context and passed through unmodified. Opaque
//! failures — `AppError::Internal` and handler panics — are logged with
//! full detail and rewritten into a 500 body whose `details` are redacted
//! outside development mode. Redaction applies to the HTTP body only,
//! never to the log line.
//!
//! Nothing in this module can itself fail: body serialization degrades to
//! axum's `Json` fallback, and a missing normalizer extension degrades to
//! production-mode behavior.

use std::any::Any;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use confab_core::envelope::{encode, error_body, Envelope};

use crate::config::EnvMode;
use crate::error::FailureReport;

/// Message used for every opaque failure, regardless of environment.
pub const OPAQUE_FAILURE_MESSAGE: &str = "Internal Server error occurred";

/// Detail text substituted outside development mode.
pub const REDACTED_DETAILS: &str = "Server Error";

/// View name used when no route matched the request.
const UNKNOWN_VIEW: &str = "UnknownView";

/// Request context captured before the handler runs, for the structured
/// error log line.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Matched route template, or `"UnknownView"`.
    pub view: String,
    /// Request path as received.
    pub path: String,
    /// Request method.
    pub method: String,
}

/// Converts uncaught failures into canonical envelopes with
/// environment-aware detail redaction.
///
/// The environment mode is injected at construction, so both behaviors are
/// testable in isolation.
#[derive(Debug, Clone)]
pub struct ExceptionNormalizer {
    mode: EnvMode,
}

impl ExceptionNormalizer {
    /// Create a normalizer for the given environment mode.
    pub fn new(mode: EnvMode) -> Self {
        Self { mode }
    }

    /// Normalize one failure into an envelope, emitting the structured
    /// error log line. Never fails.
    pub fn handle(
        &self,
        report: &FailureReport,
        status: StatusCode,
        ctx: &RequestContext,
    ) -> Envelope {
        // Full trace detail stays in the log regardless of environment.
        tracing::error!(
            view = %ctx.view,
            error = %report.error,
            path = %ctx.path,
            method = %ctx.method,
            "unhandled exception"
        );

        if !report.opaque {
            return encode(status.as_u16(), json!({ "detail": report.detail }));
        }

        let details = if self.mode.expose_details() {
            report.error.clone()
        } else {
            REDACTED_DETAILS.to_string()
        };
        encode(
            500,
            error_body(OPAQUE_FAILURE_MESSAGE, Some(json!({ "details": details }))),
        )
    }
}

/// Middleware implementing the normalization pass.
///
/// Captures request context, runs the rest of the stack, then inspects the
/// response for a [`FailureReport`]. Translatable failures pass through;
/// opaque ones get their bodies rewritten. The envelope renderer sits
/// outside this layer and does the final wrapping.
pub async fn normalize_failures(request: Request, next: Next) -> Response {
    let normalizer = request
        .extensions()
        .get::<ExceptionNormalizer>()
        .cloned()
        .unwrap_or_else(|| ExceptionNormalizer::new(EnvMode::Production));

    let ctx = RequestContext {
        view: request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_VIEW.to_string()),
        path: request.uri().path().to_string(),
        method: request.method().to_string(),
    };

    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<FailureReport>().cloned() else {
        return response;
    };

    let envelope = normalizer.handle(&report, response.status(), &ctx);

    if !report.opaque {
        return response;
    }

    // Emit the raw {message, data} body; the renderer wraps it once.
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(error_body(&envelope.message, Some(envelope.data))),
    )
        .into_response()
}

/// Build the 500 response for a caught handler panic.
///
/// The response carries a [`FailureReport`] so the normalization middleware
/// — which has the request context — logs and redacts it like any other
/// opaque failure.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let text = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "non-string panic payload".to_string()
    };

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": confab_core::envelope::default_message(500) })),
    )
        .into_response();
    response.extensions_mut().insert(FailureReport {
        error: format!("panic: {text}"),
        detail: confab_core::envelope::default_message(500).to_string(),
        opaque: true,
    });
    response
}
