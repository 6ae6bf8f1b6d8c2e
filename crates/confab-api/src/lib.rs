//! # confab-api — Axum API Service for Confab
//!
//! The HTTP layer sitting between domain handlers and the transport. Its
//! job is normalization: every JSON response leaves in the canonical
//! `{status, status_code, message, data}` envelope, every uncaught failure
//! funnels through one normalizer with environment-aware redaction, and
//! the generated OpenAPI document mirrors that same envelope shape.
//!
//! ## API Surface
//!
//! | Route                  | Module            | Notes                    |
//! |------------------------|-------------------|--------------------------|
//! | `/users/*`             | [`routes::users`] | Accounts and sessions    |
//! | `/openapi.json`        | [`openapi`]       | Outside the renderer     |
//! | `/health/*`            | here              | Unauthenticated probes   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → EnvelopeRenderer → ExceptionNormalizer → CatchPanic → Auth → Handler
//! ```
//!
//! Health probes and the OpenAPI document mount outside the renderer:
//! their bodies are not envelope-shaped.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod failure;
pub mod openapi;
pub mod render;
pub mod respond;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::failure::ExceptionNormalizer;
use crate::state::AppState;

pub use error::AppError;

/// Assemble the full application router.
pub fn app(state: AppState, document: Arc<utoipa::openapi::OpenApi>) -> Router {
    let normalizer = ExceptionNormalizer::new(state.config.env_mode);

    // Envelope-wrapped API routes.
    let api = Router::new()
        .merge(routes::users::router())
        .fallback(routes::not_found)
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware))
        .layer(CatchPanicLayer::custom(failure::panic_response))
        .layer(from_fn(failure::normalize_failures))
        .layer(from_fn(render::render_envelope))
        .layer(axum::Extension(normalizer))
        .with_state(state.clone());

    // Plain-bodied routes the renderer must not touch.
    let plain = Router::new()
        .merge(openapi::router(document))
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new()
        .merge(plain)
        .merge(api)
        .layer(TraceLayer::new_for_http())
}

/// Liveness probe — 200 whenever the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 200 when the application can serve.
async fn readiness() -> &'static str {
    "ready"
}
