//! # OpenAPI Document Assembly
//!
//! Derives the base document from the annotated routes, then rewrites every
//! documented operation's responses through the envelope schema wrapper so
//! documentation and runtime wrapping stay structurally consistent.
//!
//! The document is built once at startup — [`build_document`] fails fast on
//! malformed wrap declarations — and served read-only thereafter.

pub mod wrapper;

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Json, Router};
use utoipa::openapi::path::PathItemType;
use utoipa::openapi::response::{Responses, ResponsesBuilder};
use utoipa::openapi::{Components, RefOr};
use utoipa::OpenApi;

use crate::routes;
use crate::state::AppState;

use self::wrapper::{build_operation, OperationWrap, SchemaBuildError, SchemaRegistry};

/// Base OpenAPI document derived from the annotated routes.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Confab API",
        version = "0.3.2",
        description = "Multi-tenant backoffice API. Every response body is the canonical status/status_code/message/data envelope.",
        license(name = "MIT")
    ),
    paths(
        crate::routes::users::register,
        crate::routes::users::login,
        crate::routes::users::logout,
        crate::routes::users::whoami,
        crate::routes::users::list_users,
        crate::routes::users::check_admin,
    ),
    components(schemas(
        crate::routes::users::RegisterRequest,
        crate::routes::users::LoginRequest,
    )),
    tags(
        (name = "users", description = "Accounts, sessions, and profile"),
    )
)]
struct ApiDoc;

/// Apply a set of operation wraps to a generated document, replacing each
/// operation's responses with the synthesized wrapped set and registering
/// every component the wraps produced.
pub fn apply_wraps(
    doc: &mut utoipa::openapi::OpenApi,
    wraps: &[OperationWrap],
) -> Result<(), SchemaBuildError> {
    let mut registry = SchemaRegistry::default();

    for wrap in wraps {
        let built = build_operation(wrap, &mut registry)?;

        let operation = doc
            .paths
            .paths
            .get_mut(&wrap.path)
            .and_then(|item| item.operations.get_mut(&wrap.method))
            .ok_or_else(|| SchemaBuildError::UnknownOperation {
                method: method_name(&wrap.method).to_string(),
                path: wrap.path.clone(),
            })?;

        operation.responses = to_responses(built.responses);
        if built.request_body.is_some() {
            operation.request_body = built.request_body;
        }
    }

    let components = doc.components.get_or_insert_with(Components::default);
    for (name, schema) in registry.into_schemas() {
        components.schemas.insert(name, schema);
    }
    Ok(())
}

fn to_responses(
    built: std::collections::BTreeMap<u16, utoipa::openapi::response::Response>,
) -> Responses {
    let mut builder = ResponsesBuilder::new();
    for (code, response) in built {
        builder = builder.response(code.to_string(), RefOr::T(response));
    }
    builder.build()
}

fn method_name(method: &PathItemType) -> &'static str {
    match method {
        PathItemType::Get => "GET",
        PathItemType::Post => "POST",
        PathItemType::Put => "PUT",
        PathItemType::Delete => "DELETE",
        PathItemType::Options => "OPTIONS",
        PathItemType::Head => "HEAD",
        PathItemType::Patch => "PATCH",
        PathItemType::Trace => "TRACE",
        PathItemType::Connect => "CONNECT",
    }
}

/// Build the complete, envelope-wrapped OpenAPI document.
///
/// Called once at startup; schema build errors abort boot instead of
/// surfacing at request time.
pub fn build_document() -> Result<utoipa::openapi::OpenApi, SchemaBuildError> {
    let mut doc = ApiDoc::openapi();
    apply_wraps(&mut doc, &routes::users::doc_wraps())?;
    Ok(doc)
}

/// Router serving the prebuilt document at `/openapi.json`.
pub fn router(document: Arc<utoipa::openapi::OpenApi>) -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .layer(Extension(document))
}

/// GET /openapi.json — the generated OpenAPI specification.
async fn openapi_json(
    Extension(document): Extension<Arc<utoipa::openapi::OpenApi>>,
) -> Json<utoipa::openapi::OpenApi> {
    Json((*document).clone())
}
