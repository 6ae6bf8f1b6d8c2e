//! # Response Envelope Renderer
//!
//! Transport-boundary middleware that rewrites every outbound JSON response
//! body into the canonical envelope shape, success and error paths alike.
//! Content negotiation short-circuits wrapping: responses without an
//! `application/json` content type pass through untouched, as do bodies
//! that turn out not to be JSON. The stored body is overwritten, so any
//! downstream layer or test observes only the wrapped form.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use confab_core::envelope::encode;

/// Emitted if envelope serialization itself fails. The wrapping pass must
/// never turn a response into a hung connection.
const FALLBACK_BODY: &[u8] =
    br#"{"status":"Error","status_code":500,"message":"An internal server error occurred.","data":{}}"#;

/// Middleware wrapping JSON response bodies in the canonical envelope.
///
/// Pure, synchronous, single-pass: runs exactly once per outbound response.
pub async fn render_envelope(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if !is_json(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    let payload: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        // Declared JSON but isn't; leave it alone.
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    let envelope = encode(parts.status.as_u16(), payload);
    let wrapped = serde_json::to_vec(&envelope).unwrap_or_else(|_| FALLBACK_BODY.to_vec());

    // The new body has a different length; hyper recomputes the header
    // from the body's size hint.
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(wrapped))
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().starts_with("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::{Json, Router};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(router: Router) -> Router {
        router.layer(from_fn(render_envelope))
    }

    async fn get_json(router: Router, path: &str) -> (StatusCode, Value) {
        let response = app(router)
            .oneshot(
                axum::http::Request::builder()
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn wraps_json_success_bodies() {
        let router = Router::new().route(
            "/ok",
            get(|| async { Json(json!({"message": "ok", "b": 2})) }),
        );
        let (status, body) = get_json(router, "/ok").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Success");
        assert_eq!(body["status_code"], 200);
        assert_eq!(body["message"], "ok");
        assert_eq!(body["data"], json!({"b": 2}));
    }

    #[tokio::test]
    async fn wraps_prebuilt_error_bodies() {
        let router = Router::new().route(
            "/missing",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"detail": "conference 7 not found"})),
                )
            }),
        );
        let (status, body) = get_json(router, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "Error");
        assert_eq!(body["status_code"], 404);
        assert_eq!(body["message"], "conference 7 not found");
        assert_eq!(body["data"], json!({}));
    }

    #[tokio::test]
    async fn wraps_list_payloads_verbatim() {
        let router = Router::new().route("/list", get(|| async { Json(json!([1, 2, 3])) }));
        let (_, body) = get_json(router, "/list").await;
        assert_eq!(body["data"], json!([1, 2, 3]));
        assert_eq!(body["message"], "Operation Successful");
    }

    #[tokio::test]
    async fn non_json_responses_pass_through() {
        let router = Router::new().route("/text", get(|| async { "plain ok" }));
        let response = app(router)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/text")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"plain ok");
    }

    #[tokio::test]
    async fn no_content_passes_through() {
        let router = Router::new().route("/gone", get(|| async { StatusCode::NO_CONTENT }));
        let response = app(router)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/gone")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn content_length_matches_wrapped_body() {
        let router = Router::new().route("/ok", get(|| async { Json(json!({"a": 1})) }));
        let response = app(router)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/ok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let content_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        if let Some(length) = content_length {
            assert_eq!(length, bytes.len());
        }
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"], json!({"a": 1}));
    }
}
