//! # Session Authentication & Authorization Gates
//!
//! Opaque bearer session tokens resolved against the in-memory session
//! store. Authenticated requests get a [`CallerIdentity`] injected into
//! the request extensions; handlers extract it via `FromRequestParts`.
//! Requests without an `Authorization` header proceed anonymously and fail
//! at the extractor if the handler requires an identity.
//!
//! Authorization is composed per endpoint: the super-admin-only gate and
//! capability checks keyed by resolver-produced codenames.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Denial message for the super-admin gate. Surfaces as the 403 envelope
/// message through the `detail` precedence.
pub const NOT_SUPER_ADMIN: &str = "User is not Super Admin";

// ── Caller identity ─────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's user record id.
    pub user_id: Uuid,
    /// The caller's username.
    pub username: String,
    /// The session token the caller presented. Kept so logout can revoke it.
    pub session_token: Uuid,
    /// Process-recognized super-admin flag.
    pub is_super_admin: bool,
    /// Capability codenames granted through the caller's role group.
    pub grants: Vec<String>,
}

impl CallerIdentity {
    /// Whether the caller holds the given capability. Super admins hold
    /// every capability implicitly.
    pub fn has_capability(&self, codename: &str) -> bool {
        self.is_super_admin || self.grants.iter().any(|grant| grant == codename)
    }
}

/// Extracts the identity the auth middleware injected into extensions.
/// Rejects with 401 when the request is anonymous.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthorized("Authentication credentials were not provided.".to_string())
            })
    }
}

// ── Gates ───────────────────────────────────────────────────────────

/// Super-admin-only gate: true iff the caller carries the super-admin
/// flag. No partial grants.
pub fn check_super_admin(caller: &CallerIdentity) -> bool {
    caller.is_super_admin
}

/// Enforce the super-admin gate. The failure short-circuits the handler
/// and becomes the 403 envelope.
pub fn require_super_admin(caller: &CallerIdentity) -> Result<(), AppError> {
    if check_super_admin(caller) {
        Ok(())
    } else {
        Err(AppError::Forbidden(NOT_SUPER_ADMIN.to_string()))
    }
}

/// Enforce a capability gate keyed by a resolver-produced codename.
pub fn require_capability(caller: &CallerIdentity, codename: &str) -> Result<(), AppError> {
    if caller.has_capability(codename) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Missing permission '{codename}'"
        )))
    }
}

// ── Password digests ────────────────────────────────────────────────

/// Compute the salted password digest stored on a user record.
pub fn hash_password(salt: &Uuid, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time comparison of a presented password against the stored
/// digest.
pub fn verify_password(salt: &Uuid, password: &str, stored_digest: &str) -> bool {
    let computed = hash_password(salt, password);
    computed.as_bytes().ct_eq(stored_digest.as_bytes()).into()
}

// ── Middleware ──────────────────────────────────────────────────────

/// Resolve `Authorization: Bearer <token>` into a [`CallerIdentity`].
///
/// Invalid tokens are rejected with 401 here; a missing header is not an
/// error at this layer.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let Some(value) = header_value else {
        return next.run(request).await;
    };

    let Some(token) = value.strip_prefix("Bearer ") else {
        tracing::warn!("authentication failed: non-Bearer authorization scheme");
        return unauthorized("Authorization header must use Bearer scheme.");
    };

    let Ok(token) = token.parse::<Uuid>() else {
        tracing::warn!("authentication failed: malformed session token");
        return unauthorized("Invalid session token.");
    };

    match state.identity_for_session(&token) {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            tracing::warn!("authentication failed: unknown session token");
            unauthorized("Invalid session token.")
        }
    }
}

fn unauthorized(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
}
