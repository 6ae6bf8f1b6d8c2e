//! # Users — Accounts, Sessions, and Profile
//!
//! ## Endpoints
//!
//! - `POST /users/register` — create an account
//! - `POST /users/login` — verify credentials, mint a session token
//! - `GET  /users/logout` — revoke the presented session
//! - `GET  /users/whoami` — profile plus role group
//! - `GET  /users` — list all accounts (super admin only)
//! - `GET  /users/check-admin` — super-admin gate probe
//!
//! Handlers emit raw `{message, data}` bodies; the envelope renderer wraps
//! them at the transport boundary.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::openapi::path::PathItemType;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{self, require_super_admin, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{validated_json, Validate};
use crate::openapi::wrapper::{NamedSchema, OperationWrap, ResponseOverride, ShapeSpec};
use crate::respond::{self, success, to_json};
use crate::state::{AppState, RoleGroup, SessionRecord, UserRecord};

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to register a new account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username must not be empty".to_string());
        }
        if !self.email.contains('@') {
            return Err("email must be a valid address".to_string());
        }
        if self.password.len() < 8 {
            return Err("password must be at least 8 characters".to_string());
        }
        Ok(())
    }
}

/// Request to log in.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username must not be empty".to_string());
        }
        Ok(())
    }
}

/// Account fields returned by `register`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredUserOut {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for RegisteredUserOut {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Account fields returned by `login`, plus the minted session token.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginOut {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Opaque bearer token for subsequent requests.
    pub token: Uuid,
}

/// Profile fields returned by `whoami`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileUserOut {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_super_admin: bool,
}

impl From<&UserRecord> for ProfileUserOut {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_super_admin: user.is_super_admin,
        }
    }
}

/// Role group as rendered in `whoami`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleGroupOut {
    pub id: Uuid,
    pub name: String,
    /// Capability codenames granted through this group.
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RoleGroup> for RoleGroupOut {
    fn from(group: RoleGroup) -> Self {
        Self {
            id: group.id,
            name: group.name,
            permissions: group.grants,
            created_at: group.created_at,
        }
    }
}

/// Row in the `list_users` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListItem {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserListItem {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", get(logout))
        .route("/users/whoami", get(whoami))
        .route("/users/check-admin", get(check_admin))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /users/register — Create a new account.
#[utoipa::path(
    post,
    path = "/users/register",
    request_body = RegisterRequest,
    responses((status = 200, description = "Successful Register")),
    tag = "users"
)]
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = validated_json(body)?;
    if state.user_by_username(&req.username).is_some() {
        return Err(AppError::Validation(format!(
            "username '{}' is already taken",
            req.username
        )));
    }

    let now = Utc::now();
    let id = Uuid::new_v4();
    let salt = Uuid::new_v4();
    let record = UserRecord {
        id,
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        password_salt: salt,
        password_digest: auth::hash_password(&salt, &req.password),
        is_super_admin: false,
        role_group_id: state.role_group_by_name("User").map(|group| group.id),
        created_at: now,
        updated_at: now,
    };
    state.users.insert(id, record.clone());
    tracing::info!(username = %record.username, "registered user");

    Ok(success(
        "User created successfully",
        Some(to_json(&RegisteredUserOut::from(&record))?),
    ))
}

/// POST /users/login — Verify credentials and mint a session token.
#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful Login"),
        (status = 404, description = "Invalid Credentials"),
    ),
    tag = "users"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = validated_json(body)?;

    let Some(user) = state.user_by_username(&req.username) else {
        return Ok(respond::error(
            StatusCode::NOT_FOUND,
            "User not found",
            None,
        ));
    };

    if !auth::verify_password(&user.password_salt, &req.password, &user.password_digest) {
        return Ok(respond::error(
            StatusCode::NOT_FOUND,
            "Invalid Credentials",
            None,
        ));
    }

    let token = Uuid::new_v4();
    state.sessions.insert(
        token,
        SessionRecord {
            user_id: user.id,
            created_at: Utc::now(),
        },
    );
    tracing::info!(username = %user.username, "logged in");

    let out = LoginOut {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
    };
    Ok(success("User logged in successfully", Some(to_json(&out)?)))
}

/// GET /users/logout — Revoke the presented session.
#[utoipa::path(
    get,
    path = "/users/logout",
    responses((status = 200, description = "Successful Logout")),
    tag = "users"
)]
async fn logout(State(state): State<AppState>, caller: CallerIdentity) -> Response {
    state.sessions.remove(&caller.session_token);
    tracing::info!(username = %caller.username, "logged out");
    success("User logged out successfully", None)
}

/// GET /users/whoami — Profile plus role group.
#[utoipa::path(
    get,
    path = "/users/whoami",
    responses(
        (status = 200, description = "Profile fetched"),
        (status = 400, description = "Unauthenticated"),
    ),
    tag = "users"
)]
async fn whoami(
    State(state): State<AppState>,
    caller: Option<CallerIdentity>,
) -> Result<Response, AppError> {
    let Some(caller) = caller else {
        return Ok(respond::error(
            StatusCode::BAD_REQUEST,
            "User not authenticated",
            None,
        ));
    };

    let user = state
        .users
        .get(&caller.user_id)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let role_group = user
        .role_group_id
        .and_then(|id| state.role_groups.get(&id))
        .map(RoleGroupOut::from);

    let data = json!({
        "user": to_json(&ProfileUserOut::from(&user))?,
        "role_group": role_group.map(|group| to_json(&group)).transpose()?,
    });
    Ok(success("Profile Fetched Successfully", Some(data)))
}

/// GET /users — List all accounts. Super admin only.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users"),
        (status = 403, description = "Forbidden"),
    ),
    tag = "users"
)]
async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Response, AppError> {
    require_super_admin(&caller)?;

    let mut users = state.users.list();
    users.sort_by_key(|user| user.created_at);
    let items: Vec<UserListItem> = users.iter().map(UserListItem::from).collect();
    Ok(success("Fetched All Users", Some(to_json(&items)?)))
}

/// GET /users/check-admin — Super-admin gate probe.
#[utoipa::path(
    get,
    path = "/users/check-admin",
    responses(
        (status = 200, description = "Caller is a super admin"),
        (status = 403, description = "Forbidden"),
    ),
    tag = "users"
)]
async fn check_admin(caller: CallerIdentity) -> Result<Response, AppError> {
    require_super_admin(&caller)?;
    Ok(success("User is Super Admin", None))
}

// ── Documentation wraps ─────────────────────────────────────────────

/// Shape of the login payload.
fn login_output_shape() -> ShapeSpec {
    ShapeSpec::single::<LoginOut>()
}

/// Envelope-wrap declarations for every operation in this module.
pub fn doc_wraps() -> Vec<OperationWrap> {
    vec![
        OperationWrap::new("/users/register", PathItemType::Post, "RegisterUser")
            .input(NamedSchema::of::<RegisterRequest>())
            .output(ShapeSpec::single::<RegisteredUserOut>())
            .override_status(
                200,
                ResponseOverride::new("Successful Register")
                    .message("User Created Successfully")
                    .shape(ShapeSpec::single::<RegisteredUserOut>()),
            ),
        OperationWrap::new("/users/login", PathItemType::Post, "LoginUser")
            .input(NamedSchema::of::<LoginRequest>())
            .override_status(
                200,
                ResponseOverride::new("Successful Login")
                    .message("User Logged In Successfully")
                    .shape(ShapeSpec::Callable(login_output_shape)),
            )
            .override_status(
                404,
                ResponseOverride::new("Invalid Credentials").message("Invalid Credentials"),
            ),
        OperationWrap::new("/users/logout", PathItemType::Get, "LogoutUser").override_status(
            200,
            ResponseOverride::new("Successful Logout").message("User logged out"),
        ),
        OperationWrap::new("/users/whoami", PathItemType::Get, "WhoAmI")
            .output(ShapeSpec::Composite(vec![
                ("user".to_string(), ShapeSpec::single::<ProfileUserOut>()),
                ("role_group".to_string(), ShapeSpec::single::<RoleGroupOut>()),
            ]))
            .override_status(
                400,
                ResponseOverride::new("Unauthenticated")
                    .message("User not authenticated")
                    .shape(ShapeSpec::Raw(json!({}))),
            ),
        OperationWrap::new("/users", PathItemType::Get, "FetchAllUsers")
            .output(ShapeSpec::list::<UserListItem>()),
        OperationWrap::new("/users/check-admin", PathItemType::Get, "CheckAdmin")
            .override_status(
                200,
                ResponseOverride::new("Caller is a super admin").message("User is Super Admin"),
            ),
    ]
}
