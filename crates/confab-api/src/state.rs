//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. Everything lives in cloneable in-memory stores —
//! persistence is a collaborator this layer deliberately does not model.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::config::AppConfig;

// ── Generic in-memory store ─────────────────────────────────────────

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (`parking_lot::RwLock`, never held
/// across `.await` points), and a panicking writer cannot poison the
/// store.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by id.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// First record matching the predicate, if any.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|value| predicate(value)).cloned()
    }

    /// Update a record in place. Returns the updated record, or `None` if
    /// the key is absent.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        match guard.get_mut(id) {
            Some(entry) => {
                f(entry);
                Some(entry.clone())
            }
            None => None,
        }
    }

    /// Remove a record by id.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Record types ────────────────────────────────────────────────────

/// A registered user account.
///
/// Credential fields never leave this struct; route DTOs project the
/// public subset.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Salt mixed into the password digest.
    pub password_salt: Uuid,
    /// Hex-encoded salted SHA-256 digest of the password.
    pub password_digest: String,
    pub is_super_admin: bool,
    pub role_group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An active login session, keyed by its opaque bearer token.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A named set of capability grants.
#[derive(Debug, Clone)]
pub struct RoleGroup {
    pub id: Uuid,
    pub name: String,
    /// Capability codenames granted to members.
    pub grants: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ── AppState ────────────────────────────────────────────────────────

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub users: Store<UserRecord>,
    pub sessions: Store<SessionRecord>,
    pub role_groups: Store<RoleGroup>,
}

impl AppState {
    /// Create empty state with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            users: Store::new(),
            sessions: Store::new(),
            role_groups: Store::new(),
        }
    }

    /// Find a user by username. Usernames are unique — registration
    /// rejects duplicates.
    pub fn user_by_username(&self, username: &str) -> Option<UserRecord> {
        self.users.find(|user| user.username == username)
    }

    /// Find a role group by its display name.
    pub fn role_group_by_name(&self, name: &str) -> Option<RoleGroup> {
        self.role_groups.find(|group| group.name == name)
    }

    /// Resolve a session token into a caller identity, joining the user's
    /// role-group grants.
    pub fn identity_for_session(&self, token: &Uuid) -> Option<CallerIdentity> {
        let session = self.sessions.get(token)?;
        let user = self.users.get(&session.user_id)?;
        let grants = user
            .role_group_id
            .and_then(|id| self.role_groups.get(&id))
            .map(|group| group.grants)
            .unwrap_or_default();
        Some(CallerIdentity {
            user_id: user.id,
            username: user.username,
            session_token: *token,
            is_super_admin: user.is_super_admin,
            grants,
        })
    }
}
