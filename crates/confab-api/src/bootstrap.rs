//! # Startup Seeding
//!
//! Seeds the default role groups — the grant matrix is derived through the
//! permission codename resolver rather than enumerated — and, when
//! configured, a bootstrap super-admin account.

use chrono::Utc;
use uuid::Uuid;

use confab_core::permissions::{codename, PermissionAction};

use crate::auth::hash_password;
use crate::state::{AppState, RoleGroup, UserRecord};

/// Default role groups and the CRUD actions each carries across all seeded
/// resource kinds.
const GROUP_ACTIONS: &[(&str, &[PermissionAction])] = &[
    ("Super Admin", &PermissionAction::ALL),
    ("Tenant Admin", &PermissionAction::ALL),
    (
        "Tenant Manager",
        &[PermissionAction::View, PermissionAction::Change],
    ),
    ("User", &[PermissionAction::View, PermissionAction::Add]),
];

/// Resource kinds the default grants cover.
const RESOURCE_KINDS: &[&str] = &["user", "conference", "tenant"];

/// Seed the default role groups into fresh state.
pub fn seed_role_groups(state: &AppState) {
    for (name, actions) in GROUP_ACTIONS {
        if state.role_group_by_name(name).is_some() {
            continue;
        }
        let grants: Vec<String> = RESOURCE_KINDS
            .iter()
            .flat_map(|kind| actions.iter().map(|action| codename(*action, kind)))
            .collect();
        let id = Uuid::new_v4();
        state.role_groups.insert(
            id,
            RoleGroup {
                id,
                name: (*name).to_string(),
                grants,
                created_at: Utc::now(),
            },
        );
        tracing::info!(group = *name, "seeded role group");
    }
}

/// Create the bootstrap super-admin account unless the username is taken.
pub fn seed_admin(state: &AppState, username: &str, password: &str) {
    if state.user_by_username(username).is_some() {
        tracing::info!(username, "bootstrap admin already present");
        return;
    }
    let now = Utc::now();
    let id = Uuid::new_v4();
    let salt = Uuid::new_v4();
    state.users.insert(
        id,
        UserRecord {
            id,
            username: username.to_string(),
            email: format!("{username}@localhost"),
            first_name: String::new(),
            last_name: String::new(),
            password_salt: salt,
            password_digest: hash_password(&salt, password),
            is_super_admin: true,
            role_group_id: state.role_group_by_name("Super Admin").map(|group| group.id),
            created_at: now,
            updated_at: now,
        },
    );
    tracing::info!(username, "seeded bootstrap super admin");
}
