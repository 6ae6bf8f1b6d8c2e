//! # CRUD Permission Codenames
//!
//! Capability identifiers are derived from resource-kind names on demand:
//! `("Conference", View)` becomes `"view_conference"`. Any string is a
//! valid resource kind — there is no registry and no unknown-kind error.
//! The derived identifiers key lookups into whatever permission store a
//! deployment carries.

use serde::{Deserialize, Serialize};

/// The four CRUD actions a capability can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    /// Create new records of the resource kind.
    Add,
    /// Modify existing records.
    Change,
    /// Remove records.
    Delete,
    /// Read records.
    View,
}

impl PermissionAction {
    /// All four actions, in codename-prefix order.
    pub const ALL: [PermissionAction; 4] = [Self::Add, Self::Change, Self::Delete, Self::View];

    /// The codename prefix for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
            Self::View => "view",
        }
    }
}

/// Derive the flat capability identifier for one action on one resource
/// kind. Resource kinds are case-insensitive.
pub fn codename(action: PermissionAction, resource_kind: &str) -> String {
    format!("{}_{}", action.as_str(), resource_kind.to_lowercase())
}

/// The four CRUD capability identifiers derived for one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCodenames {
    /// `add_<kind>`
    pub add: String,
    /// `change_<kind>`
    pub change: String,
    /// `delete_<kind>`
    pub delete: String,
    /// `view_<kind>`
    pub view: String,
}

impl PermissionCodenames {
    /// Derive all four codenames for a resource kind.
    pub fn for_kind(resource_kind: &str) -> Self {
        Self {
            add: codename(PermissionAction::Add, resource_kind),
            change: codename(PermissionAction::Change, resource_kind),
            delete: codename(PermissionAction::Delete, resource_kind),
            view: codename(PermissionAction::View, resource_kind),
        }
    }
}
