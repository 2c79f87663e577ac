use std::collections::BTreeSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::permissions::{Permission, catalog};

/// Role identifier used for RBAC.
///
/// The role set is closed. Role strings the backend sends that are not listed
/// here do not map to a `Role` at all and therefore grant nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::SuperAdmin];

    /// Parse a role name as sent by the identity endpoint.
    ///
    /// Matching is exact: any other spelling, case or padding is no role.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Content administrator: manages assessments and site content, cannot delete or administer access",
            Role::SuperAdmin => "Full system administrator with every permission",
        }
    }

    /// Default permission set held by this role.
    pub fn default_permissions(&self) -> &'static BTreeSet<Permission> {
        match self {
            Role::Admin => &ADMIN_DEFAULTS,
            Role::SuperAdmin => &SUPER_ADMIN_DEFAULTS,
        }
    }

    pub fn grants_by_default(&self, permission: &Permission) -> bool {
        self.default_permissions().contains(permission.as_str())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    catalog::VIEW_DASHBOARD,
    catalog::VIEW_USERS,
    catalog::VIEW_ASSESSMENTS,
    catalog::CREATE_ASSESSMENTS,
    catalog::EDIT_ASSESSMENTS,
    catalog::MANAGE_ASSESSMENTS,
    catalog::VIEW_RESPONSES,
    catalog::EXPORT_RESPONSES,
    catalog::VIEW_FAQS,
    catalog::CREATE_FAQS,
    catalog::EDIT_FAQS,
    catalog::VIEW_EVENTS,
    catalog::CREATE_EVENTS,
    catalog::EDIT_EVENTS,
    catalog::VIEW_REPORTS,
    catalog::CREATE_REPORTS,
    catalog::EDIT_REPORTS,
    catalog::VIEW_RESOURCES,
    catalog::CREATE_RESOURCES,
    catalog::EDIT_RESOURCES,
    catalog::VIEW_FILES,
    catalog::UPLOAD_FILES,
];

/// Permissions only `super_admin` holds by default.
const SUPER_ADMIN_ONLY_PERMISSIONS: &[Permission] = &[
    catalog::CREATE_USERS,
    catalog::EDIT_USERS,
    catalog::DELETE_USERS,
    catalog::DELETE_ASSESSMENTS,
    catalog::DELETE_FAQS,
    catalog::DELETE_EVENTS,
    catalog::DELETE_REPORTS,
    catalog::DELETE_RESOURCES,
    catalog::DELETE_FILES,
    catalog::MANAGE_STORAGE,
    catalog::VIEW_PERMISSIONS,
    catalog::MANAGE_PERMISSIONS,
    catalog::MANAGE_SETTINGS,
];

static ADMIN_DEFAULTS: LazyLock<BTreeSet<Permission>> =
    LazyLock::new(|| ADMIN_PERMISSIONS.iter().cloned().collect());

// Built on top of the admin set so the superset relation holds by construction.
static SUPER_ADMIN_DEFAULTS: LazyLock<BTreeSet<Permission>> = LazyLock::new(|| {
    ADMIN_DEFAULTS
        .iter()
        .cloned()
        .chain(SUPER_ADMIN_ONLY_PERMISSIONS.iter().cloned())
        .collect()
});
