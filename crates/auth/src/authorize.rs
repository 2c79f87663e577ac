//! Pure permission resolution.
//!
//! Every function here is a pure function of `(permission, role,
//! custom_permissions)`:
//! - No IO
//! - No panics
//! - No caching (callers supply the actor)

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{Actor, Permission, Role};

/// Which rule decided a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// No verified actor was available.
    NoActor,
    /// The actor has no (recognized) role.
    NoRole,
    /// A per-actor override decided the outcome.
    CustomOverride,
    /// `super_admin` holds everything not explicitly denied.
    SuperAdmin,
    /// The permission is in the role's default set.
    RoleDefault,
    /// The permission is not in the role's default set.
    NotInRole,
}

/// Outcome of a permission check together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    pub permission: Permission,
    pub granted: bool,
    pub source: DecisionSource,
    pub role: Option<Role>,
}

impl PermissionDecision {
    /// Human-readable reason for the decision.
    pub fn reason(&self) -> String {
        let p = &self.permission;
        match (self.source, self.granted) {
            (DecisionSource::NoActor, _) => format!("'{p}' denied: no authenticated actor"),
            (DecisionSource::NoRole, _) => format!("'{p}' denied: actor has no recognized role"),
            (DecisionSource::CustomOverride, true) => format!("'{p}' explicitly granted by a custom permission"),
            (DecisionSource::CustomOverride, false) => format!("'{p}' explicitly denied by a custom permission"),
            (DecisionSource::SuperAdmin, _) => format!("'{p}' granted: super_admin holds every permission"),
            (DecisionSource::RoleDefault, _) => {
                format!("'{p}' granted by role '{}'", display_role(self.role))
            }
            (DecisionSource::NotInRole, _) => {
                format!("'{p}' denied: not a default of role '{}'", display_role(self.role))
            }
        }
    }
}

fn display_role(role: Option<Role>) -> &'static str {
    role.map(|r| r.as_str()).unwrap_or("none")
}

/// Explain how a permission check resolves for `actor`.
pub fn explain_permission(permission: &Permission, actor: Option<&Actor>) -> PermissionDecision {
    let decide = |granted, source, role| PermissionDecision {
        permission: permission.clone(),
        granted,
        source,
        role,
    };

    let Some(actor) = actor else {
        return decide(false, DecisionSource::NoActor, None);
    };
    let Some(role) = actor.role else {
        return decide(false, DecisionSource::NoRole, None);
    };

    if let Some(granted) = actor.custom_permissions.get(permission) {
        return decide(granted, DecisionSource::CustomOverride, Some(role));
    }

    match role {
        Role::SuperAdmin => decide(true, DecisionSource::SuperAdmin, Some(role)),
        role if role.grants_by_default(permission) => {
            decide(true, DecisionSource::RoleDefault, Some(role))
        }
        role => decide(false, DecisionSource::NotInRole, Some(role)),
    }
}

/// Whether `actor` holds `permission`. `None` is always denied.
pub fn has_permission(permission: &Permission, actor: Option<&Actor>) -> bool {
    explain_permission(permission, actor).granted
}

/// Whether `actor` holds at least one of `permissions` (false for an empty list).
pub fn has_any_permission(permissions: &[Permission], actor: Option<&Actor>) -> bool {
    permissions.iter().any(|p| has_permission(p, actor))
}

/// Whether `actor` holds every one of `permissions` (true for an empty list).
pub fn has_all_permissions(permissions: &[Permission], actor: Option<&Actor>) -> bool {
    permissions.iter().all(|p| has_permission(p, actor))
}

/// The full effective permission set of `actor`.
///
/// Role defaults (with the admin set as a floor for `super_admin`), plus
/// custom grants, minus custom denials. For `super_admin` the defaults are
/// already the whole catalog, so custom entries can only remove.
pub fn user_permissions(actor: Option<&Actor>) -> BTreeSet<Permission> {
    let Some(actor) = actor else {
        return BTreeSet::new();
    };
    let Some(role) = actor.role else {
        return BTreeSet::new();
    };

    let mut effective: BTreeSet<Permission> = role.default_permissions().clone();

    if role == Role::SuperAdmin {
        effective.extend(Role::Admin.default_permissions().iter().cloned());
    } else {
        effective.extend(actor.custom_permissions.grants().cloned());
    }

    for denied in actor.custom_permissions.denials() {
        effective.remove(denied.as_str());
    }

    effective
}
