//! Actor model (the authenticated admin user being authorized).

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use esgadmin_core::ActorId;

use crate::identity::IdentityResponse;
use crate::{Permission, Role};

/// Per-actor permission overrides.
///
/// `true` explicitly grants a permission, `false` explicitly denies it. Tokens
/// without an entry fall through to the role defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomPermissions(HashMap<Permission, bool>);

impl CustomPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission: impl Into<Permission>) -> Self {
        self.0.insert(permission.into(), true);
        self
    }

    pub fn deny(mut self, permission: impl Into<Permission>) -> Self {
        self.0.insert(permission.into(), false);
        self
    }

    /// The explicit override for `permission`, if any.
    pub fn get(&self, permission: &Permission) -> Option<bool> {
        self.0.get(permission.as_str()).copied()
    }

    pub fn grants(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter().filter(|(_, granted)| **granted).map(|(p, _)| p)
    }

    pub fn denials(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter().filter(|(_, granted)| !**granted).map(|(p, _)| p)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Permission, bool)> for CustomPermissions {
    fn from_iter<T: IntoIterator<Item = (Permission, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What to do when the identity endpoint omits the actor's role.
///
/// Unrecognized role strings are unaffected by this policy: they always
/// resolve to "no role".
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRolePolicy {
    /// Treat the actor as having no role (every check is denied).
    #[default]
    Deny,
    /// Assume `admin`. Only for backends known to omit the role for admins.
    Admin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown missing-role policy '{0}' (expected 'deny' or 'admin')")]
pub struct UnknownMissingRolePolicy(String);

impl FromStr for MissingRolePolicy {
    type Err = UnknownMissingRolePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(MissingRolePolicy::Deny),
            "admin" => Ok(MissingRolePolicy::Admin),
            other => Err(UnknownMissingRolePolicy(other.to_string())),
        }
    }
}

/// A server-verified actor.
///
/// Only constructed from an identity endpoint response (or directly in tests);
/// this is the only type authorization decisions accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Option<Role>,
    pub custom_permissions: CustomPermissions,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub access_level: Option<String>,
    pub approval_status: Option<String>,
    pub is_active: Option<bool>,
}

impl Actor {
    pub fn new(id: ActorId, role: Option<Role>) -> Self {
        Self {
            id,
            role,
            custom_permissions: CustomPermissions::default(),
            email: None,
            full_name: None,
            access_level: None,
            approval_status: None,
            is_active: None,
        }
    }

    pub fn with_custom_permissions(mut self, custom: CustomPermissions) -> Self {
        self.custom_permissions = custom;
        self
    }

    /// Normalize an identity endpoint payload.
    pub fn from_identity(response: IdentityResponse, policy: MissingRolePolicy) -> Self {
        let role = match response.role.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                // Exact match only; padded or re-cased names are not roles.
                let role = Role::parse(raw);
                if role.is_none() {
                    tracing::warn!(user_id = %response.user_id, role = raw, "unrecognized role; no permissions granted");
                }
                role
            }
            _ => match policy {
                MissingRolePolicy::Deny => {
                    tracing::warn!(user_id = %response.user_id, "identity response has no role; denying all permissions");
                    None
                }
                MissingRolePolicy::Admin => {
                    tracing::warn!(user_id = %response.user_id, "identity response has no role; assuming admin per configuration");
                    Some(Role::Admin)
                }
            },
        };

        let custom_permissions = response
            .custom_permissions
            .into_iter()
            .map(|(name, granted)| (Permission::from(name), granted))
            .collect();

        Self {
            id: response.user_id,
            role,
            custom_permissions,
            email: response.email,
            full_name: response.full_name,
            access_level: response.access_level,
            approval_status: response.approval_status,
            is_active: response.is_active,
        }
    }
}

/// Actor information read from local storage before the server confirmed it.
///
/// Deliberately a separate type from [`Actor`]: it cannot be handed to the
/// authorization functions. It exists so a UI can render optimistically until
/// the first identity fetch completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnverifiedActor {
    pub role_hint: Option<Role>,
}

impl UnverifiedActor {
    pub fn from_role_hint(raw: &str) -> Self {
        Self {
            role_hint: Role::parse(raw),
        }
    }

    /// Optimistic display hint: whether the hinted role would hold `permission`.
    ///
    /// Never use this to gate an action.
    pub fn might_have_permission(&self, permission: &Permission) -> bool {
        self.role_hint
            .is_some_and(|role| role.grants_by_default(permission))
    }
}

/// The cache-only view of "who is logged in".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentUser {
    Verified(std::sync::Arc<Actor>),
    Unverified(UnverifiedActor),
}

impl CurrentUser {
    /// The verified actor, if this is one.
    pub fn verified(&self) -> Option<&Actor> {
        match self {
            CurrentUser::Verified(actor) => Some(actor),
            CurrentUser::Unverified(_) => None,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, CurrentUser::Verified(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::catalog;

    fn response(role: Option<&str>) -> IdentityResponse {
        let mut body = serde_json::json!({
            "user_id": 7,
            "email": "ops@example.org",
            "custom_permissions": { "delete_faqs": true, "view_users": false }
        });
        if let Some(role) = role {
            body["role"] = serde_json::Value::from(role);
        }
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn known_roles_are_normalized() {
        let actor = Actor::from_identity(response(Some("super_admin")), MissingRolePolicy::Deny);
        assert_eq!(actor.role, Some(Role::SuperAdmin));
        assert_eq!(actor.id.as_str(), "7");
        assert_eq!(actor.email.as_deref(), Some("ops@example.org"));
    }

    #[test]
    fn unknown_role_is_no_role_under_either_policy() {
        for policy in [MissingRolePolicy::Deny, MissingRolePolicy::Admin] {
            let actor = Actor::from_identity(response(Some("auditor")), policy);
            assert_eq!(actor.role, None);
        }
    }

    #[test]
    fn non_canonical_role_spellings_grant_nothing() {
        for raw in ["SUPER_ADMIN", " super_admin ", "Admin", " admin", "Super_Admin"] {
            let actor = Actor::from_identity(response(Some(raw)), MissingRolePolicy::Admin);
            assert_eq!(actor.role, None, "{raw:?} mapped to a role");
            assert!(!crate::authorize::has_permission(&catalog::DELETE_USERS, Some(&actor)));
            assert!(!crate::authorize::has_permission(&catalog::VIEW_FAQS, Some(&actor)));
        }
    }

    #[test]
    fn missing_role_follows_policy() {
        let denied = Actor::from_identity(response(None), MissingRolePolicy::Deny);
        assert_eq!(denied.role, None);

        let assumed = Actor::from_identity(response(None), MissingRolePolicy::Admin);
        assert_eq!(assumed.role, Some(Role::Admin));

        let blank = Actor::from_identity(response(Some("  ")), MissingRolePolicy::Deny);
        assert_eq!(blank.role, None);
    }

    #[test]
    fn custom_permissions_are_carried_over() {
        let actor = Actor::from_identity(response(Some("admin")), MissingRolePolicy::Deny);
        assert_eq!(actor.custom_permissions.get(&catalog::DELETE_FAQS), Some(true));
        assert_eq!(actor.custom_permissions.get(&catalog::VIEW_USERS), Some(false));
        assert_eq!(actor.custom_permissions.get(&catalog::VIEW_FAQS), None);
    }

    #[test]
    fn missing_role_policy_parses() {
        assert_eq!("deny".parse::<MissingRolePolicy>().unwrap(), MissingRolePolicy::Deny);
        assert_eq!(" Admin ".parse::<MissingRolePolicy>().unwrap(), MissingRolePolicy::Admin);
        assert!("allow".parse::<MissingRolePolicy>().is_err());
    }

    #[test]
    fn unverified_actor_only_answers_from_role_defaults() {
        let hint = UnverifiedActor::from_role_hint("admin");
        assert!(hint.might_have_permission(&catalog::VIEW_FAQS));
        assert!(!hint.might_have_permission(&catalog::DELETE_FAQS));

        let garbage = UnverifiedActor::from_role_hint("root");
        assert!(!garbage.might_have_permission(&catalog::VIEW_FAQS));

        let shouted = UnverifiedActor::from_role_hint("SUPER_ADMIN");
        assert_eq!(shouted.role_hint, None);
        assert!(!shouted.might_have_permission(&catalog::DELETE_USERS));
    }
}
