use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque capability tokens (e.g. `"delete_faqs"`). The known
/// tokens are enumerated in [`catalog`], which must stay in sync with the
/// backend's own permission set. Tokens outside the catalog are still valid
/// values: custom overrides coming from the server may name them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource category the token acts on (`"delete_faqs"` → `"faqs"`).
    ///
    /// Tokens follow a `verb_resource` naming scheme; a token without an
    /// underscore is its own category.
    pub fn category(&self) -> &str {
        match self.as_str().split_once('_') {
            Some((_, resource)) => resource,
            None => self.as_str(),
        }
    }

    /// Whether the token is part of the known catalog.
    pub fn is_known(&self) -> bool {
        catalog::ALL.iter().any(|p| p == self)
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed permission catalog shared with the backend.
pub mod catalog {
    use super::Permission;

    /// Bumped whenever a token is added, renamed or removed.
    pub const CATALOG_VERSION: u32 = 1;

    pub const VIEW_DASHBOARD: Permission = Permission::from_static("view_dashboard");

    pub const VIEW_USERS: Permission = Permission::from_static("view_users");
    pub const CREATE_USERS: Permission = Permission::from_static("create_users");
    pub const EDIT_USERS: Permission = Permission::from_static("edit_users");
    pub const DELETE_USERS: Permission = Permission::from_static("delete_users");

    pub const VIEW_ASSESSMENTS: Permission = Permission::from_static("view_assessments");
    pub const CREATE_ASSESSMENTS: Permission = Permission::from_static("create_assessments");
    pub const EDIT_ASSESSMENTS: Permission = Permission::from_static("edit_assessments");
    pub const DELETE_ASSESSMENTS: Permission = Permission::from_static("delete_assessments");
    pub const MANAGE_ASSESSMENTS: Permission = Permission::from_static("manage_assessments");

    pub const VIEW_RESPONSES: Permission = Permission::from_static("view_responses");
    pub const EXPORT_RESPONSES: Permission = Permission::from_static("export_responses");

    pub const VIEW_FAQS: Permission = Permission::from_static("view_faqs");
    pub const CREATE_FAQS: Permission = Permission::from_static("create_faqs");
    pub const EDIT_FAQS: Permission = Permission::from_static("edit_faqs");
    pub const DELETE_FAQS: Permission = Permission::from_static("delete_faqs");

    pub const VIEW_EVENTS: Permission = Permission::from_static("view_events");
    pub const CREATE_EVENTS: Permission = Permission::from_static("create_events");
    pub const EDIT_EVENTS: Permission = Permission::from_static("edit_events");
    pub const DELETE_EVENTS: Permission = Permission::from_static("delete_events");

    pub const VIEW_REPORTS: Permission = Permission::from_static("view_reports");
    pub const CREATE_REPORTS: Permission = Permission::from_static("create_reports");
    pub const EDIT_REPORTS: Permission = Permission::from_static("edit_reports");
    pub const DELETE_REPORTS: Permission = Permission::from_static("delete_reports");

    pub const VIEW_RESOURCES: Permission = Permission::from_static("view_resources");
    pub const CREATE_RESOURCES: Permission = Permission::from_static("create_resources");
    pub const EDIT_RESOURCES: Permission = Permission::from_static("edit_resources");
    pub const DELETE_RESOURCES: Permission = Permission::from_static("delete_resources");

    pub const VIEW_FILES: Permission = Permission::from_static("view_files");
    pub const UPLOAD_FILES: Permission = Permission::from_static("upload_files");
    pub const DELETE_FILES: Permission = Permission::from_static("delete_files");

    pub const MANAGE_STORAGE: Permission = Permission::from_static("manage_storage");

    pub const VIEW_PERMISSIONS: Permission = Permission::from_static("view_permissions");
    pub const MANAGE_PERMISSIONS: Permission = Permission::from_static("manage_permissions");

    pub const MANAGE_SETTINGS: Permission = Permission::from_static("manage_settings");

    /// Every known token, in display order.
    pub const ALL: &[Permission] = &[
        VIEW_DASHBOARD,
        VIEW_USERS,
        CREATE_USERS,
        EDIT_USERS,
        DELETE_USERS,
        VIEW_ASSESSMENTS,
        CREATE_ASSESSMENTS,
        EDIT_ASSESSMENTS,
        DELETE_ASSESSMENTS,
        MANAGE_ASSESSMENTS,
        VIEW_RESPONSES,
        EXPORT_RESPONSES,
        VIEW_FAQS,
        CREATE_FAQS,
        EDIT_FAQS,
        DELETE_FAQS,
        VIEW_EVENTS,
        CREATE_EVENTS,
        EDIT_EVENTS,
        DELETE_EVENTS,
        VIEW_REPORTS,
        CREATE_REPORTS,
        EDIT_REPORTS,
        DELETE_REPORTS,
        VIEW_RESOURCES,
        CREATE_RESOURCES,
        EDIT_RESOURCES,
        DELETE_RESOURCES,
        VIEW_FILES,
        UPLOAD_FILES,
        DELETE_FILES,
        MANAGE_STORAGE,
        VIEW_PERMISSIONS,
        MANAGE_PERMISSIONS,
        MANAGE_SETTINGS,
    ];
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::catalog::*;
    use super::*;

    #[test]
    fn catalog_has_no_duplicates() {
        let unique: HashSet<&str> = ALL.iter().map(Permission::as_str).collect();
        assert_eq!(unique.len(), ALL.len());
    }

    #[test]
    fn category_is_the_resource_suffix() {
        assert_eq!(DELETE_FAQS.category(), "faqs");
        assert_eq!(MANAGE_STORAGE.category(), "storage");
        assert_eq!(Permission::new("audit").category(), "audit");
    }

    #[test]
    fn unknown_tokens_are_representable() {
        let p = Permission::from("approve_submissions".to_string());
        assert!(!p.is_known());
        assert!(DELETE_FILES.is_known());
    }

    #[test]
    fn serializes_as_bare_string() {
        let json = serde_json::to_string(&VIEW_USERS).unwrap();
        assert_eq!(json, "\"view_users\"");
        let back: Permission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VIEW_USERS);
    }
}
