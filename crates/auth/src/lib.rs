//! `esgadmin-auth` — permission resolution for the ESG admin console.
//!
//! Pure decisions live in [`authorize`]; [`resolver`] adds the cached,
//! server-verified actor and the session plumbing around it.

pub mod actor;
pub mod authorize;
pub mod cache;
pub mod config;
pub mod identity;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod session;

pub use actor::{Actor, CurrentUser, CustomPermissions, MissingRolePolicy, UnverifiedActor};
pub use authorize::{
    DecisionSource, PermissionDecision, explain_permission, has_all_permissions,
    has_any_permission, has_permission, user_permissions,
};
pub use cache::ActorCache;
pub use config::{ConfigError, ResolverConfig};
pub use identity::{HttpIdentityClient, IdentityError, IdentityProvider, IdentityResponse};
pub use permissions::{Permission, catalog};
pub use resolver::PermissionResolver;
pub use roles::Role;
pub use session::{
    FileSessionStorage, InMemorySessionStorage, SessionError, SessionKey, SessionStorage,
};
