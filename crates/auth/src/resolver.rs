//! Permission resolver: verified-actor lookup plus permission checks.
//!
//! The resolver answers permission checks from a cached, server-verified actor
//! and only goes to the network when that cache is empty, stale or explicitly
//! bypassed. Every failure degrades to "no actor", which denies everything.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use esgadmin_core::{Clock, SystemClock};

use crate::authorize::{self, PermissionDecision};
use crate::cache::ActorCache;
use crate::config::ResolverConfig;
use crate::identity::{HttpIdentityClient, IdentityError, IdentityProvider};
use crate::session::{FileSessionStorage, SessionError, SessionKey, SessionStorage};
use crate::{Actor, CurrentUser, MissingRolePolicy, Permission, UnverifiedActor};

pub struct PermissionResolver<P> {
    provider: P,
    cache: ActorCache,
    session: Arc<dyn SessionStorage>,
    missing_role_policy: MissingRolePolicy,
    request_timeout: Duration,
    /// One identity fetch in flight at a time; holds the last outcome.
    fetch_gate: tokio::sync::Mutex<Option<FetchOutcome>>,
    /// Completed fetch attempts; lets gate waiters reuse a result that landed
    /// while they were queued.
    fetch_generation: AtomicU64,
}

/// Result of the most recent completed fetch, tagged with the cache epoch it
/// started in.
#[derive(Debug)]
struct FetchOutcome {
    epoch: u64,
    actor: Option<Arc<Actor>>,
}

impl<P> core::fmt::Debug for PermissionResolver<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("cache", &self.cache)
            .field("session", &self.session)
            .field("missing_role_policy", &self.missing_role_policy)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl PermissionResolver<HttpIdentityClient> {
    /// Production wiring: HTTP identity client, file-backed session, system clock.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, IdentityError> {
        let provider =
            HttpIdentityClient::new(&config.api_url, &config.identity_path, config.request_timeout)?;
        let session = Arc::new(FileSessionStorage::new(config.session_file.clone()));
        Ok(Self::new(provider, session, Arc::new(SystemClock), config))
    }
}

impl<P: IdentityProvider> PermissionResolver<P> {
    pub fn new(
        provider: P,
        session: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            provider,
            cache: ActorCache::new(config.cache_ttl, clock),
            session,
            missing_role_policy: config.missing_role_policy,
            request_timeout: config.request_timeout,
            fetch_gate: tokio::sync::Mutex::new(None),
            fetch_generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &ActorCache {
        &self.cache
    }

    pub fn session(&self) -> &Arc<dyn SessionStorage> {
        &self.session
    }

    /// Resolve the current actor, from cache when fresh, otherwise from the
    /// identity endpoint.
    ///
    /// `force_refresh` bypasses the cache. Returns `None` when there is no
    /// credential or the fetch fails for any reason; a rejected credential
    /// (401) additionally purges every persisted session key.
    pub async fn fetch_current_user(&self, force_refresh: bool) -> Option<Arc<Actor>> {
        if !force_refresh {
            if let Some(actor) = self.cache.get() {
                tracing::debug!(actor_id = %actor.id, "actor cache hit");
                return Some(actor);
            }
        }

        let generation = self.fetch_generation.load(Ordering::Acquire);
        let mut last = self.fetch_gate.lock().await;
        if self.fetch_generation.load(Ordering::Acquire) != generation {
            tracing::debug!("reusing identity fetched by a concurrent caller");
            // Stale once the cache was cleared after that fetch started.
            let epoch = self.cache.epoch();
            return last
                .as_ref()
                .filter(|outcome| outcome.epoch == epoch)
                .and_then(|outcome| outcome.actor.clone());
        }

        let epoch = self.cache.epoch();
        let actor = self.fetch_uncoalesced(epoch).await;
        *last = Some(FetchOutcome {
            epoch,
            actor: actor.clone(),
        });
        self.fetch_generation.fetch_add(1, Ordering::AcqRel);
        actor
    }

    async fn fetch_uncoalesced(&self, epoch: u64) -> Option<Arc<Actor>> {
        let token = self
            .session
            .get(SessionKey::AccessToken)
            .filter(|t| !t.trim().is_empty());
        let Some(token) = token else {
            tracing::debug!("no credential in session storage; actor unresolved");
            self.cache.clear();
            return None;
        };

        let result = match tokio::time::timeout(self.request_timeout, self.provider.fetch_identity(&token)).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::Timeout),
        };

        match result {
            Ok(response) => {
                let actor = Arc::new(Actor::from_identity(response, self.missing_role_policy));
                if !self.cache.set_if_epoch(Arc::clone(&actor), epoch) {
                    tracing::info!(actor_id = %actor.id, "session invalidated during identity fetch; discarding result");
                    return None;
                }
                tracing::info!(actor_id = %actor.id, role = ?actor.role, "actor identity verified");
                Some(actor)
            }
            Err(err) => {
                let same_session = self.cache.epoch() == epoch;
                self.cache.clear();
                if err.is_auth_expired() {
                    if same_session {
                        tracing::warn!("credential rejected; purging local session");
                        self.purge_session();
                    } else {
                        tracing::info!("rejected credential was replaced during the fetch; keeping session");
                    }
                } else {
                    tracing::warn!("identity fetch failed: {err}");
                }
                None
            }
        }
    }

    /// Cache-only view of the logged-in user.
    ///
    /// A fresh verified actor wins. Without one, a persisted role hint yields
    /// an [`UnverifiedActor`], which is display state only.
    pub fn current_user(&self) -> Option<CurrentUser> {
        if let Some(actor) = self.cache.get() {
            return Some(CurrentUser::Verified(actor));
        }
        self.session
            .get(SessionKey::RoleHint)
            .filter(|hint| !hint.trim().is_empty())
            .map(|hint| CurrentUser::Unverified(UnverifiedActor::from_role_hint(&hint)))
    }

    /// The fresh verified actor, if any. Default subject of every check below.
    pub fn verified_user(&self) -> Option<Arc<Actor>> {
        self.cache.get()
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        authorize::has_permission(permission, self.verified_user().as_deref())
    }

    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        authorize::has_any_permission(permissions, self.verified_user().as_deref())
    }

    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        authorize::has_all_permissions(permissions, self.verified_user().as_deref())
    }

    pub fn user_permissions(&self) -> BTreeSet<Permission> {
        authorize::user_permissions(self.verified_user().as_deref())
    }

    pub fn explain_permission(&self, permission: &Permission) -> PermissionDecision {
        authorize::explain_permission(permission, self.verified_user().as_deref())
    }

    /// Forget the cached actor (e.g. after server-side permission changes).
    ///
    /// A fetch already in flight will not repopulate the cache.
    pub fn clear_user_cache(&self) {
        self.cache.clear();
        tracing::debug!("actor cache cleared");
    }

    /// Store a new credential. The cache is dropped so the next fetch verifies
    /// the identity behind it.
    pub fn login(&self, token: &str, role_hint: Option<&str>) -> Result<(), SessionError> {
        self.session.set(SessionKey::AccessToken, token)?;
        match role_hint {
            Some(hint) => self.session.set(SessionKey::RoleHint, hint)?,
            None => self.session.remove(SessionKey::RoleHint)?,
        }
        self.clear_user_cache();
        Ok(())
    }

    /// Drop the cached actor and every persisted session key.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.clear_user_cache();
        self.session.clear()
    }

    fn purge_session(&self) {
        if let Err(err) = self.session.clear() {
            tracing::error!("failed to purge session storage: {err}");
        }
    }
}
