//! Time-boxed cache of the verified actor.

use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use esgadmin_core::Clock;

use crate::Actor;

#[derive(Debug, Clone)]
struct CachedActor {
    actor: Arc<Actor>,
    fetched_at: DateTime<Utc>,
    stored_at: Duration,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CachedActor>,
    epoch: u64,
}

/// Holds the most recently verified actor for a fixed time window.
///
/// An entry is expired once `ttl` of monotonic time has passed since it was
/// stored; expired entries are never handed out. Wall-clock steps do not
/// extend the window.
///
/// Every [`ActorCache::clear`] starts a new epoch. A fetch that began in an
/// earlier epoch cannot repopulate the cache through [`ActorCache::set_if_epoch`].
#[derive(Debug)]
pub struct ActorCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: RwLock<Slot>,
}

impl ActorCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            inner: RwLock::new(Slot::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached actor, if present and still fresh.
    pub fn get(&self) -> Option<Arc<Actor>> {
        let guard = self.inner.read().ok()?;
        let cached = guard.entry.as_ref()?;
        if self.is_stale(cached.stored_at) {
            return None;
        }
        Some(Arc::clone(&cached.actor))
    }

    /// Store a freshly verified actor, stamped with the current time.
    pub fn set(&self, actor: Arc<Actor>) {
        let entry = self.entry(actor);
        self.write().entry = Some(entry);
    }

    /// Store `actor` only if no [`clear`](Self::clear) happened since `epoch`
    /// was read. Returns whether the actor was stored.
    pub fn set_if_epoch(&self, actor: Arc<Actor>, epoch: u64) -> bool {
        let entry = self.entry(actor);
        let mut slot = self.write();
        if slot.epoch != epoch {
            return false;
        }
        slot.entry = Some(entry);
        true
    }

    pub fn clear(&self) {
        let mut slot = self.write();
        slot.entry = None;
        slot.epoch = slot.epoch.wrapping_add(1);
    }

    /// Current invalidation epoch.
    pub fn epoch(&self) -> u64 {
        match self.inner.read() {
            Ok(guard) => guard.epoch,
            Err(poisoned) => poisoned.into_inner().epoch,
        }
    }

    /// True when the cache is empty or its entry has aged out.
    pub fn is_expired(&self) -> bool {
        let Ok(guard) = self.inner.read() else {
            return true;
        };
        match guard.entry.as_ref() {
            Some(cached) => self.is_stale(cached.stored_at),
            None => true,
        }
    }

    /// Wall-clock time the current entry was stored, regardless of freshness.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        let guard = self.inner.read().ok()?;
        guard.entry.as_ref().map(|c| c.fetched_at)
    }

    fn entry(&self, actor: Arc<Actor>) -> CachedActor {
        CachedActor {
            actor,
            fetched_at: self.clock.now(),
            stored_at: self.clock.monotonic(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_stale(&self, stored_at: Duration) -> bool {
        self.clock.monotonic().saturating_sub(stored_at) >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use esgadmin_core::{ActorId, ManualClock};

    use super::*;
    use crate::Role;

    fn setup() -> (Arc<ManualClock>, ActorCache) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ActorCache::new(Duration::from_secs(60), clock.clone());
        (clock, cache)
    }

    fn actor() -> Arc<Actor> {
        Arc::new(Actor::new(ActorId::new("9").unwrap(), Some(Role::Admin)))
    }

    #[test]
    fn empty_cache_is_expired() {
        let (_, cache) = setup();
        assert!(cache.get().is_none());
        assert!(cache.is_expired());
        assert!(cache.fetched_at().is_none());
    }

    #[test]
    fn fresh_entry_is_returned_as_the_same_arc() {
        let (clock, cache) = setup();
        let a = actor();
        cache.set(a.clone());

        clock.advance(chrono::Duration::seconds(59));
        let got = cache.get().unwrap();
        assert!(Arc::ptr_eq(&got, &a));
        assert!(!cache.is_expired());
    }

    #[test]
    fn entry_expires_at_the_ttl_boundary() {
        let (clock, cache) = setup();
        cache.set(actor());

        clock.advance(chrono::Duration::seconds(60));
        assert!(cache.is_expired());
        assert!(cache.get().is_none());
        // The stale entry is still recorded until replaced or cleared.
        assert!(cache.fetched_at().is_some());
    }

    #[test]
    fn wall_clock_stepping_back_does_not_extend_the_window() {
        let (clock, cache) = setup();
        cache.set(actor());

        clock.advance(chrono::Duration::seconds(-3600));
        assert!(cache.get().is_some());

        clock.advance(chrono::Duration::seconds(3000));
        assert!(cache.get().is_none());
        assert!(cache.is_expired());
    }

    #[test]
    fn set_restamps_and_clear_empties() {
        let (clock, cache) = setup();
        cache.set(actor());
        clock.advance(chrono::Duration::seconds(90));
        cache.set(actor());
        assert!(cache.get().is_some());

        cache.clear();
        assert!(cache.get().is_none());
        assert!(cache.is_expired());
    }

    #[test]
    fn clear_invalidates_sets_from_an_older_epoch() {
        let (_, cache) = setup();
        let epoch = cache.epoch();

        cache.clear();
        assert!(!cache.set_if_epoch(actor(), epoch));
        assert!(cache.get().is_none());

        assert!(cache.set_if_epoch(actor(), cache.epoch()));
        assert!(cache.get().is_some());
    }
}
