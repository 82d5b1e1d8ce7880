//! # Identity/Type Cache
//!
//! Memoizes "find capability of type T on object O" against an expensive
//! host query and repairs entries lazily once the cached capability has been
//! destroyed.
//!
//! ## Lookup Flow
//!
//! ```text
//!   try_get(owner, kind)
//!        │
//!        ├─ owner null ───────────────────────────────> None
//!        │
//!        ├─ read lock: entry? ── live ───────────────> Some(entry)   (hit)
//!        │                  └─ dead ── evict ──┐
//!        │                                     ▼
//!        └─ absent ──────────────────> stripe lock, re-check
//!                                              │
//!                                resolver.resolve() + is_live
//!                                       │             │
//!                                  Some(live r)   None ──────────> None
//!                                 insert if no                 (not cached)
//!                                 clear() ran
//!                                       └──────────────────────> Some(r)
//! ```
//!
//! ## Thread Safety
//!
//! - Hits share a read lock.
//! - Misses for the same key are serialized by a striped mutex, so racing
//!   callers resolve once.
//! - `clear()` advances an epoch under the write lock; a miss that resolved
//!   against the old epoch returns its result without storing it.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};

use compcache_core::{
    Capability, CapabilityRef, CapabilityResolver, CapabilityType, EntityId, LivenessOracle,
    LookupScope,
};
use parking_lot::{Mutex, RwLock};

use crate::config::CacheConfig;
use crate::stats::{CacheStats, StatsCounters};

/// Composite cache key.
///
/// Compared structurally on all three parts. The scope keeps self lookups
/// and ancestor lookups for the same owner and type apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Owner identity.
    pub owner: EntityId,
    /// Requested capability type.
    pub kind: CapabilityType,
    /// Where the resolver searched.
    pub scope: LookupScope,
}

impl CacheKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub const fn new(owner: EntityId, kind: CapabilityType, scope: LookupScope) -> Self {
        Self { owner, kind, scope }
    }
}

/// Process-lifetime cache of resolved capability references.
///
/// Entries are weak: the cache never keeps a capability alive and checks
/// every stored reference with the host's [`LivenessOracle`] before handing
/// it out. Resolver misses are not cached.
///
/// # Example
///
/// ```rust,ignore
/// let cache = IdentityTypeCache::new();
///
/// // First call resolves through the scene, later calls are hits.
/// let body = cache.get::<Rigidbody, _>(&scene, player);
///
/// // Scene reload: every cached identity may now be invalid.
/// cache.clear();
/// ```
pub struct IdentityTypeCache {
    /// Resolved references.
    entries: RwLock<HashMap<CacheKey, CapabilityRef>>,
    /// Striped locks for the miss path.
    miss_locks: Box<[Mutex<()>]>,
    /// Picks a stripe for a key.
    stripe_hasher: RandomState,
    /// Bumped by every `clear()`.
    epoch: AtomicU64,
    /// Hit/miss counters.
    counters: StatsCounters,
    /// Settings this cache was built with.
    config: CacheConfig,
}

impl IdentityTypeCache {
    /// Creates a cache with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache from a configuration.
    ///
    /// A `miss_lock_stripes` of zero is treated as one.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        let stripes = config.miss_lock_stripes.max(1);
        let miss_locks = (0..stripes)
            .map(|_| Mutex::new(()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            entries: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            miss_locks,
            stripe_hasher: RandomState::new(),
            epoch: AtomicU64::new(0),
            counters: StatsCounters::default(),
            config,
        }
    }

    /// Returns the configuration this cache was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up the capability of `kind` on `owner` itself.
    ///
    /// Returns `None` for a null owner or when the host has no such
    /// capability. Never returns a reference the host reports dead.
    pub fn try_get<H>(&self, host: &H, owner: EntityId, kind: CapabilityType) -> Option<CapabilityRef>
    where
        H: CapabilityResolver + LivenessOracle + ?Sized,
    {
        self.try_get_scoped(host, owner, kind, LookupScope::SelfOnly)
    }

    /// Looks up the capability of `kind` on `owner` or its nearest ancestor.
    pub fn try_get_in_ancestors<H>(
        &self,
        host: &H,
        owner: EntityId,
        kind: CapabilityType,
    ) -> Option<CapabilityRef>
    where
        H: CapabilityResolver + LivenessOracle + ?Sized,
    {
        self.try_get_scoped(host, owner, kind, LookupScope::InAncestors)
    }

    /// Typed form of [`IdentityTypeCache::try_get`].
    pub fn get<T, H>(&self, host: &H, owner: EntityId) -> Option<CapabilityRef>
    where
        T: Capability,
        H: CapabilityResolver + LivenessOracle + ?Sized,
    {
        self.try_get(host, owner, CapabilityType::of::<T>())
    }

    /// Typed form of [`IdentityTypeCache::try_get_in_ancestors`].
    pub fn get_in_ancestors<T, H>(&self, host: &H, owner: EntityId) -> Option<CapabilityRef>
    where
        T: Capability,
        H: CapabilityResolver + LivenessOracle + ?Sized,
    {
        self.try_get_in_ancestors(host, owner, CapabilityType::of::<T>())
    }

    /// Looks up a capability with an explicit resolver scope.
    pub fn try_get_scoped<H>(
        &self,
        host: &H,
        owner: EntityId,
        kind: CapabilityType,
        scope: LookupScope,
    ) -> Option<CapabilityRef>
    where
        H: CapabilityResolver + LivenessOracle + ?Sized,
    {
        if owner.is_null() {
            return None;
        }

        let key = CacheKey::new(owner, kind, scope);
        if let Some(entry) = self.live_entry(host, &key) {
            return Some(entry);
        }
        self.resolve_miss(host, key)
    }

    /// Removes every entry.
    ///
    /// Lookups that start after this returns miss for every previously
    /// cached key. Wire this to scene reload.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let dropped = entries.len();
        entries.clear();
        drop(entries);

        self.counters.record_clear();
        tracing::debug!(dropped, "identity cache cleared");
    }

    /// Drops every entry the oracle reports dead and returns how many were
    /// removed.
    ///
    /// Lookups already repair stale entries on access; this is only for
    /// reclaiming memory held by entries nobody asks for again.
    pub fn sweep<O>(&self, oracle: &O) -> usize
    where
        O: LivenessOracle + ?Sized,
    {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, entry| oracle.is_owner_live(key.owner) && oracle.is_live(*entry));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.counters.record_stale(removed as u64);
            tracing::debug!(removed, "swept stale identity cache entries");
        }
        removed
    }

    /// Drops every entry keyed on `owner`, across all types and scopes.
    pub fn invalidate_owner(&self, owner: EntityId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.owner != owner);
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            tracing::debug!(%owner, removed, "invalidated owner");
        }
        removed
    }

    /// Checks whether a key is stored, without consulting liveness.
    #[must_use]
    pub fn contains(&self, owner: EntityId, kind: CapabilityType, scope: LookupScope) -> bool {
        self.entries
            .read()
            .contains_key(&CacheKey::new(owner, kind, scope))
    }

    /// Returns the number of stored entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }

    /// Returns the stored entry if the oracle says both it and the key's
    /// owner are live, evicting it otherwise.
    fn live_entry<H>(&self, host: &H, key: &CacheKey) -> Option<CapabilityRef>
    where
        H: LivenessOracle + ?Sized,
    {
        let cached = self.entries.read().get(key).copied()?;
        if host.is_owner_live(key.owner) && host.is_live(cached) {
            self.counters.record_hit();
            return Some(cached);
        }
        self.evict_stale(key, cached);
        None
    }

    fn evict_stale(&self, key: &CacheKey, stale: CapabilityRef) {
        let mut entries = self.entries.write();
        // A concurrent miss may already have replaced it.
        if entries.get(key) == Some(&stale) {
            entries.remove(key);
            drop(entries);

            self.counters.record_stale(1);
            tracing::debug!(owner = %key.owner, kind = key.kind.name(), "evicted stale entry");
        }
    }

    fn resolve_miss<H>(&self, host: &H, key: CacheKey) -> Option<CapabilityRef>
    where
        H: CapabilityResolver + LivenessOracle + ?Sized,
    {
        let _stripe = self.miss_lock(&key).lock();

        // Another caller may have resolved this key while we waited.
        if let Some(entry) = self.live_entry(host, &key) {
            return Some(entry);
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        self.counters.record_miss();

        let resolved = host
            .resolve(key.owner, key.kind, key.scope)
            .filter(|found| host.is_owner_live(key.owner) && host.is_live(*found));
        let Some(found) = resolved else {
            self.counters.record_not_found();
            tracing::trace!(owner = %key.owner, kind = key.kind.name(), scope = ?key.scope, "capability not found");
            return None;
        };

        let mut entries = self.entries.write();
        if self.epoch.load(Ordering::Acquire) == epoch {
            entries.insert(key, found);
        }
        Some(found)
    }

    fn miss_lock(&self, key: &CacheKey) -> &Mutex<()> {
        let hash = self.stripe_hasher.hash_one(key);
        let stripes = self.miss_locks.len() as u64;
        #[allow(clippy::cast_possible_truncation)]
        let index = (hash % stripes) as usize;
        &self.miss_locks[index]
    }
}

impl Default for IdentityTypeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdentityTypeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityTypeCache")
            .field("entries", &self.len())
            .field("epoch", &self.epoch.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compcache_core::{Renderer, Rigidbody, Scene};

    #[test]
    fn test_key_equality() {
        let owner = EntityId::new(1, 0);
        let rb = CapabilityType::of::<Rigidbody>();
        let a = CacheKey::new(owner, rb, LookupScope::SelfOnly);

        assert_eq!(a, CacheKey::new(owner, rb, LookupScope::SelfOnly));
        assert_ne!(a, CacheKey::new(owner, rb, LookupScope::InAncestors));
        assert_ne!(a, CacheKey::new(EntityId::new(2, 0), rb, LookupScope::SelfOnly));
        assert_ne!(a, CacheKey::new(owner, CapabilityType::of::<Renderer>(), LookupScope::SelfOnly));
    }

    #[test]
    fn test_against_scene() {
        let mut scene = Scene::new(8, 8);
        let owner = scene.spawn();
        let body = scene.attach(owner, Rigidbody::with_mass(1.0)).unwrap();
        let cache = IdentityTypeCache::new();

        assert_eq!(cache.get::<Rigidbody, _>(&scene, owner), Some(body));
        assert!(cache.contains(owner, CapabilityType::of::<Rigidbody>(), LookupScope::SelfOnly));
        assert_eq!(cache.get::<Renderer, _>(&scene, owner), None);
        assert_eq!(cache.len(), 1);

        scene.destroy(body);
        assert_eq!(cache.get::<Rigidbody, _>(&scene, owner), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ancestor_entry_dies_with_asking_child() {
        let mut scene = Scene::new(4, 4);
        let root = scene.spawn();
        let child = scene.spawn_child(root);
        let body = scene.attach(root, Rigidbody::default()).unwrap();
        let cache = IdentityTypeCache::new();

        assert_eq!(cache.get_in_ancestors::<Rigidbody, _>(&scene, child), Some(body));

        // The body itself survives; only the child is gone.
        assert!(scene.despawn(child));
        assert!(scene.is_live(body));
        assert_eq!(scene.find_in_ancestors(child, CapabilityType::of::<Rigidbody>()), None);
        assert_eq!(cache.get_in_ancestors::<Rigidbody, _>(&scene, child), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().stale_evictions, 1);
    }

    #[test]
    fn test_sweep_drops_entries_of_despawned_askers() {
        let mut scene = Scene::new(4, 4);
        let root = scene.spawn();
        let child = scene.spawn_child(root);
        scene.attach(root, Rigidbody::default());
        let cache = IdentityTypeCache::new();

        assert!(cache.get_in_ancestors::<Rigidbody, _>(&scene, child).is_some());
        assert!(cache.get::<Rigidbody, _>(&scene, root).is_some());

        scene.despawn(child);
        assert_eq!(cache.sweep(&scene), 1);
        assert!(cache.contains(root, CapabilityType::of::<Rigidbody>(), LookupScope::SelfOnly));
    }

    #[test]
    fn test_zero_stripes_clamped() {
        let cache = IdentityTypeCache::with_config(CacheConfig {
            initial_capacity: 0,
            miss_lock_stripes: 0,
        });
        let mut scene = Scene::new(2, 2);
        let owner = scene.spawn();
        let body = scene.attach(owner, Rigidbody::default()).unwrap();

        assert_eq!(cache.get::<Rigidbody, _>(&scene, owner), Some(body));
        assert_eq!(cache.config().miss_lock_stripes, 0);
    }

    #[test]
    fn test_debug_output() {
        let cache = IdentityTypeCache::default();
        let text = format!("{cache:?}");
        assert!(text.contains("entries: 0"));
    }
}
