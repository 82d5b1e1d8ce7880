//! # Scene Session
//!
//! Owns the active [`Scene`] and the cache in front of it. Loading or
//! resetting the scene clears the cache in the same step, so cached
//! identities from the previous scene can never resolve against slots of
//! the new one.

use compcache_core::{Capability, CapabilityRef, EntityId, Scene};

use crate::cache::IdentityTypeCache;

/// One scene plus its lookup cache.
///
/// # Example
///
/// ```rust,ignore
/// let mut session = SceneSession::new(Scene::new(1024, 4096));
/// let player = session.spawn();
/// session.attach(player, Rigidbody::with_mass(80.0));
///
/// let mass = session.value::<Rigidbody>(player).map(|rb| rb.mass);
///
/// // Level transition
/// session.load_scene(Scene::new(1024, 4096));
/// ```
#[derive(Debug)]
pub struct SceneSession {
    scene: Scene,
    cache: IdentityTypeCache,
    loads: u64,
}

impl SceneSession {
    /// Creates a session with a default-configured cache.
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        Self::with_cache(scene, IdentityTypeCache::new())
    }

    /// Creates a session around an existing cache. The cache is cleared.
    #[must_use]
    pub fn with_cache(scene: Scene, cache: IdentityTypeCache) -> Self {
        cache.clear();
        Self {
            scene,
            cache,
            loads: 0,
        }
    }

    /// Returns the active scene.
    #[inline]
    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Spawns a root entity in the active scene.
    pub fn spawn(&mut self) -> EntityId {
        self.scene.spawn()
    }

    /// Spawns a child of `parent` in the active scene.
    pub fn spawn_child(&mut self, parent: EntityId) -> EntityId {
        self.scene.spawn_child(parent)
    }

    /// Despawns an entity and its subtree. Cached entries for them go stale
    /// and are dropped on their next lookup.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        self.scene.despawn(id)
    }

    /// Attaches a capability to `owner`.
    pub fn attach<T: Capability>(&mut self, owner: EntityId, value: T) -> Option<CapabilityRef> {
        self.scene.attach(owner, value)
    }

    /// Destroys a single capability.
    pub fn destroy(&mut self, capability: CapabilityRef) -> bool {
        self.scene.destroy(capability)
    }

    /// Returns the cache.
    #[inline]
    #[must_use]
    pub const fn cache(&self) -> &IdentityTypeCache {
        &self.cache
    }

    /// Number of scene loads and resets since the session was created.
    #[inline]
    #[must_use]
    pub const fn scene_loads(&self) -> u64 {
        self.loads
    }

    /// Cached lookup of `T` on `owner`.
    #[must_use]
    pub fn get<T: Capability>(&self, owner: EntityId) -> Option<CapabilityRef> {
        self.cache.get::<T, _>(&self.scene, owner)
    }

    /// Cached lookup of `T` on `owner` or its nearest ancestor.
    #[must_use]
    pub fn get_in_ancestors<T: Capability>(&self, owner: EntityId) -> Option<CapabilityRef> {
        self.cache.get_in_ancestors::<T, _>(&self.scene, owner)
    }

    /// Cached lookup of `T` on `owner`, returning the value.
    #[must_use]
    pub fn value<T: Capability>(&self, owner: EntityId) -> Option<&T> {
        let capability = self.get::<T>(owner)?;
        self.scene.get::<T>(capability)
    }

    /// Cached lookup of `T` on `owner`, returning the value mutably.
    pub fn value_mut<T: Capability>(&mut self, owner: EntityId) -> Option<&mut T> {
        let capability = self.get::<T>(owner)?;
        self.scene.get_mut::<T>(capability)
    }

    /// Replaces the active scene, clears the cache and returns the old scene.
    pub fn load_scene(&mut self, scene: Scene) -> Scene {
        let previous = std::mem::replace(&mut self.scene, scene);
        self.cache.clear();
        self.loads += 1;
        tracing::info!(loads = self.loads, "scene loaded, identity cache reset");
        previous
    }

    /// Despawns everything in the active scene and clears the cache.
    pub fn reset_scene(&mut self) {
        self.scene.clear();
        self.cache.clear();
        self.loads += 1;
        tracing::info!(loads = self.loads, "scene reset, identity cache reset");
    }
}
