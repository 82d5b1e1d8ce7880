//! # Scene
//!
//! The host object model: a fixed-capacity set of entities arranged in a
//! parent hierarchy, each carrying any number of capabilities.
//!
//! The scene is the expensive side of the cache contract. [`Scene::find`]
//! walks the owner's capability list and [`Scene::find_in_ancestors`] walks
//! the parent chain on top of that.

use std::fmt;

use crate::capability::{Capability, CapabilityId, CapabilityRef, CapabilityType};
use crate::entity::EntityId;
use crate::host::{CapabilityResolver, LivenessOracle, LookupScope};
use crate::pool::CapabilityPool;

/// One entity slot.
#[derive(Clone, Debug)]
struct EntitySlot {
    id: EntityId,
    alive: bool,
    parent: EntityId,
    children: Vec<EntityId>,
    /// Attached capabilities in attach order.
    capabilities: Vec<CapabilityId>,
}

impl EntitySlot {
    const fn dead() -> Self {
        Self {
            id: EntityId::NULL,
            alive: false,
            parent: EntityId::NULL,
            children: Vec::new(),
            capabilities: Vec::new(),
        }
    }
}

/// Container for all entities and their capabilities.
///
/// # Capacity
///
/// Both the entity slots and the capability pool have a fixed capacity set
/// at creation. Spawning past capacity returns [`EntityId::NULL`]; attaching
/// past capacity returns `None`.
///
/// # Example
///
/// ```rust,ignore
/// let mut scene = Scene::new(1024, 4096);
///
/// let player = scene.spawn();
/// let body = scene.attach(player, Rigidbody::with_mass(80.0)).unwrap();
/// assert_eq!(scene.find(player, CapabilityType::of::<Rigidbody>()), Some(body));
/// ```
pub struct Scene {
    /// All entity slots (pre-allocated).
    entities: Box<[EntitySlot]>,
    /// Free list of entity indices for reuse.
    free_indices: Vec<u32>,
    /// Number of currently alive entities.
    alive_count: usize,
    /// Maximum entity capacity.
    capacity: usize,
    /// Capability storage.
    capabilities: CapabilityPool,
}

impl Scene {
    /// Creates a new scene.
    ///
    /// # Arguments
    ///
    /// * `entity_capacity` - Maximum number of live entities
    /// * `capability_capacity` - Maximum number of live capabilities
    ///
    /// # Panics
    ///
    /// Panics if either capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(entity_capacity: usize, capability_capacity: usize) -> Self {
        assert!(entity_capacity > 0, "Capacity must be greater than zero");
        let Ok(max_index) = u32::try_from(entity_capacity) else {
            panic!("Capacity cannot exceed u32::MAX");
        };

        let entities = (0..entity_capacity)
            .map(|_| EntitySlot::dead())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            entities,
            free_indices: (0..max_index).rev().collect(),
            alive_count: 0,
            capacity: entity_capacity,
            capabilities: CapabilityPool::new(capability_capacity),
        }
    }

    /// Returns the maximum entity capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the maximum capability capacity.
    #[inline]
    #[must_use]
    pub const fn capability_capacity(&self) -> usize {
        self.capabilities.capacity()
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Returns the number of currently attached capabilities.
    #[inline]
    #[must_use]
    pub const fn capability_count(&self) -> usize {
        self.capabilities.allocated_count()
    }

    /// Spawns a root entity.
    ///
    /// Returns `EntityId::NULL` if capacity is reached.
    pub fn spawn(&mut self) -> EntityId {
        self.spawn_with_parent(EntityId::NULL)
    }

    /// Spawns an entity under `parent`.
    ///
    /// Returns `EntityId::NULL` if `parent` is not alive or capacity is reached.
    pub fn spawn_child(&mut self, parent: EntityId) -> EntityId {
        if !self.is_alive(parent) {
            return EntityId::NULL;
        }
        self.spawn_with_parent(parent)
    }

    fn spawn_with_parent(&mut self, parent: EntityId) -> EntityId {
        let Some(index) = self.free_indices.pop() else {
            return EntityId::NULL;
        };

        let slot = &mut self.entities[index as usize];

        // Increment generation to invalidate old references
        let generation = slot.id.generation().wrapping_add(1);
        let id = EntityId::new(index, generation);

        slot.id = id;
        slot.alive = true;
        slot.parent = parent;
        slot.children.clear();
        slot.capabilities.clear();
        self.alive_count += 1;

        if !parent.is_null() {
            self.entities[parent.index() as usize].children.push(id);
        }

        id
    }

    /// Despawns an entity and its whole subtree, destroying every capability
    /// attached to them.
    ///
    /// Returns `false` if the entity was already dead or the ID was stale.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }

        let parent = self.entities[id.index() as usize].parent;
        if self.is_alive(parent) {
            self.entities[parent.index() as usize]
                .children
                .retain(|child| *child != id);
        }

        let mut pending = vec![id];
        let mut removed = 0usize;
        while let Some(current) = pending.pop() {
            let idx = current.index() as usize;
            let slot = &mut self.entities[idx];

            slot.alive = false;
            slot.parent = EntityId::NULL;
            pending.append(&mut slot.children);
            for capability in slot.capabilities.drain(..) {
                self.capabilities.free(capability);
            }

            self.free_indices.push(current.index());
            self.alive_count -= 1;
            removed += 1;
        }

        tracing::trace!(entity = %id, removed, "despawned subtree");
        true
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    /// Returns the parent of a live entity, or `None` for roots and dead ids.
    #[must_use]
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.slot(id)
            .map(|slot| slot.parent)
            .filter(|parent| !parent.is_null())
    }

    /// Returns the direct children of a live entity.
    #[must_use]
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.slot(id).map_or(&[][..], |slot| slot.children.as_slice())
    }

    /// Iterates over all alive entity ids.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .filter(|slot| slot.alive)
            .map(|slot| slot.id)
    }

    /// Attaches a capability to `owner`.
    ///
    /// Returns `None` if the owner is not alive or the capability pool is full.
    pub fn attach<T: Capability>(&mut self, owner: EntityId, value: T) -> Option<CapabilityRef> {
        if !self.is_alive(owner) {
            return None;
        }

        let kind = CapabilityType::of::<T>();
        let id = self.capabilities.allocate(owner, kind, Box::new(value))?;
        self.entities[owner.index() as usize].capabilities.push(id);

        Some(CapabilityRef::new(id, owner, kind))
    }

    /// Destroys a single capability, leaving its owner alive.
    ///
    /// Returns `false` if the reference was already dead.
    pub fn destroy(&mut self, capability: CapabilityRef) -> bool {
        if !self.is_live(capability) {
            return false;
        }

        self.entities[capability.owner.index() as usize]
            .capabilities
            .retain(|id| *id != capability.id);
        self.capabilities.free(capability.id)
    }

    /// Checks whether a reference still points at a present capability of
    /// a live owner.
    #[must_use]
    pub fn is_live(&self, capability: CapabilityRef) -> bool {
        self.is_alive(capability.owner)
            && self.capabilities.get(capability.id).is_some_and(|stored| {
                stored.owner == capability.owner && stored.kind == capability.kind
            })
    }

    /// Reads a capability's value.
    ///
    /// Returns `None` if the reference is dead or `T` is not its type.
    #[must_use]
    pub fn get<T: Capability>(&self, capability: CapabilityRef) -> Option<&T> {
        if !self.is_live(capability) {
            return None;
        }
        self.capabilities
            .get(capability.id)?
            .value
            .downcast_ref::<T>()
    }

    /// Mutably accesses a capability's value.
    pub fn get_mut<T: Capability>(&mut self, capability: CapabilityRef) -> Option<&mut T> {
        if !self.is_live(capability) {
            return None;
        }
        self.capabilities
            .get_mut(capability.id)?
            .value
            .downcast_mut::<T>()
    }

    /// Iterates over every capability attached to `owner`, in attach order.
    pub fn capabilities_of(&self, owner: EntityId) -> impl Iterator<Item = CapabilityRef> + '_ {
        self.slot(owner)
            .into_iter()
            .flat_map(|slot| slot.capabilities.iter())
            .filter_map(move |&id| {
                self.capabilities
                    .get(id)
                    .map(|stored| CapabilityRef::new(id, owner, stored.kind))
            })
    }

    /// Finds the first capability of `kind` attached to `owner`.
    ///
    /// This is the native lookup: linear in the owner's capability count.
    #[must_use]
    pub fn find(&self, owner: EntityId, kind: CapabilityType) -> Option<CapabilityRef> {
        self.capabilities_of(owner)
            .find(|capability| capability.kind == kind)
    }

    /// Finds the first capability of `kind` on `owner` or its nearest
    /// ancestor that has one.
    #[must_use]
    pub fn find_in_ancestors(&self, owner: EntityId, kind: CapabilityType) -> Option<CapabilityRef> {
        let mut current = owner;
        while let Some(slot) = self.slot(current) {
            if let Some(found) = self.find(current, kind) {
                return Some(found);
            }
            current = slot.parent;
        }
        None
    }

    /// Despawns everything. Old entity ids and capability references stay
    /// dead after the reset.
    pub fn clear(&mut self) {
        for slot in self.entities.iter_mut() {
            slot.alive = false;
            slot.parent = EntityId::NULL;
            slot.children.clear();
            slot.capabilities.clear();
        }
        self.free_indices.clear();
        self.free_indices
            .extend((0..self.entities.len()).rev().filter_map(|i| u32::try_from(i).ok()));
        self.alive_count = 0;
        self.capabilities.clear();
    }

    fn slot(&self, id: EntityId) -> Option<&EntitySlot> {
        if id.is_null() {
            return None;
        }
        let slot = self.entities.get(id.index() as usize)?;
        (slot.alive && slot.id.generation() == id.generation()).then_some(slot)
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("capacity", &self.capacity)
            .field("alive_count", &self.alive_count)
            .field("capability_count", &self.capability_count())
            .finish_non_exhaustive()
    }
}

impl CapabilityResolver for Scene {
    fn resolve(
        &self,
        owner: EntityId,
        kind: CapabilityType,
        scope: LookupScope,
    ) -> Option<CapabilityRef> {
        match scope {
            LookupScope::SelfOnly => self.find(owner, kind),
            LookupScope::InAncestors => self.find_in_ancestors(owner, kind),
        }
    }
}

impl LivenessOracle for Scene {
    #[inline]
    fn is_live(&self, capability: CapabilityRef) -> bool {
        Scene::is_live(self, capability)
    }

    #[inline]
    fn is_owner_live(&self, owner: EntityId) -> bool {
        self.is_alive(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Collider, Renderer, Rigidbody, Transform};

    fn rigidbody() -> CapabilityType {
        CapabilityType::of::<Rigidbody>()
    }

    #[test]
    fn test_scene_creation() {
        let scene = Scene::new(1000, 2000);
        assert_eq!(scene.capacity(), 1000);
        assert_eq!(scene.capability_capacity(), 2000);
        assert_eq!(scene.alive_count(), 0);
    }

    #[test]
    fn test_spawn_despawn() {
        let mut scene = Scene::new(100, 100);

        let id1 = scene.spawn();
        assert!(!id1.is_null());
        assert!(scene.is_alive(id1));

        let id2 = scene.spawn();
        assert_eq!(scene.alive_count(), 2);

        assert!(scene.despawn(id1));
        assert!(!scene.is_alive(id1));
        assert!(!scene.despawn(id1));
        assert!(scene.is_alive(id2));

        // Spawn again - should reuse the slot
        let id3 = scene.spawn();
        assert_eq!(id3.index(), id1.index());
        assert_ne!(id3.generation(), id1.generation());
        assert!(!scene.is_alive(id1));
    }

    #[test]
    fn test_spawn_past_capacity() {
        let mut scene = Scene::new(1, 1);
        assert!(!scene.spawn().is_null());
        assert!(scene.spawn().is_null());
    }

    #[test]
    fn test_attach_and_find() {
        let mut scene = Scene::new(10, 10);
        let owner = scene.spawn();

        let transform = scene.attach(owner, Transform::default()).unwrap();
        let body = scene.attach(owner, Rigidbody::with_mass(3.0)).unwrap();

        assert_eq!(scene.find(owner, rigidbody()), Some(body));
        assert_eq!(scene.find(owner, CapabilityType::of::<Transform>()), Some(transform));
        assert_eq!(scene.find(owner, CapabilityType::of::<Renderer>()), None);
        assert_eq!(scene.get::<Rigidbody>(body).map(|rb| rb.mass), Some(3.0));
        assert!(scene.get::<Renderer>(body).is_none());
    }

    #[test]
    fn test_find_returns_first_attached() {
        let mut scene = Scene::new(10, 10);
        let owner = scene.spawn();

        let first = scene.attach(owner, Collider::Sphere(1.0)).unwrap();
        let second = scene.attach(owner, Collider::Box([1.0; 3])).unwrap();
        let kind = CapabilityType::of::<Collider>();

        assert_eq!(scene.find(owner, kind), Some(first));
        assert!(scene.destroy(first));
        assert_eq!(scene.find(owner, kind), Some(second));
    }

    #[test]
    fn test_destroy_kills_reference() {
        let mut scene = Scene::new(10, 10);
        let owner = scene.spawn();
        let body = scene.attach(owner, Rigidbody::default()).unwrap();

        assert!(scene.is_live(body));
        assert!(scene.destroy(body));
        assert!(!scene.is_live(body));
        assert!(!scene.destroy(body));
        assert!(scene.is_alive(owner));
        assert_eq!(scene.capability_count(), 0);
    }

    #[test]
    fn test_get_mut() {
        let mut scene = Scene::new(4, 4);
        let owner = scene.spawn();
        let renderer = scene.attach(owner, Renderer::default()).unwrap();

        scene.get_mut::<Renderer>(renderer).unwrap().visible = true;
        assert!(scene.get::<Renderer>(renderer).unwrap().visible);
    }

    #[test]
    fn test_ancestor_lookup() {
        let mut scene = Scene::new(10, 10);
        let root = scene.spawn();
        let arm = scene.spawn_child(root);
        let hand = scene.spawn_child(arm);
        let body = scene.attach(root, Rigidbody::default()).unwrap();

        assert_eq!(scene.parent(hand), Some(arm));
        assert_eq!(scene.parent(root), None);
        assert_eq!(scene.children(root), &[arm]);

        assert_eq!(scene.find(hand, rigidbody()), None);
        assert_eq!(scene.find_in_ancestors(hand, rigidbody()), Some(body));

        let local = scene.attach(arm, Rigidbody::default()).unwrap();
        assert_eq!(scene.find_in_ancestors(hand, rigidbody()), Some(local));
    }

    #[test]
    fn test_despawn_is_recursive() {
        let mut scene = Scene::new(10, 10);
        let root = scene.spawn();
        let child = scene.spawn_child(root);
        let grandchild = scene.spawn_child(child);
        let sibling = scene.spawn();
        let body = scene.attach(grandchild, Rigidbody::default()).unwrap();

        assert!(scene.despawn(child));
        assert!(scene.is_alive(root));
        assert!(!scene.is_alive(grandchild));
        assert!(!scene.is_live(body));
        assert!(scene.children(root).is_empty());
        assert!(scene.is_alive(sibling));
        assert_eq!(scene.alive_count(), 2);
        assert_eq!(scene.capability_count(), 0);
    }

    #[test]
    fn test_spawn_child_of_dead_parent() {
        let mut scene = Scene::new(4, 4);
        let parent = scene.spawn();
        scene.despawn(parent);
        assert!(scene.spawn_child(parent).is_null());
        assert!(scene.attach(parent, Renderer::default()).is_none());
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut scene = Scene::new(4, 4);
        let owner = scene.spawn();
        let body = scene.attach(owner, Rigidbody::default()).unwrap();

        scene.clear();
        assert_eq!(scene.alive_count(), 0);
        assert!(!scene.is_alive(owner));
        assert!(!scene.is_live(body));

        let fresh = scene.spawn();
        assert_ne!(fresh, owner);
        assert_eq!(scene.iter_alive().collect::<Vec<_>>(), vec![fresh]);
    }

    #[test]
    fn test_resolver_scopes() {
        let mut scene = Scene::new(4, 4);
        let root = scene.spawn();
        let child = scene.spawn_child(root);
        let body = scene.attach(root, Rigidbody::default()).unwrap();

        assert_eq!(scene.resolve(child, rigidbody(), LookupScope::SelfOnly), None);
        assert_eq!(scene.resolve(child, rigidbody(), LookupScope::InAncestors), Some(body));
        assert!(LivenessOracle::is_live(&scene, body));
    }
}
