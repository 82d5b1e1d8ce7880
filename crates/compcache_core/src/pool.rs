//! # Capability Pool
//!
//! Fixed-capacity, generational slot storage for capability instances.

use std::any::Any;

use crate::capability::{CapabilityId, CapabilityType};
use crate::entity::EntityId;

/// A capability instance together with the metadata lookups need.
pub(crate) struct StoredCapability {
    /// The entity this capability is attached to.
    pub(crate) owner: EntityId,
    /// The capability's type token.
    pub(crate) kind: CapabilityType,
    /// The value itself.
    pub(crate) value: Box<dyn Any + Send + Sync>,
}

struct Slot {
    generation: u32,
    entry: Option<StoredCapability>,
}

/// Pool of capability slots.
///
/// Allocation bumps the slot generation, so a [`CapabilityId`] handed out
/// before a free never matches the slot again.
///
/// # Thread Safety
///
/// Not internally synchronized. The owning scene takes `&mut self` for
/// every mutation.
pub(crate) struct CapabilityPool {
    /// The storage array.
    slots: Box<[Slot]>,
    /// Free list - indices of available slots.
    free_list: Vec<u32>,
    /// Number of allocated capabilities.
    allocated_count: usize,
    /// Total capacity.
    capacity: usize,
}

impl CapabilityPool {
    /// Creates a new pool with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        let Ok(max_index) = u32::try_from(capacity) else {
            panic!("Capacity cannot exceed u32::MAX");
        };

        let slots: Vec<Slot> = (0..capacity)
            .map(|_| Slot {
                generation: u32::MAX,
                entry: None,
            })
            .collect();

        Self {
            slots: slots.into_boxed_slice(),
            free_list: (0..max_index).rev().collect(),
            allocated_count: 0,
            capacity,
        }
    }

    /// Returns the total capacity.
    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of currently allocated capabilities.
    #[inline]
    pub(crate) const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Stores a capability and returns its handle, or `None` if the pool is full.
    pub(crate) fn allocate(
        &mut self,
        owner: EntityId,
        kind: CapabilityType,
        value: Box<dyn Any + Send + Sync>,
    ) -> Option<CapabilityId> {
        let index = self.free_list.pop()?;
        let slot = &mut self.slots[index as usize];

        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = Some(StoredCapability { owner, kind, value });
        self.allocated_count += 1;

        Some(CapabilityId::new(index, slot.generation))
    }

    /// Frees a capability. Returns `false` for stale or unknown handles.
    pub(crate) fn free(&mut self, id: CapabilityId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return false;
        };
        if slot.generation != id.generation() || slot.entry.take().is_none() {
            return false;
        }

        self.free_list.push(id.index());
        self.allocated_count -= 1;
        true
    }

    /// Gets a stored capability, or `None` if the handle is stale.
    #[inline]
    pub(crate) fn get(&self, id: CapabilityId) -> Option<&StoredCapability> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Gets a stored capability mutably, or `None` if the handle is stale.
    #[inline]
    pub(crate) fn get_mut(&mut self, id: CapabilityId) -> Option<&mut StoredCapability> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Drops every capability. Generations are kept so old handles stay dead.
    pub(crate) fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.entry = None;
        }
        self.free_list.clear();
        self.free_list
            .extend((0..self.slots.len()).rev().filter_map(|i| u32::try_from(i).ok()));
        self.allocated_count = 0;
    }
}
