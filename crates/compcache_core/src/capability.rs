//! # Capabilities
//!
//! A capability is a facet attached to an entity (physics body, renderer,
//! collider) that game code looks up by type. This module holds:
//! - The [`Capability`] marker trait
//! - [`CapabilityType`], the hashable type token used as a cache-key part
//! - [`CapabilityId`] / [`CapabilityRef`], weak generational handles
//! - A handful of stock capability types

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::entity::EntityId;

/// Marker trait for anything that can be attached to an entity.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Default)]
/// struct Health(u32);
///
/// impl Capability for Health {}
/// ```
pub trait Capability: Any + Send + Sync {}

/// Runtime type token for a capability kind.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct CapabilityType {
    id: TypeId,
    name: &'static str,
}

impl CapabilityType {
    /// Returns the token for capability type `T`.
    #[inline]
    #[must_use]
    pub fn of<T: Capability>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the full type name, e.g. `compcache_core::capability::Rigidbody`.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Returns the last path segment of the type name.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    /// Checks whether this token names `T`.
    #[inline]
    #[must_use]
    pub fn is<T: Capability>(self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for CapabilityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CapabilityType {}

impl Hash for CapabilityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Generational slot handle into a scene's capability pool.
///
/// Same layout as [`EntityId`]: index in the low 32 bits, generation in the
/// high 32 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CapabilityId(u64);

#[allow(clippy::cast_possible_truncation)]
impl CapabilityId {
    /// Creates a capability ID from slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the slot generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

/// Weak, non-owning reference to a capability instance.
///
/// Holding a `CapabilityRef` never keeps anything alive. The capability may
/// be destroyed at any time; ask a [`LivenessOracle`](crate::LivenessOracle)
/// before trusting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CapabilityRef {
    /// Slot in the capability pool.
    pub id: CapabilityId,
    /// The entity the capability is attached to.
    pub owner: EntityId,
    /// The capability's type.
    pub kind: CapabilityType,
}

impl CapabilityRef {
    /// Creates a new reference.
    #[inline]
    #[must_use]
    pub const fn new(id: CapabilityId, owner: EntityId, kind: CapabilityType) -> Self {
        Self { id, owner, kind }
    }
}

// =============================================================================
// Stock capability types
// =============================================================================

/// Rigid body for physics simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rigidbody {
    /// Mass in kilograms.
    pub mass: f32,
    /// Linear velocity in world units per second.
    pub velocity: [f32; 3],
    /// Whether the body is driven by gameplay code rather than physics.
    pub kinematic: bool,
}

impl Capability for Rigidbody {}

impl Rigidbody {
    /// Creates a dynamic body with the given mass and no velocity.
    #[inline]
    #[must_use]
    pub const fn with_mass(mass: f32) -> Self {
        Self {
            mass,
            velocity: [0.0; 3],
            kinematic: false,
        }
    }
}

/// Position, rotation and scale in parent space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation.
    pub position: [f32; 3],
    /// Rotation quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    /// Non-uniform scale.
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

impl Capability for Transform {}

/// Mesh renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Renderer {
    /// Mesh asset id.
    pub mesh_id: u32,
    /// Material asset id.
    pub material_id: u32,
    /// Whether the renderer is drawn.
    pub visible: bool,
}

impl Capability for Renderer {}

/// Collision volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
    /// Sphere with radius.
    Sphere(f32),
    /// Axis-aligned box with half extents.
    Box([f32; 3]),
}

impl Default for Collider {
    fn default() -> Self {
        Self::Sphere(0.5)
    }
}

impl Capability for Collider {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_token_equality() {
        assert_eq!(CapabilityType::of::<Rigidbody>(), CapabilityType::of::<Rigidbody>());
        assert_ne!(CapabilityType::of::<Rigidbody>(), CapabilityType::of::<Renderer>());
        assert!(CapabilityType::of::<Collider>().is::<Collider>());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(CapabilityType::of::<Rigidbody>().short_name(), "Rigidbody");
        assert!(CapabilityType::of::<Rigidbody>().name().ends_with("::Rigidbody"));
        assert_eq!(format!("{:?}", CapabilityType::of::<Transform>()), "Transform");
    }

    #[test]
    fn test_capability_id_roundtrip() {
        let id = CapabilityId::new(42, 3);
        assert_eq!(id.index(), 42);
        assert_eq!(id.generation(), 3);
    }
}
