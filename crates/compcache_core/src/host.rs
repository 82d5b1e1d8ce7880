//! # Host Contracts
//!
//! The two collaborators a lookup cache is written against:
//!
//! ```text
//!   cache miss ──> CapabilityResolver::resolve   (expensive, opaque)
//!   cache hit  ──> LivenessOracle::is_live       (cheap, must be honest)
//! ```
//!
//! Both are synchronous. [`Scene`](crate::Scene) implements both; tests
//! implement them with counting stubs.

use crate::capability::{CapabilityRef, CapabilityType};
use crate::entity::EntityId;

/// Where a resolver searches for a capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LookupScope {
    /// Only the owner itself.
    #[default]
    SelfOnly,
    /// The owner, then each ancestor up to the root.
    InAncestors,
}

/// The native "find capability of type T on object O" query.
pub trait CapabilityResolver {
    /// Finds a capability of `kind` starting from `owner`.
    ///
    /// Returns `None` when nothing matches. A miss is a normal outcome,
    /// not an error.
    fn resolve(
        &self,
        owner: EntityId,
        kind: CapabilityType,
        scope: LookupScope,
    ) -> Option<CapabilityRef>;
}

/// Answers whether a previously resolved reference still points at a
/// present capability.
pub trait LivenessOracle {
    /// Returns `false` once the capability or its owner has been destroyed.
    fn is_live(&self, capability: CapabilityRef) -> bool;

    /// Returns `false` once the entity a lookup started from is gone.
    ///
    /// For ancestor lookups the capability belongs to someone else, so this
    /// is what notices that the asking entity itself was despawned.
    fn is_owner_live(&self, owner: EntityId) -> bool;
}

impl<T: CapabilityResolver + ?Sized> CapabilityResolver for &T {
    #[inline]
    fn resolve(
        &self,
        owner: EntityId,
        kind: CapabilityType,
        scope: LookupScope,
    ) -> Option<CapabilityRef> {
        (**self).resolve(owner, kind, scope)
    }
}

impl<T: LivenessOracle + ?Sized> LivenessOracle for &T {
    #[inline]
    fn is_live(&self, capability: CapabilityRef) -> bool {
        (**self).is_live(capability)
    }

    #[inline]
    fn is_owner_live(&self, owner: EntityId) -> bool {
        (**self).is_owner_live(owner)
    }
}
