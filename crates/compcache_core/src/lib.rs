//! # COMPCACHE Core
//!
//! The host object model a component-lookup cache sits in front of:
//! - Generational entity ids that act as stable owner identities
//! - Type tokens and weak handles for attached capabilities
//! - A fixed-capacity [`Scene`] with a parent hierarchy
//! - The [`CapabilityResolver`] / [`LivenessOracle`] contracts
//!
//! ## Example
//!
//! ```rust,ignore
//! use compcache_core::{CapabilityType, Rigidbody, Scene};
//!
//! let mut scene = Scene::new(1024, 4096);
//! let crate_entity = scene.spawn();
//! let body = scene.attach(crate_entity, Rigidbody::with_mass(12.0)).unwrap();
//!
//! assert!(scene.is_live(body));
//! scene.despawn(crate_entity);
//! assert!(!scene.is_live(body));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod capability;
pub mod entity;
pub mod host;
mod pool;
pub mod scene;

pub use capability::{
    Capability, CapabilityId, CapabilityRef, CapabilityType, Collider, Renderer, Rigidbody,
    Transform,
};
pub use entity::EntityId;
pub use host::{CapabilityResolver, LivenessOracle, LookupScope};
pub use scene::Scene;
