//! # COMPCACHE
//!
//! Identity-and-type keyed lookup cache for capability queries against a
//! host object model.
//!
//! ## Contract
//!
//! 1. **Hits are free** - a live cached entry is returned without calling
//!    the resolver
//! 2. **Never a dead reference** - every stored entry passes the liveness
//!    oracle before it is returned; stale entries are evicted and resolved
//!    again
//! 3. **No negative caching** - a resolver miss is retried on the next call
//! 4. **Explicit lifetime** - no global singleton; the owner of the scene
//!    owns the cache and clears it on reload
//!
//! ## Example
//!
//! ```rust,ignore
//! use compcache::{IdentityTypeCache, SceneSession};
//! use compcache_core::{Rigidbody, Scene};
//!
//! let mut session = SceneSession::new(Scene::new(1024, 4096));
//! let crate_entity = session.spawn();
//! session.attach(crate_entity, Rigidbody::with_mass(12.0));
//!
//! let body = session.get::<Rigidbody>(crate_entity); // resolves
//! let again = session.get::<Rigidbody>(crate_entity); // hit
//! assert_eq!(body, again);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cache;
pub mod config;
pub mod error;
pub mod session;
pub mod stats;

pub use cache::{CacheKey, IdentityTypeCache};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use session::SceneSession;
pub use stats::CacheStats;
