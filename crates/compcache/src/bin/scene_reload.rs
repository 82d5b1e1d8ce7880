//! # Scene Reload Walkthrough
//!
//! Drives an identity cache through hits, a destroyed capability and a
//! scene reload, counting every native lookup.
//!
//! Usage: `scene_reload [cache.toml]`, log level via `RUST_LOG`.

use std::sync::atomic::{AtomicU64, Ordering};

use compcache::{CacheConfig, IdentityTypeCache, SceneSession};
use compcache_core::{
    CapabilityRef, CapabilityResolver, CapabilityType, EntityId, LivenessOracle, LookupScope,
    Rigidbody, Scene,
};
use tracing_subscriber::EnvFilter;

/// Scene wrapper that counts native lookups.
struct CountingScene<'a> {
    scene: &'a Scene,
    lookups: &'a AtomicU64,
}

impl CapabilityResolver for CountingScene<'_> {
    fn resolve(
        &self,
        owner: EntityId,
        kind: CapabilityType,
        scope: LookupScope,
    ) -> Option<CapabilityRef> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.scene.resolve(owner, kind, scope)
    }
}

impl LivenessOracle for CountingScene<'_> {
    fn is_live(&self, capability: CapabilityRef) -> bool {
        self.scene.is_live(capability)
    }

    fn is_owner_live(&self, owner: EntityId) -> bool {
        self.scene.is_alive(owner)
    }
}

fn lookup(session: &SceneSession, lookups: &AtomicU64, owner: EntityId) -> Option<CapabilityRef> {
    let host = CountingScene {
        scene: session.scene(),
        lookups,
    };
    session.cache().get::<Rigidbody, _>(&host, owner)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match CacheConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("could not load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => CacheConfig::default(),
    };

    let lookups = AtomicU64::new(0);
    let mut session = SceneSession::with_cache(Scene::new(64, 256), IdentityTypeCache::with_config(config));

    let owner = session.spawn();
    let first = session.attach(owner, Rigidbody::with_mass(10.0));
    tracing::info!("spawned {owner} with body {first:?}");

    for _ in 0..3 {
        let found = lookup(&session, &lookups, owner);
        tracing::info!(found = found.is_some(), lookups = lookups.load(Ordering::Relaxed), "lookup");
    }

    if let Some(body) = first {
        session.destroy(body);
    }
    let second = session.attach(owner, Rigidbody::with_mass(20.0));
    let found = lookup(&session, &lookups, owner);
    tracing::info!(
        replaced = (found == second),
        lookups = lookups.load(Ordering::Relaxed),
        "lookup after destroy"
    );

    session.reset_scene();
    let found = lookup(&session, &lookups, owner);
    tracing::info!(
        found = found.is_some(),
        lookups = lookups.load(Ordering::Relaxed),
        "lookup after reset"
    );

    let stats = session.cache().stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        not_found = stats.not_found,
        stale = stats.stale_evictions,
        clears = stats.clears,
        hit_ratio = stats.hit_ratio(),
        "final cache stats"
    );
}
