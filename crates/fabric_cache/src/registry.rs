//! Name-keyed access to multiple [`FabricCache`] instances.
//!
//! The upstream Fabric Cache plugin exposes its caches through a
//! process-wide mapping from a configured name (one per monitored Fabric
//! group) to its cache instance, with `cache_init`/`group_lookup`/
//! `shard_lookup`/`have_cache` all taking that name as their first
//! argument. This registry is the owned, non-`static` equivalent: callers
//! hold it (typically behind a single process-wide slot of their own) and
//! look up by name through it instead of through a bare global.

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::cache::{FabricCache, FabricSource};
use crate::error::FabricCacheError;
use crate::model::ManagedServer;

/// Owns zero or more named [`FabricCache`] instances.
#[derive(Default)]
pub struct FabricCacheRegistry {
    caches: RwLock<HashMap<String, Arc<FabricCache>>>,
}

impl FabricCacheRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the named cache if it does not already exist, performing one
    /// synchronous warm-up fetch and spawning its refresher. A second call
    /// with a name already present is a no-op: it returns `Ok(())` without
    /// touching the existing cache or its source.
    pub fn cache_init(
        &self,
        name: &str,
        ttl: Duration,
        source: Arc<dyn FabricSource>,
    ) -> Result<(), FabricCacheError> {
        if self.caches.read().contains_key(name) {
            return Ok(());
        }

        let cache = FabricCache::new(ttl);
        cache.start(source)?;
        self.caches.write().entry(name.to_owned()).or_insert_with(|| Arc::new(cache));
        Ok(())
    }

    /// Whether a cache named `name` has been created.
    #[must_use]
    pub fn have_cache(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    fn get(&self, name: &str) -> Result<Arc<FabricCache>, FabricCacheError> {
        self.caches
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FabricCacheError::NotFound {
                kind: "cache",
                key: name.to_owned(),
            })
    }

    /// Returns the servers of `group_id` within the named cache.
    pub fn group_lookup(
        &self,
        name: &str,
        group_id: &str,
    ) -> Result<Vec<ManagedServer>, FabricCacheError> {
        self.get(name)?.group_lookup(group_id)
    }

    /// Resolves `shard_key` against `table_name` within the named cache.
    pub fn shard_lookup(
        &self,
        name: &str,
        table_name: &str,
        shard_key: &str,
    ) -> Result<Vec<ManagedServer>, FabricCacheError> {
        self.get(name)?.shard_lookup(table_name, shard_key)
    }

    /// Stops and joins every named cache's refresher thread.
    pub fn stop_all(&self) {
        for cache in self.caches.read().values() {
            cache.stop();
        }
    }
}
