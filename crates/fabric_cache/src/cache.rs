//! The cache itself: a double-buffered snapshot behind a
//! [`parking_lot::RwLock`], refreshed on a background thread on a fixed
//! TTL cadence.
//!
//! Lookups never block on network I/O; they read whatever snapshot is
//! currently published. A fetch that fails leaves the previous snapshot in
//! place rather than clearing the cache, since a transient Fabric outage
//! should degrade to stale data, not no data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::comparator::select_shard;
use crate::error::FabricCacheError;
use crate::model::{ManagedServer, ManagedShard};

/// Default refresh interval when none is configured, matching the
/// upstream `kDefaultTimeToLive` of ten seconds.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// One full fetch of Fabric's group and shard metadata.
#[derive(Debug, Clone, Default)]
pub struct FabricSnapshot {
    /// HA group id → its managed servers.
    pub groups: HashMap<String, Vec<ManagedServer>>,
    /// `schema.table` → its shard table, in Fabric's own order.
    pub shard_tables: HashMap<String, Vec<ManagedShard>>,
}

/// Fetches a [`FabricSnapshot`] from wherever Fabric's metadata actually
/// lives. The production implementation talks to a Fabric node over its
/// RPC interface; tests substitute a fixed or failing source.
pub trait FabricSource: Send + Sync {
    /// Fetches the full current snapshot.
    fn fetch(&self) -> Result<FabricSnapshot, FabricCacheError>;
}

/// Cached, periodically refreshed view of Fabric group and shard metadata.
pub struct FabricCache {
    snapshot: Arc<RwLock<FabricSnapshot>>,
    ttl: Duration,
    stop: Arc<AtomicBool>,
    refresher: Mutex<Option<JoinHandle<()>>>,
}

impl FabricCache {
    /// Builds an empty cache with the given refresh interval. The cache
    /// holds no data and refreshes nothing until [`FabricCache::start`] is
    /// called.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(FabricSnapshot::default())),
            ttl,
            stop: Arc::new(AtomicBool::new(false)),
            refresher: Mutex::new(None),
        }
    }

    /// Fetches one snapshot synchronously, publishes it, then spawns the
    /// background refresher thread and returns — it does not join the
    /// thread or wait out the first TTL tick before returning control to
    /// the caller.
    pub fn start(&self, source: Arc<dyn FabricSource>) -> Result<(), FabricCacheError> {
        self.refresh_once(source.as_ref())?;

        let snapshot = Arc::clone(&self.snapshot);
        let stop = Arc::clone(&self.stop);
        let ttl = self.ttl;

        let handle = std::thread::Builder::new()
            .name("fabric-cache-refresh".to_owned())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    sleep_in_slices(ttl, &stop);
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    match source.fetch() {
                        Ok(fresh) => {
                            *snapshot.write() = fresh;
                            tracing::debug!(target: "fabric_cache", "refreshed snapshot");
                        }
                        Err(e) => {
                            tracing::warn!(target: "fabric_cache", error = %e, "refresh failed, keeping stale snapshot");
                        }
                    }
                }
            })
            .expect("failed to spawn fabric cache refresher thread");

        *self.refresher.lock() = Some(handle);
        Ok(())
    }

    fn refresh_once(&self, source: &dyn FabricSource) -> Result<(), FabricCacheError> {
        let fresh = source.fetch()?;
        *self.snapshot.write() = fresh;
        Ok(())
    }

    /// Stops the refresher thread and joins it.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.refresher.lock().take() {
            let _ = handle.join();
        }
    }

    /// Returns the servers of HA group `group_id`, or an empty list if the
    /// group is unknown.
    pub fn group_lookup(&self, group_id: &str) -> Result<Vec<ManagedServer>, FabricCacheError> {
        let snapshot = self.snapshot.read();
        Ok(snapshot.groups.get(group_id).cloned().unwrap_or_default())
    }

    /// Resolves `shard_key` against `table_name`'s shard table, then
    /// returns the servers of the group the selected shard lives on. Returns
    /// an empty list if the table is unknown or no shard's bound satisfies
    /// `shard_key`.
    pub fn shard_lookup(
        &self,
        table_name: &str,
        shard_key: &str,
    ) -> Result<Vec<ManagedServer>, FabricCacheError> {
        let snapshot = self.snapshot.read();
        let Some(shards) = snapshot.shard_tables.get(table_name) else {
            return Ok(Vec::new());
        };
        let Some(shard) = select_shard(shards, shard_key)? else {
            return Ok(Vec::new());
        };
        let group_id = shard.group_id.clone();
        drop(snapshot);
        self.group_lookup(&group_id)
    }
}

impl Drop for FabricCache {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sleep_in_slices(total: Duration, stop: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ServerMode, ServerStatus, ShardType};
    use std::sync::atomic::AtomicUsize;

    fn server(uuid: &str, group: &str) -> ManagedServer {
        ManagedServer {
            server_uuid: uuid.to_owned(),
            group_id: group.to_owned(),
            host: "127.0.0.1".to_owned(),
            port: 3306,
            mode: ServerMode::ReadWrite,
            status: ServerStatus::Primary,
            weight: 1.0,
        }
    }

    struct FixedSource(FabricSnapshot);

    impl FabricSource for FixedSource {
        fn fetch(&self) -> Result<FabricSnapshot, FabricCacheError> {
            Ok(self.0.clone())
        }
    }

    fn sample_snapshot() -> FabricSnapshot {
        let mut groups = HashMap::new();
        groups.insert("group-1".to_owned(), vec![server("s1", "group-1")]);

        let mut shard_tables = HashMap::new();
        shard_tables.insert(
            "db.orders".to_owned(),
            vec![ManagedShard {
                schema_name: "db".to_owned(),
                table_name: "orders".to_owned(),
                column_name: "id".to_owned(),
                lower_bound: "0".to_owned(),
                shard_id: 1,
                shard_type: ShardType::Integer,
                group_id: "group-1".to_owned(),
                global_group: "global".to_owned(),
            }],
        );

        FabricSnapshot {
            groups,
            shard_tables,
        }
    }

    #[test]
    fn group_lookup_returns_cached_servers() {
        let cache = FabricCache::new(Duration::from_secs(60));
        cache
            .start(Arc::new(FixedSource(sample_snapshot())))
            .unwrap();
        let servers = cache.group_lookup("group-1").unwrap();
        assert_eq!(servers.len(), 1);
        cache.stop();
    }

    #[test]
    fn shard_lookup_resolves_through_to_group() {
        let cache = FabricCache::new(Duration::from_secs(60));
        cache
            .start(Arc::new(FixedSource(sample_snapshot())))
            .unwrap();
        let servers = cache.shard_lookup("db.orders", "42").unwrap();
        assert_eq!(servers[0].server_uuid, "s1");
        cache.stop();
    }

    #[test]
    fn missing_group_returns_an_empty_list() {
        let cache = FabricCache::new(Duration::from_secs(60));
        cache
            .start(Arc::new(FixedSource(sample_snapshot())))
            .unwrap();
        assert!(cache.group_lookup("nonexistent").unwrap().is_empty());
        cache.stop();
    }

    #[test]
    fn missing_table_returns_an_empty_list() {
        let cache = FabricCache::new(Duration::from_secs(60));
        cache
            .start(Arc::new(FixedSource(sample_snapshot())))
            .unwrap();
        assert!(cache.shard_lookup("no.such.table", "42").unwrap().is_empty());
        cache.stop();
    }

    struct FailingSource(AtomicUsize);

    impl FabricSource for FailingSource {
        fn fetch(&self) -> Result<FabricSnapshot, FabricCacheError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(FabricCacheError::NotFound {
                kind: "group",
                key: "n/a".to_owned(),
            })
        }
    }

    #[test]
    fn start_propagates_the_first_fetch_failure() {
        let cache = FabricCache::new(Duration::from_secs(60));
        let err = cache.start(Arc::new(FailingSource(AtomicUsize::new(0))));
        assert!(err.is_err());
    }
}
