//! The Fabric Cache plugin: wires a [`FabricCacheRegistry`] to the
//! `[fabric_cache]`/`[fabric_cache:name]` configuration sections — one
//! named cache per monitored Fabric group — and keeps each refreshed for
//! the lifetime of the harness.
//!
//! The actual metadata fetch (`dump.servers` / `dump.sharding_information`
//! against the coordinator) is the wire-protocol call site documented in
//! §6; dialing the coordinator and decoding its result sets is out of
//! scope here, so [`CoordinatorSource`] only establishes that the
//! configured host is reachable before reporting no metadata.

use core::ffi::{c_int, c_void};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use fabric_cache::{FabricCacheError, FabricCacheRegistry, FabricSnapshot, FabricSource};
use harness_core::config::Config;
use harness_core::engine::HarnessInfo;
use harness_core::manifest::{PluginDescriptor, ABI_VERSION};
use harness_core::version::Version;
use name_resolver::NameResolver;

static REGISTRY: OnceLock<FabricCacheRegistry> = OnceLock::new();

/// The cache name used for the section's own entry when it carries no
/// disambiguating key, matching `cache_init`'s "one cache per configured
/// Fabric group" contract even when only one group is configured.
const DEFAULT_CACHE_NAME: &str = "default";

/// Reaches the configured coordinator just far enough to confirm it is
/// listening, then reports that no metadata is available. Decoding the
/// coordinator's stored-procedure result sets belongs to the wire-protocol
/// codec, which this harness does not implement.
struct CoordinatorSource {
    host: String,
    port: u16,
}

impl FabricSource for CoordinatorSource {
    fn fetch(&self) -> Result<FabricSnapshot, FabricCacheError> {
        let resolver = NameResolver::new(Duration::from_secs(60));
        resolver.resolve(&self.host).map_err(|_| FabricCacheError::NotFound {
            kind: "coordinator",
            key: format!("{}:{}", self.host, self.port),
        })?;
        Err(FabricCacheError::NotFound {
            kind: "coordinator",
            key: format!("{}:{}", self.host, self.port),
        })
    }
}

/// One `[fabric_cache]` or `[fabric_cache:name]` section's settings.
struct CacheConfig {
    name: String,
    host: String,
    port: u16,
    ttl_seconds: u64,
}

fn read_cache_configs(config: &Config) -> Vec<CacheConfig> {
    config
        .get("fabric_cache")
        .filter_map(|section| {
            let id = section.id();
            let host = config.get_value(id, "host").ok()?;
            let port = config
                .get_value(id, "port")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3306);
            let ttl_seconds = config
                .get_value(id, "ttl_seconds")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(fabric_cache::DEFAULT_TTL.as_secs());
            let name = if id.key.is_empty() {
                DEFAULT_CACHE_NAME.to_owned()
            } else {
                id.key.clone()
            };
            Some(CacheConfig {
                name,
                host: host.to_owned(),
                port,
                ttl_seconds,
            })
        })
        .collect()
}

extern "C" fn init(info: *const c_void) -> c_int {
    // Safety: see `routing_plugin::init`.
    let config = unsafe { (*info.cast::<HarnessInfo>()).config() };
    let cache_configs = read_cache_configs(config);
    if cache_configs.is_empty() {
        tracing::error!(target: "fabric_cache", "no coordinator host configured");
        return 1;
    }

    let registry = FabricCacheRegistry::new();
    for cfg in cache_configs {
        let source = Arc::new(CoordinatorSource {
            host: cfg.host,
            port: cfg.port,
        });
        // A coordinator that is not yet reachable at startup is logged and
        // retried by the refresher, not treated as a fatal init error.
        if let Err(e) = registry.cache_init(&cfg.name, Duration::from_secs(cfg.ttl_seconds), source) {
            tracing::warn!(target: "fabric_cache", cache = %cfg.name, error = %e, "initial fabric refresh failed, continuing with an empty cache");
        }
    }

    if REGISTRY.set(registry).is_err() {
        tracing::error!(target: "fabric_cache", "fabric cache plugin initialized twice");
        return 1;
    }
    0
}

extern "C" fn deinit(_info: *const c_void) -> c_int {
    if let Some(registry) = REGISTRY.get() {
        registry.stop_all();
    }
    0
}

static REQUIRES: [*const core::ffi::c_char; 0] = [];
static CONFLICTS: [*const core::ffi::c_char; 0] = [];

static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    abi_version: ABI_VERSION,
    brief: c"cached Fabric topology and shard metadata".as_ptr(),
    plugin_version: Version::new(1, 0, 0).packed(),
    requires: REQUIRES.as_ptr(),
    requires_len: 0,
    conflicts: CONFLICTS.as_ptr(),
    conflicts_len: 0,
    init: Some(init),
    deinit: Some(deinit),
    start: None,
};

/// Returns the Fabric Cache plugin's descriptor, for
/// [`harness_core::loader::Loader::register`].
#[must_use]
pub fn descriptor() -> &'static PluginDescriptor {
    &DESCRIPTOR
}

/// The registry built at `init`, if the plugin has been initialized.
#[must_use]
pub fn registry() -> Option<&'static FabricCacheRegistry> {
    REGISTRY.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_source_reports_metadata_unavailable() {
        let source = CoordinatorSource {
            host: "127.0.0.1".to_owned(),
            port: 3306,
        };
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, FabricCacheError::NotFound { kind: "coordinator", .. }));
    }

    #[test]
    fn unkeyed_section_becomes_the_default_cache_name() {
        let mut config = Config::new("test");
        config.add_section("fabric_cache", "").unwrap().set("host", "coordinator.local");
        let configs = read_cache_configs(&config);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, DEFAULT_CACHE_NAME);
        assert_eq!(configs[0].host, "coordinator.local");
    }

    #[test]
    fn keyed_sections_become_distinct_cache_names() {
        let mut config = Config::new("test");
        config.add_section("fabric_cache", "east").unwrap().set("host", "east.local");
        config.add_section("fabric_cache", "west").unwrap().set("host", "west.local");
        let configs = read_cache_configs(&config);
        assert_eq!(configs.len(), 2);
        assert!(configs.iter().any(|c| c.name == "east" && c.host == "east.local"));
        assert!(configs.iter().any(|c| c.name == "west" && c.host == "west.local"));
    }

    #[test]
    fn sections_with_no_host_are_dropped() {
        let mut config = Config::new("test");
        config.add_section("fabric_cache", "broken").unwrap();
        assert!(read_cache_configs(&config).is_empty());
    }
}
