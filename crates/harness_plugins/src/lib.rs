//! The harness's own canonical plugins: routing, Fabric Cache, and
//! logging. Each is a statically linked plugin, compiled into the harness
//! binary and registered with a [`harness_core::loader::Loader`] rather
//! than loaded from a shared object, but built against the exact same
//! descriptor contract a `dlopen`'d plugin would use.
//!
//! - [`routing_plugin`] - first-available destination failover
//! - [`fabric_cache_plugin`] - cached Fabric topology and shard metadata
//! - [`logger_plugin`] - the redacting `tracing_subscriber` writer

/// The Fabric Cache plugin.
pub mod fabric_cache_plugin;

/// The logging plugin.
pub mod logger_plugin;

/// The routing plugin.
pub mod routing_plugin;

/// Registers all three canonical plugins with `loader` under their
/// conventional names (`routing`, `fabric_cache`, `logger`).
pub fn register_all(loader: &mut harness_core::loader::Loader) {
    loader.register("routing", routing_plugin::descriptor);
    loader.register("fabric_cache", fabric_cache_plugin::descriptor);
    loader.register("logger", logger_plugin::descriptor);
}
