//! # Harness Internal Library
//!
//! Re-exports the harness's own crates for convenience.

/// The Plugin Descriptor, Configuration Store, Dependency Resolver and
/// Lifecycle Engine.
pub use harness_core;

/// The harness's canonical routing, Fabric Cache, and logging plugins.
pub use harness_plugins;

/// Background-refreshed Fabric topology and shard metadata.
pub use fabric_cache;

/// Regex-based log redaction.
pub use log_filter;

/// Hostname and TCP service name resolution.
pub use name_resolver;

/// First-available failover destination selection.
pub use routing_selector;

/// Re-export the most commonly used types for easy access.
pub mod prelude {
    pub use harness_core::prelude::*;
    pub use harness_plugins::register_all;
}
