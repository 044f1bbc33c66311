//! Cached, periodically refreshed view of Fabric group and shard metadata.
//!
//! - [`model`] - [`ManagedServer`](model::ManagedServer) and
//!   [`ManagedShard`](model::ManagedShard), the data Fabric reports
//! - [`comparator`] - shard-key comparison and the "maximum lower bound ≤
//!   key" shard selection rule
//! - [`cache`] - the refreshed, `RwLock`-guarded snapshot and its lookups
//! - [`registry`] - name-keyed access to multiple caches
//!   ([`FabricCacheRegistry`](registry::FabricCacheRegistry))
//! - [`error`] - [`FabricCacheError`](error::FabricCacheError)

/// Refreshed snapshot storage and lookups.
pub mod cache;

/// Shard-key comparison.
pub mod comparator;

/// Errors raised by comparison and lookup.
pub mod error;

/// The cached data model.
pub mod model;

/// Name-keyed access to multiple caches.
pub mod registry;

pub use cache::{FabricCache, FabricSnapshot, FabricSource, DEFAULT_TTL};
pub use error::FabricCacheError;
pub use model::{ManagedServer, ManagedShard, ServerMode, ServerStatus, ShardType};
pub use registry::FabricCacheRegistry;
