//! Errors raised by shard-key comparison and cache lookups.

/// Errors the Fabric Cache can raise.
#[derive(Debug, thiserror::Error)]
pub enum FabricCacheError {
    /// A key or lower bound could not be parsed in the representation its
    /// [`crate::model::ShardType`] requires.
    #[error("'{value}' is not a valid {shard_type} shard key")]
    MalformedKey {
        /// The offending value.
        value: String,
        /// The shard type it failed to parse as.
        shard_type: &'static str,
    },

    /// A lookup named a cache that was never `cache_init`'d. An unknown
    /// group or table *within* a known cache is not an error — see
    /// [`crate::cache::FabricCache::group_lookup`]/`shard_lookup`.
    #[error("no {kind} found for '{key}'")]
    NotFound {
        /// `"cache"`.
        kind: &'static str,
        /// The lookup key that matched nothing.
        key: String,
    },
}
