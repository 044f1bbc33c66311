//! A pluggable network service harness: dynamic plugin loading,
//! dependency-ordered lifecycle management, and a routing/Fabric Cache
//! plugin set.

pub use harness_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use harness_internal::prelude::*;
}
