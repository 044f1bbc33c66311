//! Plugin descriptors, dependency resolution, and the lifecycle engine for
//! the Harness runtime.
//!
//! - [`config`] / [`config_file`] - the Configuration Store and its
//!   INI-like file grammar
//! - [`version`] - plugin version numbers and `requires` constraint
//!   arithmetic
//! - [`manifest`] - the stable C-ABI plugin descriptor and its owned form
//! - [`loader`] - dynamic (`libloading`) and static plugin loading
//! - [`resolver`] - `requires`/`conflicts` checking and topological
//!   ordering
//! - [`engine`] - the Load → Resolve → Initialize → Start → Wait → Stop →
//!   Deinit → Release lifecycle
//! - [`tracing_boot`] - the bootstrap subscriber installed before any
//!   plugin loads
//! - [`error`] - the error taxonomy shared across all of the above

/// The Configuration Store.
pub mod config;

/// The configuration file grammar.
pub mod config_file;

/// The error taxonomy.
pub mod error;

/// The Harness Lifecycle Engine.
pub mod engine;

/// Plugin loading, static and dynamic.
pub mod loader;

/// The plugin descriptor and its owned form.
pub mod manifest;

/// Dependency resolution.
pub mod resolver;

/// The process-wide bootstrap tracing subscriber, reconfigured in place by
/// the logger plugin.
pub mod tracing_boot;

/// Plugin version numbers and constraints.
pub mod version;

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::config::{Config, ConfigSection, SectionId};
    pub use crate::engine::{Engine, HarnessInfo, Phase};
    pub use crate::error::HarnessError;
    pub use crate::loader::{LoadedPlugin, Loader};
    pub use crate::manifest::{PluginDescriptor, PluginManifest};
    pub use crate::version::{Constraint, Requirement, Version};
}
