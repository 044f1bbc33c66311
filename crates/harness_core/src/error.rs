//! Error taxonomy for the harness.
//!
//! Each domain gets its own `thiserror` enum rather than one flat type, so
//! a caller that only cares about, say, resolution failures can match on
//! [`ResolveError`] without naming every other domain.

use crate::version::{Constraint, Version};

/// Errors raised while reading or decoding configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `(name, key)` already has a section.
    #[error("section [{0}:{1}] is already defined")]
    DuplicateSection(String, String),

    /// An option was never declared, in the section or its default fallback.
    #[error("no option '{option}' in section [{section}]")]
    BadOption {
        /// Section the option was looked up in.
        section: String,
        /// Option name.
        option: String,
    },

    /// A required option was missing or empty.
    #[error("option '{option}' in section [{section}] is required")]
    MissingRequired {
        /// Section the option was looked up in.
        section: String,
        /// Option name.
        option: String,
    },

    /// A typed accessor rejected the string value it was given.
    #[error("invalid value for '{option}': {reason}")]
    InvalidArgument {
        /// Option name.
        option: String,
        /// Human-readable reason, not a stack trace.
        reason: String,
    },

    /// A version or constraint literal failed to parse.
    #[error("malformed version or constraint literal: '{0}'")]
    BadConstraintSyntax(String),
}

/// Errors raised while loading a plugin's shared object.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No file at `<extension_dir>/<name>.<ext>`.
    #[error("plugin library not found: {0}")]
    LibraryNotFound(String),

    /// The library opened, but the expected export is missing.
    #[error("symbol '{symbol}' not found in {path}")]
    SymbolNotFound {
        /// Path to the library that was opened.
        path: String,
        /// Expected exported symbol name.
        symbol: String,
    },

    /// The descriptor's fields could not be converted to owned, safe data.
    #[error("malformed plugin descriptor for '{0}': {1}")]
    BadDescriptor(String, String),

    /// The descriptor's ABI major version exceeds the harness's.
    #[error(
        "plugin '{plugin}' requires ABI major {required_major}, harness supports up to {supported_major}"
    )]
    IncompatibleAbi {
        /// Plugin name.
        plugin: String,
        /// ABI major byte the plugin was built against.
        required_major: u8,
        /// ABI major byte the harness supports.
        supported_major: u8,
    },
}

/// Errors raised while resolving dependencies and conflicts.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A `requires` entry named a plugin that was not loaded.
    #[error("plugin '{plugin}' requires '{dependency}', which was not loaded")]
    MissingDependency {
        /// The plugin with the unsatisfied requirement.
        plugin: String,
        /// The missing dependency's name.
        dependency: String,
    },

    /// A `requires` entry's constraint was not satisfied by the loaded version.
    #[error("plugin '{plugin}' requires {required}, found {actual}")]
    VersionUnsatisfied {
        /// The dependency plugin whose version was checked.
        plugin: String,
        /// The constraint it failed to satisfy.
        required: Constraint,
        /// The version that was actually loaded.
        actual: Version,
    },

    /// Two requested plugins declare each other as conflicting.
    #[error("plugin '{0}' conflicts with requested plugin '{1}'")]
    ConflictDeclared(String, String),

    /// The `requires` graph contains a cycle.
    #[error("circular dependency among plugins: {0:?}")]
    CycleDetected(Vec<String>),
}

/// Errors surfaced by the lifecycle engine itself.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A plugin's `init` hook returned a non-zero result.
    #[error("plugin '{plugin}' failed to initialize (code {code})")]
    InitFailed {
        /// Plugin whose `init` failed.
        plugin: String,
        /// The code the plugin's hook returned.
        code: i32,
    },

    /// A plugin's `deinit` hook returned a non-zero result.
    ///
    /// Recorded, not propagated: deinit continues for the remaining plugins.
    #[error("plugin '{plugin}' failed to deinitialize (code {code})")]
    DeinitFailed {
        /// Plugin whose `deinit` failed.
        plugin: String,
        /// The code the plugin's hook returned.
        code: i32,
    },

    /// A plugin's worker thread panicked.
    #[error("plugin '{0}' worker panicked")]
    WorkerPanicked(String),

    /// A plugin's worker thread did not exit within the stop grace period.
    /// The engine abandons it and proceeds to `deinit` regardless.
    #[error("plugin '{0}' worker did not stop within the grace period")]
    WorkerStuck(String),
}

/// Top-level error produced by the harness, wrapping every domain.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`LoadError`].
    #[error(transparent)]
    Load(#[from] LoadError),
    /// See [`ResolveError`].
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// See [`LifecycleError`].
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
