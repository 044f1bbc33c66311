//! Errors raised while resolving hostnames or service names.

/// Errors the Name Resolver can raise.
#[derive(Debug, thiserror::Error)]
pub enum NameResolverError {
    /// The system resolver could not resolve `host`.
    #[error("failed to resolve '{host}': {reason}")]
    LookupFailed {
        /// Hostname that failed to resolve.
        host: String,
        /// The OS resolver's own error message.
        reason: String,
    },

    /// A TCP service name has no known port mapping.
    #[error("unknown TCP service name '{0}'")]
    UnknownServiceName(String),
}
