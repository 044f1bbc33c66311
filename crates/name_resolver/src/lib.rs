//! Hostname lookup and TCP service name/port mapping with a small
//! cached-answer table.
//!
//! - [`resolver`] - [`NameResolver`](resolver::NameResolver), the cached
//!   hostname-lookup layer
//! - [`service`] - well-known TCP service name ↔ port mapping
//! - [`error`] - [`NameResolverError`](error::NameResolverError)

/// Errors raised while resolving hostnames or service names.
pub mod error;

/// Cached hostname lookup.
pub mod resolver;

/// TCP service name ↔ port mapping.
pub mod service;

pub use error::NameResolverError;
pub use resolver::NameResolver;
pub use service::{tcp_service_name, tcp_service_port};
