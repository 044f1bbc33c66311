//! Hostname lookup, backed by a small cache of recent answers so a
//! frequently-dialed destination doesn't hit the system resolver on every
//! connection attempt.

use std::net::{IpAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::NameResolverError;

struct CachedAnswer {
    addrs: Vec<IpAddr>,
    resolved_at: Instant,
}

/// Caches hostname → address answers for `ttl`, falling back to the
/// system resolver (`getaddrinfo` via [`ToSocketAddrs`]) on a cache miss
/// or expiry.
pub struct NameResolver {
    cache: DashMap<String, CachedAnswer>,
    ttl: Duration,
}

impl NameResolver {
    /// Builds a resolver that re-checks the system resolver after `ttl`
    /// has elapsed since a hostname's last successful lookup.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Resolves `host` to its addresses, using the cached answer if it is
    /// still within `ttl`.
    pub fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, NameResolverError> {
        if let Some(cached) = self.cache.get(host) {
            if cached.resolved_at.elapsed() < self.ttl {
                return Ok(cached.addrs.clone());
            }
        }

        let addrs = lookup_host(host)?;
        self.cache.insert(
            host.to_owned(),
            CachedAnswer {
                addrs: addrs.clone(),
                resolved_at: Instant::now(),
            },
        );
        Ok(addrs)
    }

    /// Drops every cached answer, forcing the next `resolve()` for each
    /// host back to the system resolver.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

fn lookup_host(host: &str) -> Result<Vec<IpAddr>, NameResolverError> {
    (host, 0u16)
        .to_socket_addrs()
        .map(|iter| iter.map(|addr| addr.ip()).collect())
        .map_err(|e| NameResolverError::LookupFailed {
            host: host.to_owned(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn resolves_a_literal_ip_without_touching_dns() {
        let resolver = NameResolver::new(Duration::from_secs(60));
        let addrs = resolver.resolve("127.0.0.1").unwrap();
        assert_eq!(addrs, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    }

    #[test]
    fn second_lookup_within_ttl_is_served_from_cache() {
        let resolver = NameResolver::new(Duration::from_secs(60));
        let first = resolver.resolve("127.0.0.1").unwrap();
        let second = resolver.resolve("127.0.0.1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn clear_empties_the_cache() {
        let resolver = NameResolver::new(Duration::from_secs(60));
        resolver.resolve("127.0.0.1").unwrap();
        resolver.clear();
        assert!(resolver.cache.is_empty());
    }
}
