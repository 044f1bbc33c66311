//! TCP service name ↔ port mapping, for the handful of well-known service
//! names the harness's own configuration options ever name (e.g. a
//! `bind_address` given as `mysql` instead of `3306`).

use crate::error::NameResolverError;

const SERVICES: &[(&str, u16)] = &[
    ("mysql", 3306),
    ("mysqlx", 33060),
    ("http", 80),
    ("https", 443),
    ("ssh", 22),
];

/// Resolves a well-known TCP service name to its port. Fails when `name`
/// has no known mapping.
pub fn tcp_service_name(name: &str) -> Result<u16, NameResolverError> {
    SERVICES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, port)| *port)
        .ok_or_else(|| NameResolverError::UnknownServiceName(name.to_owned()))
}

/// Resolves a port to its well-known TCP service name, falling back to the
/// port's decimal representation when no service is registered for it. This
/// never fails: every `u16` has at least a decimal string to report.
#[must_use]
pub fn tcp_service_port(port: u16) -> String {
    SERVICES
        .iter()
        .find(|(_, p)| *p == port)
        .map(|(name, _)| (*name).to_owned())
        .unwrap_or_else(|| port.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_service_resolves_both_ways() {
        assert_eq!(tcp_service_name("mysql").unwrap(), 3306);
        assert_eq!(tcp_service_port(3306), "mysql");
    }

    #[test]
    fn round_trip_holds_for_every_known_service() {
        for &(name, _) in SERVICES {
            let port = tcp_service_name(name).unwrap();
            assert_eq!(tcp_service_name(&tcp_service_port(port)).unwrap(), port);
        }
    }

    #[test]
    fn unknown_name_is_reported_and_unknown_port_falls_back_to_decimal() {
        assert!(tcp_service_name("not-a-service").is_err());
        assert_eq!(tcp_service_port(1), "1");
    }
}
