//! The first-available failover selector: tries destinations starting at
//! the last known-good position, and remembers where it got in so the
//! next call picks up there instead of always starting from the front.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::RoutingError;

/// One routable backend: a host and port pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Destination {
    /// Builds a destination from its host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Attempts a single connection to a [`Destination`]. The production
/// implementation opens and immediately drops a real TCP connection;
/// tests substitute a scripted connector so failover logic can be
/// verified without a network.
pub trait Connector: Send + Sync {
    /// Attempts to connect to `destination`, bounded by `timeout`.
    fn connect(&self, destination: &Destination, timeout: Duration) -> Result<(), RoutingError>;
}

/// Connects over a real TCP socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, destination: &Destination, timeout: Duration) -> Result<(), RoutingError> {
        let addr_str = destination.to_string();
        let mut addrs = addr_str.to_socket_addrs().map_err(|e| RoutingError::ConnectFailed {
            destination: addr_str.clone(),
            reason: e.to_string(),
        })?;

        let sock_addr = addrs.next().ok_or_else(|| RoutingError::ConnectFailed {
            destination: addr_str.clone(),
            reason: "hostname resolved to no addresses".to_owned(),
        })?;

        TcpStream::connect_timeout(&sock_addr, timeout)
            .map(|_| ())
            .map_err(|e| RoutingError::ConnectFailed {
                destination: addr_str,
                reason: e.to_string(),
            })
    }
}

/// Selects a destination by trying each one, in order, starting from the
/// last position that succeeded.
///
/// With a single destination, the position is never touched — matching
/// the upstream optimization of skipping the lock entirely when there is
/// nothing to fail over to.
pub struct FirstAvailableSelector<C: Connector = TcpConnector> {
    destinations: Vec<Destination>,
    current_pos: Mutex<usize>,
    connector: C,
}

impl FirstAvailableSelector<TcpConnector> {
    /// Builds a selector over real TCP destinations.
    #[must_use]
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self::with_connector(destinations, TcpConnector)
    }
}

impl<C: Connector> FirstAvailableSelector<C> {
    /// Builds a selector using a custom [`Connector`] (tests inject a
    /// scripted one in place of [`TcpConnector`]).
    #[must_use]
    pub fn with_connector(destinations: Vec<Destination>, connector: C) -> Self {
        Self {
            destinations,
            current_pos: Mutex::new(0),
            connector,
        }
    }

    /// The index [`FirstAvailableSelector::select`] will start trying from
    /// next.
    #[must_use]
    pub fn current_pos(&self) -> usize {
        *self.current_pos.lock()
    }

    /// Tries each destination starting at the current position, wrapping
    /// around is never performed mid-scan — once exhausted the position
    /// resets to `0` for the *next* call. Returns the index of the
    /// destination that accepted a connection.
    pub fn select(&self, connect_timeout: Duration) -> Result<usize, RoutingError> {
        if self.destinations.is_empty() {
            return Err(RoutingError::NoDestinations);
        }

        if self.destinations.len() == 1 {
            self.connector.connect(&self.destinations[0], connect_timeout)?;
            return Ok(0);
        }

        let start = *self.current_pos.lock();
        for i in start..self.destinations.len() {
            if self.connector.connect(&self.destinations[i], connect_timeout).is_ok() {
                *self.current_pos.lock() = i;
                tracing::debug!(target: "routing", index = i, destination = %self.destinations[i], "selected destination");
                return Ok(i);
            }
        }

        *self.current_pos.lock() = 0;
        tracing::warn!(target: "routing", count = self.destinations.len(), "all destinations unavailable");
        Err(RoutingError::AllUnavailable(self.destinations.len()))
    }

    /// The configured destination list, in order.
    #[must_use]
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedConnector {
        fails_until_index: usize,
        attempts: Arc<AtomicUsize>,
    }

    impl Connector for ScriptedConnector {
        fn connect(&self, destination: &Destination, _timeout: Duration) -> Result<(), RoutingError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let idx: usize = destination.port as usize;
            if idx >= self.fails_until_index {
                Ok(())
            } else {
                Err(RoutingError::ConnectFailed {
                    destination: destination.to_string(),
                    reason: "refused".to_owned(),
                })
            }
        }
    }

    fn destinations(n: u16) -> Vec<Destination> {
        (0..n).map(|i| Destination::new("127.0.0.1", i)).collect()
    }

    #[test]
    fn fails_over_to_the_first_destination_that_accepts() {
        let connector = ScriptedConnector {
            fails_until_index: 2,
            attempts: Arc::new(AtomicUsize::new(0)),
        };
        let selector = FirstAvailableSelector::with_connector(destinations(3), connector);

        let picked = selector.select(Duration::from_millis(50)).unwrap();
        assert_eq!(picked, 2);
        assert_eq!(selector.current_pos(), 2);
    }

    #[test]
    fn subsequent_selects_start_from_the_last_good_position() {
        let connector = ScriptedConnector {
            fails_until_index: 1,
            attempts: Arc::new(AtomicUsize::new(0)),
        };
        let selector = FirstAvailableSelector::with_connector(destinations(3), connector);

        selector.select(Duration::from_millis(50)).unwrap();
        assert_eq!(selector.current_pos(), 1);

        // A second call starts scanning at index 1, not 0.
        let picked = selector.select(Duration::from_millis(50)).unwrap();
        assert_eq!(picked, 1);
    }

    #[test]
    fn exhausting_all_destinations_resets_to_the_front() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = ScriptedConnector {
            fails_until_index: 99,
            attempts: Arc::clone(&attempts),
        };
        let selector = FirstAvailableSelector::with_connector(destinations(3), connector);

        let err = selector.select(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, RoutingError::AllUnavailable(3)));
        assert_eq!(selector.current_pos(), 0);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn single_destination_skips_the_position_lock() {
        let connector = ScriptedConnector {
            fails_until_index: 0,
            attempts: Arc::new(AtomicUsize::new(0)),
        };
        let selector = FirstAvailableSelector::with_connector(destinations(1), connector);
        assert_eq!(selector.select(Duration::from_millis(50)).unwrap(), 0);
        assert_eq!(selector.current_pos(), 0);
    }

    #[test]
    fn empty_destinations_is_rejected() {
        let selector = FirstAvailableSelector::new(Vec::new());
        assert!(matches!(
            selector.select(Duration::from_millis(10)),
            Err(RoutingError::NoDestinations)
        ));
    }
}
