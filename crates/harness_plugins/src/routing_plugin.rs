//! The routing plugin: wires a [`FirstAvailableSelector`] to the
//! `[routing]` configuration section.
//!
//! Reads a comma-separated `destinations = host:port, host:port, ...` list
//! and an optional `connect_timeout_ms` (default 1000) at `init`, then
//! keeps the built selector in a process-wide slot other hooks (and, in a
//! full build, the connection-accept loop) read from.

use core::ffi::{c_int, c_void};
use std::sync::OnceLock;
use std::time::Duration;

use harness_core::config::SectionId;
use harness_core::engine::HarnessInfo;
use harness_core::manifest::{PluginDescriptor, ABI_VERSION};
use harness_core::version::Version;
use routing_selector::{Destination, FirstAvailableSelector};

static SELECTOR: OnceLock<FirstAvailableSelector> = OnceLock::new();
static CONNECT_TIMEOUT: OnceLock<Duration> = OnceLock::new();

fn section() -> SectionId {
    SectionId::new("routing", "")
}

fn parse_destinations(raw: &str) -> Vec<Destination> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|entry| {
            let (host, port) = entry.rsplit_once(':')?;
            port.parse::<u16>().ok().map(|p| Destination::new(host, p))
        })
        .collect()
}

extern "C" fn init(info: *const c_void) -> c_int {
    // Safety: the engine only invokes `init` hooks with a `HarnessInfo` it
    // itself built and keeps alive for the duration of this call.
    let config = unsafe { (*info.cast::<HarnessInfo>()).config() };
    let section = section();

    let raw_destinations = config.get_value(&section, "destinations").unwrap_or("");
    let destinations = parse_destinations(raw_destinations);
    if destinations.is_empty() {
        tracing::error!(target: "routing", "no destinations configured");
        return 1;
    }

    let timeout_ms = config
        .get_value(&section, "connect_timeout_ms")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1000);

    let _ = CONNECT_TIMEOUT.set(Duration::from_millis(timeout_ms));
    if SELECTOR.set(FirstAvailableSelector::new(destinations)).is_err() {
        tracing::error!(target: "routing", "routing plugin initialized twice");
        return 1;
    }

    tracing::info!(target: "routing", destinations = SELECTOR.get().unwrap().destinations().len(), "routing plugin initialized");
    0
}

extern "C" fn start(info: *const c_void) -> c_int {
    // Safety: see `init`.
    let info = unsafe { &*info.cast::<HarnessInfo>() };
    // Accepting and proxying client connections is the wire-protocol
    // codec's job, which lives outside this harness; this loop stands in
    // for that accept loop and exits as soon as shutdown is requested.
    loop {
        // Safety: see `init`.
        if unsafe { info.stop_requested() } {
            return 0;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

static REQUIRES: [*const core::ffi::c_char; 0] = [];
static CONFLICTS: [*const core::ffi::c_char; 0] = [];

static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    abi_version: ABI_VERSION,
    brief: c"first-available failover routing".as_ptr(),
    plugin_version: Version::new(1, 0, 0).packed(),
    requires: REQUIRES.as_ptr(),
    requires_len: 0,
    conflicts: CONFLICTS.as_ptr(),
    conflicts_len: 0,
    init: Some(init),
    deinit: None,
    start: Some(start),
};

/// Returns the routing plugin's descriptor, for [`harness_core::loader::Loader::register`].
#[must_use]
pub fn descriptor() -> &'static PluginDescriptor {
    &DESCRIPTOR
}

/// The selector built at `init`, if the plugin has been initialized.
#[must_use]
pub fn selector() -> Option<&'static FirstAvailableSelector> {
    SELECTOR.get()
}

/// The connect timeout read at `init`, defaulting to one second.
#[must_use]
pub fn connect_timeout() -> Duration {
    CONNECT_TIMEOUT.get().copied().unwrap_or(Duration::from_millis(1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_destinations() {
        let parsed = parse_destinations(" db1:3306 , db2:3306,db3:3307 ");
        assert_eq!(
            parsed,
            vec![
                Destination::new("db1", 3306),
                Destination::new("db2", 3306),
                Destination::new("db3", 3307),
            ]
        );
    }

    #[test]
    fn blank_and_malformed_entries_are_dropped() {
        let parsed = parse_destinations("db1:3306, , not-a-port, db2");
        assert_eq!(parsed, vec![Destination::new("db1", 3306)]);
    }
}
