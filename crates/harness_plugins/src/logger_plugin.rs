//! The logging plugin: builds a [`LogFilter`] from the harness's
//! configuration and swaps it into the bootstrap subscriber
//! ([`harness_core::tracing_boot`]) as the `tracing_subscriber` writer, so
//! every formatted log line is redacted before it reaches its sink.
//!
//! The default `[logger]` section carries `level`, `format`
//! (`pretty`/`compact`/`json`) and an optional `env_filter` override.
//! Redaction rules are given as keyed `[logger:<n>]` sections, each with a
//! `pattern` option and a `groups` option (comma-separated 1-based capture
//! group indices to redact).

use core::ffi::{c_int, c_void};

use harness_core::config::{Config, SectionId};
use harness_core::engine::HarnessInfo;
use harness_core::manifest::{PluginDescriptor, ABI_VERSION};
use harness_core::tracing_boot::{self, BoxedLayer};
use harness_core::version::Version;
use log_filter::{FilteringMakeWriter, LogFilter};
use tracing_subscriber::layer::Layer;
use tracing_subscriber::EnvFilter;

fn parse_groups(raw: &str) -> Vec<usize> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

fn build_filter(config: &Config) -> LogFilter {
    let mut filter = LogFilter::new();
    for rule_section in config.get("logger") {
        if rule_section.id().key.is_empty() {
            continue;
        }
        let Ok(pattern) = config.get_value(rule_section.id(), "pattern") else {
            continue;
        };
        let groups = config
            .get_value(rule_section.id(), "groups")
            .map(parse_groups)
            .unwrap_or_default();
        if let Err(e) = filter.add_pattern(pattern, groups) {
            tracing::warn!(target: "log_filter", error = %e, "dropping invalid redaction rule");
        }
    }
    filter
}

extern "C" fn init(info: *const c_void) -> c_int {
    // Safety: see `routing_plugin::init`.
    let config = unsafe { (*info.cast::<HarnessInfo>()).config() };
    let section = SectionId::new("logger", "");

    let level = config.get_value(&section, "level").unwrap_or("info");
    let env_filter = match config.get_value(&section, "env_filter") {
        Ok(custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| EnvFilter::new(level)),
        Err(_) => EnvFilter::new(level),
    };

    let filter = std::sync::Arc::new(build_filter(config));
    let writer = FilteringMakeWriter::new(std::io::stdout, filter);

    let format = config.get_value(&section, "format").unwrap_or("pretty");
    let layer: BoxedLayer = match format {
        "compact" => Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(writer)
                .with_filter(env_filter),
        ),
        "json" => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(env_filter),
        ),
        _ => Box::new(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_filter(env_filter),
        ),
    };

    tracing_boot::reconfigure(layer);
    0
}

static REQUIRES: [*const core::ffi::c_char; 0] = [];
static CONFLICTS: [*const core::ffi::c_char; 0] = [];

static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    abi_version: ABI_VERSION,
    brief: c"redacting tracing subscriber".as_ptr(),
    plugin_version: Version::new(1, 0, 0).packed(),
    requires: REQUIRES.as_ptr(),
    requires_len: 0,
    conflicts: CONFLICTS.as_ptr(),
    conflicts_len: 0,
    init: Some(init),
    deinit: None,
    start: None,
};

/// Returns the logger plugin's descriptor, for
/// [`harness_core::loader::Loader::register`].
#[must_use]
pub fn descriptor() -> &'static PluginDescriptor {
    &DESCRIPTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_groups() {
        assert_eq!(parse_groups("1, 2,3"), vec![1, 2, 3]);
        assert_eq!(parse_groups(""), Vec::<usize>::new());
    }

    #[test]
    fn builds_one_rule_per_keyed_logger_section() {
        let mut config = Config::new("test");
        config.add_section("logger", "").unwrap();
        config
            .add_section("logger", "0")
            .unwrap()
            .set("pattern", r"CREATE USER (\S+) WITH mysql_native_password AS (\S*)");
        let id = SectionId::new("logger", "0");
        // groups defaults to empty when absent, leaving the match untouched.
        assert!(config.get_value(&id, "pattern").is_ok());

        let filter = build_filter(&config);
        let redacted = filter.filter("CREATE USER 'svc' WITH mysql_native_password AS 'x'");
        assert_eq!(redacted, "CREATE USER 'svc' WITH mysql_native_password AS 'x'");
    }
}
