//! The Configuration Store: ordered, section/key-keyed, typed configuration.
//!
//! Mirrors `mysqlrouter`'s `ConfigSection`/`Config` split: a [`ConfigSection`]
//! is a flat, insertion-ordered string map; [`Config`] owns an ordered list of
//! sections plus the fixed directory set every plugin reads from.

use hashbrown::HashMap;

use crate::error::ConfigError;

/// `(name, key)` pair identifying one section. `key` is `""` for the
/// default/unkeyed section of `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionId {
    /// Section name, e.g. `"routing"`.
    pub name: String,
    /// Disambiguating key, e.g. `"east"`, or `""` for the default section.
    pub key: String,
}

impl SectionId {
    /// Builds a section id, lowercasing `name` to match the case-insensitive
    /// `[name]` / `[name:key]` header grammar.
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            key: key.into(),
        }
    }

    fn default_of(&self) -> SectionId {
        SectionId::new(self.name.clone(), "")
    }
}

/// One `[name]` or `[name:key]` block: an insertion-ordered string map.
#[derive(Debug, Clone, Default)]
pub struct ConfigSection {
    id: SectionId,
    options: Vec<(String, String)>,
}

impl ConfigSection {
    fn new(id: SectionId) -> Self {
        Self {
            id,
            options: Vec::new(),
        }
    }

    /// This section's identifying `(name, key)` pair.
    #[must_use]
    pub fn id(&self) -> &SectionId {
        &self.id
    }

    /// Assigns `option = value`, overwriting a prior value for the same
    /// option if one was already set.
    pub fn set(&mut self, option: impl Into<String>, value: impl Into<String>) {
        let option = option.into();
        let value = value.into();
        if let Some(slot) = self.options.iter_mut().find(|(k, _)| *k == option) {
            slot.1 = value;
        } else {
            self.options.push((option, value));
        }
    }

    /// Whether `option` was set directly on this section (not counting
    /// default-section fallback).
    #[must_use]
    pub fn has_own(&self, option: &str) -> bool {
        self.options.iter().any(|(k, _)| k == option)
    }

    fn get_own(&self, option: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == option)
            .map(|(_, v)| v.as_str())
    }
}

/// The insertion-ordered collection of sections plus the process-wide
/// directory set.
#[derive(Debug, Clone)]
pub struct Config {
    sections: Vec<ConfigSection>,
    index: HashMap<SectionId, usize>,
    /// Directory holding plugin shared objects.
    pub extension_dir: String,
    /// Directory for log output.
    pub log_dir: String,
    /// Directory for runtime state (pid files, sockets).
    pub run_dir: String,
    /// Directory the configuration file itself was loaded from.
    pub config_dir: String,
    /// Program name used in defaults and log lines.
    pub program_name: String,
}

impl Default for Config {
    fn default() -> Self {
        let app = "harness";
        Self {
            sections: Vec::new(),
            index: HashMap::new(),
            extension_dir: format!("lib/{app}"),
            log_dir: format!("log/{app}"),
            run_dir: format!("run/{app}"),
            config_dir: format!("etc/{app}"),
            program_name: app.to_owned(),
        }
    }
}

impl Config {
    /// Builds an empty store with the Unix-like default directory layout
    /// (§6), using `program_name` in place of `"harness"`.
    #[must_use]
    pub fn new(program_name: impl Into<String>) -> Self {
        let program_name = program_name.into();
        Self {
            extension_dir: format!("lib/{program_name}"),
            log_dir: format!("log/{program_name}"),
            run_dir: format!("run/{program_name}"),
            config_dir: format!("etc/{program_name}"),
            program_name,
            ..Self::blank()
        }
    }

    fn blank() -> Self {
        Self {
            sections: Vec::new(),
            index: HashMap::new(),
            extension_dir: String::new(),
            log_dir: String::new(),
            run_dir: String::new(),
            config_dir: String::new(),
            program_name: String::new(),
        }
    }

    /// Appends a new section, failing if `(name, key)` is already present.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<&mut ConfigSection, ConfigError> {
        let id = SectionId::new(name, key);
        if self.index.contains_key(&id) {
            return Err(ConfigError::DuplicateSection(id.name, id.key));
        }
        let idx = self.sections.len();
        self.sections.push(ConfigSection::new(id.clone()));
        self.index.insert(id, idx);
        Ok(&mut self.sections[idx])
    }

    /// All sections named `name`, in insertion order.
    pub fn get(&self, name: &str) -> impl Iterator<Item = &ConfigSection> {
        let name = name.to_ascii_lowercase();
        self.sections.iter().filter(move |s| s.id.name == name)
    }

    /// Looks up one section by its full `(name, key)` pair.
    #[must_use]
    pub fn section(&self, name: &str, key: &str) -> Option<&ConfigSection> {
        let id = SectionId::new(name, key);
        self.index.get(&id).map(|&i| &self.sections[i])
    }

    /// Sets `option = value` on an already-added section, identified by id.
    ///
    /// Used by the configuration-file parser, which creates the section at
    /// its header line and then fills in options line by line. Panics if
    /// `id` was never added; callers always add the section first.
    pub(crate) fn set_in_section(&mut self, id: &SectionId, option: &str, value: &str) {
        let idx = *self
            .index
            .get(id)
            .expect("set_in_section called on a section that was never added");
        self.sections[idx].set(option, value);
    }

    /// Resolves `option` on `section`, falling back to the default-keyed
    /// section of the same name when absent.
    pub fn get_value(&self, section: &SectionId, option: &str) -> Result<&str, ConfigError> {
        if let Some(idx) = self.index.get(section) {
            if let Some(v) = self.sections[*idx].get_own(option) {
                return Ok(v);
            }
        }
        if !section.key.is_empty() {
            if let Some(idx) = self.index.get(&section.default_of()) {
                if let Some(v) = self.sections[*idx].get_own(option) {
                    return Ok(v);
                }
            }
        }
        Err(ConfigError::BadOption {
            section: section.name.clone(),
            option: option.to_owned(),
        })
    }

    /// Whether `option` resolves on `section` (own value or default fallback).
    #[must_use]
    pub fn has(&self, section: &SectionId, option: &str) -> bool {
        self.get_value(section, option).is_ok()
    }

    /// Overlays `HARNESS_<SECTION>_<OPTION>` environment variables onto
    /// already-parsed sections, per the layered-precedence rule (§2B).
    /// Variables naming a section that does not exist yet are ignored:
    /// env can only override a declared option, not invent new sections.
    pub fn apply_env_overlay<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let Some(rest) = key.strip_prefix("HARNESS_") else {
                continue;
            };
            let Some((section_part, option_part)) = rest.split_once('_') else {
                continue;
            };
            let section_name = section_part.to_ascii_lowercase();
            let option_name = option_part.to_ascii_lowercase();

            if let Some(&idx) = self.index.get(&SectionId::new(section_name, "")) {
                self.sections[idx].set(option_name, value.as_ref());
            }
        }
    }
}

/// Typed-access helpers every plugin uses instead of raw string lookups.
pub mod typed {
    use super::*;

    /// Returns `section.option`, or `default` when absent; fails with
    /// [`ConfigError::MissingRequired`] when `required` is set and the
    /// resolved value is missing or empty.
    pub fn get_option_string<'a>(
        config: &'a Config,
        section: &SectionId,
        option: &str,
        default: Option<&'a str>,
        required: bool,
    ) -> Result<String, ConfigError> {
        let value = match config.get_value(section, option) {
            Ok(v) => Some(v),
            Err(_) => default,
        };
        match value {
            Some(v) if !v.is_empty() => Ok(v.to_owned()),
            _ if required => Err(ConfigError::MissingRequired {
                section: section.name.clone(),
                option: option.to_owned(),
            }),
            Some(v) => Ok(v.to_owned()),
            None => Ok(String::new()),
        }
    }

    /// Parses a decimal TCP port. `""` maps to `0`; anything non-numeric,
    /// containing whitespace, or `> 65535` is rejected.
    pub fn get_tcp_port(value: &str) -> Result<u16, ConfigError> {
        if value.is_empty() {
            return Ok(0);
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidArgument {
                option: "port".to_owned(),
                reason: format!("'{value}' is not a decimal port number"),
            });
        }
        value.parse::<u32>().ok().and_then(|p| u16::try_from(p).ok()).ok_or_else(|| {
            ConfigError::InvalidArgument {
                option: "port".to_owned(),
                reason: format!("'{value}' is out of range 0..=65535"),
            }
        })
    }

    /// Splits a `host[:port]` literal. Accepts a bracketed IPv6 literal
    /// (`[::1]:3306`), a bare IPv6 literal with no port (`::1`), and a plain
    /// hostname with or without a port. Fails when `require_port` is set and
    /// no port was present.
    pub fn split_addr_port(
        value: &str,
        require_port: bool,
    ) -> Result<(String, u16), ConfigError> {
        let value = value.trim();

        if let Some(rest) = value.strip_prefix('[') {
            let Some(end) = rest.find(']') else {
                return Err(ConfigError::InvalidArgument {
                    option: "address".to_owned(),
                    reason: format!("unterminated '[' in '{value}'"),
                });
            };
            let host = &rest[..end];
            let after = &rest[end + 1..];
            return match after.strip_prefix(':') {
                Some(port_str) => Ok((host.to_owned(), get_tcp_port(port_str)?)),
                None if after.is_empty() => {
                    if require_port {
                        Err(ConfigError::InvalidArgument {
                            option: "address".to_owned(),
                            reason: format!("'{value}' has no port"),
                        })
                    } else {
                        Ok((host.to_owned(), 0))
                    }
                }
                None => Err(ConfigError::InvalidArgument {
                    option: "address".to_owned(),
                    reason: format!("trailing garbage after ']' in '{value}'"),
                }),
            };
        }

        // A bare IPv6 literal has more than one colon; a `host:port` literal
        // has exactly one. Distinguish by counting.
        let colon_count = value.bytes().filter(|&b| b == b':').count();
        if colon_count >= 2 {
            if require_port {
                return Err(ConfigError::InvalidArgument {
                    option: "address".to_owned(),
                    reason: format!("bare IPv6 literal '{value}' has no port; use '[addr]:port'"),
                });
            }
            return Ok((value.to_owned(), 0));
        }

        match value.split_once(':') {
            Some((host, port_str)) => Ok((host.to_owned(), get_tcp_port(port_str)?)),
            None if require_port => Err(ConfigError::InvalidArgument {
                option: "address".to_owned(),
                reason: format!("'{value}' has no port"),
            }),
            None => Ok((value.to_owned(), 0)),
        }
    }

    /// Resolves `section.option` as a `host:port` pair via
    /// [`split_addr_port`], substituting `default_port` when no port was
    /// given.
    pub fn get_option_tcp_address(
        config: &Config,
        section: &SectionId,
        option: &str,
        default_port: u16,
        require_port: bool,
    ) -> Result<(String, u16), ConfigError> {
        let raw = config.get_value(section, option)?;
        let (host, port) = split_addr_port(raw, require_port)?;
        Ok((host, if port == 0 { default_port } else { port }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typed::*;

    #[test]
    fn default_section_fallback() {
        let mut cfg = Config::new("test");
        cfg.add_section("routing", "").unwrap().set("mode", "rw");
        cfg.add_section("routing", "east").unwrap();

        let east = SectionId::new("routing", "east");
        assert_eq!(cfg.get_value(&east, "mode").unwrap(), "rw");
    }

    #[test]
    fn duplicate_section_rejected() {
        let mut cfg = Config::new("test");
        cfg.add_section("routing", "east").unwrap();
        assert!(cfg.add_section("routing", "east").is_err());
    }

    #[test]
    fn bad_option_when_truly_absent() {
        let mut cfg = Config::new("test");
        cfg.add_section("routing", "").unwrap();
        let id = SectionId::new("routing", "");
        assert!(cfg.get_value(&id, "nope").is_err());
    }

    #[test]
    fn tcp_port_boundaries() {
        assert_eq!(get_tcp_port("").unwrap(), 0);
        assert_eq!(get_tcp_port("65535").unwrap(), 65535);
        assert!(get_tcp_port("65536").is_err());
        assert!(get_tcp_port("3306 ").is_err());
        assert!(get_tcp_port(":80").is_err());
    }

    #[test]
    fn split_addr_port_forms() {
        assert_eq!(
            split_addr_port("db.example.com:3306", false).unwrap(),
            ("db.example.com".to_owned(), 3306)
        );
        assert_eq!(
            split_addr_port("[::1]:3306", false).unwrap(),
            ("::1".to_owned(), 3306)
        );
        assert_eq!(
            split_addr_port("::1", false).unwrap(),
            ("::1".to_owned(), 0)
        );
        assert_eq!(
            split_addr_port("db.example.com", false).unwrap(),
            ("db.example.com".to_owned(), 0)
        );
    }

    #[test]
    fn split_addr_port_requires_port_when_asked() {
        assert!(split_addr_port("db.example.com", true).is_err());
        assert!(split_addr_port("::1", true).is_err());
    }

    #[test]
    fn env_overlay_overrides_existing_option_only() {
        let mut cfg = Config::new("test");
        cfg.add_section("routing", "").unwrap().set("mode", "rw");

        cfg.apply_env_overlay([("HARNESS_ROUTING_MODE", "ro"), ("HARNESS_MISSING_X", "y")]);

        let id = SectionId::new("routing", "");
        assert_eq!(cfg.get_value(&id, "mode").unwrap(), "ro");
    }

    #[test]
    fn get_option_string_required_missing_fails() {
        let cfg = Config::new("test");
        let id = SectionId::new("routing", "");
        assert!(get_option_string(&cfg, &id, "user", None, true).is_err());
        assert_eq!(
            get_option_string(&cfg, &id, "user", Some("admin"), false).unwrap(),
            "admin"
        );
    }
}
