//! The case-insensitive INI-like configuration file grammar (§6).
//!
//! ```ini
//! [DEFAULT]
//! logging_folder = /var/log/harness
//!
//! [routing:east]
//! bind_address = 0.0.0.0:6446
//! ```

use crate::config::{Config, SectionId};
use crate::error::ConfigError;

/// Parses `text` into sections on an already-constructed [`Config`],
/// appending to (not replacing) whatever sections it already has.
pub fn parse_into(config: &mut Config, text: &str) -> Result<(), ConfigError> {
    let mut current: Option<SectionId> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let (name, key) = match header.split_once(':') {
                Some((n, k)) => (n.trim(), k.trim()),
                None => (header.trim(), ""),
            };
            config.add_section(name, key)?;
            current = Some(SectionId::new(name, key));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::InvalidArgument {
                option: "<config file>".to_owned(),
                reason: format!("expected 'option = value', found '{raw_line}'"),
            });
        };
        let Some(section) = current.as_ref() else {
            return Err(ConfigError::InvalidArgument {
                option: key.trim().to_owned(),
                reason: "option given before any [section] header".to_owned(),
            });
        };
        config.set_in_section(section, key.trim(), value.trim());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_options() {
        let mut cfg = Config::new("test");
        parse_into(
            &mut cfg,
            "# comment\n[DEFAULT]\nlogging_folder = /var/log/harness\n\n[routing:east]\nbind_address = 0.0.0.0:6446\n",
        )
        .unwrap();

        let east = SectionId::new("routing", "east");
        assert_eq!(cfg.get_value(&east, "bind_address").unwrap(), "0.0.0.0:6446");
    }

    #[test]
    fn rejects_duplicate_headers() {
        let mut cfg = Config::new("test");
        let err = parse_into(&mut cfg, "[routing:east]\n[routing:east]\n");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_option_before_any_header() {
        let mut cfg = Config::new("test");
        assert!(parse_into(&mut cfg, "mode = rw\n").is_err());
    }

    #[test]
    fn ignores_blank_lines_and_comments() {
        let mut cfg = Config::new("test");
        parse_into(&mut cfg, "[DEFAULT]\n\n; comment\n# also a comment\nx = 1\n").unwrap();
        let def = SectionId::new("DEFAULT", "");
        assert_eq!(cfg.get_value(&def, "x").unwrap(), "1");
    }
}
