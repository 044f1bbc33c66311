//! Plugin version numbers and `requires` constraint arithmetic.
//!
//! A [`Version`] is the `major.minor.patch` triple a plugin descriptor
//! carries. A [`Constraint`] is the predicate half of a `requires` entry
//! such as `"fabric_cache (>>1.0.0)"`.

use core::fmt;
use core::str::FromStr;

use crate::error::{ConfigError, ResolveError};

/// Semantic-ish version triple used by plugin descriptors.
///
/// Ordering is lexicographic over `(major, minor, patch)`, matching the
/// total order the descriptor's packed `u32` encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Breaking-change component.
    pub major: u8,
    /// Backwards-compatible addition component.
    pub minor: u8,
    /// Bug-fix component.
    pub patch: u16,
}

impl Version {
    /// Builds a version from its three components.
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Packs the version the way a plugin descriptor stores `plugin_version`.
    #[must_use]
    pub const fn packed(self) -> u32 {
        ((self.major as u32) << 24) | ((self.minor as u32) << 16) | self.patch as u32
    }

    /// Unpacks a descriptor's `plugin_version` field.
    #[must_use]
    pub const fn from_packed(bits: u32) -> Self {
        Self {
            major: (bits >> 24) as u8,
            minor: (bits >> 16) as u8,
            patch: bits as u16,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ConfigError;

    /// Parses `M.m[.p]`; `p` defaults to 0. Fields that overflow their
    /// declared width are rejected rather than truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        let bad = || ConfigError::BadConstraintSyntax(s.to_owned());

        let major: u32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let minor: u32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let patch: u32 = match parts.next() {
            Some(p) => p.parse().map_err(|_| bad())?,
            None => 0,
        };

        if major > u8::MAX as u32 || minor > u8::MAX as u32 || patch > u16::MAX as u32 {
            return Err(bad());
        }

        Ok(Version::new(major as u8, minor as u8, patch as u16))
    }
}

/// A predicate a plugin's version must satisfy for a `requires` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// `(=X)`
    Exactly(Version),
    /// `(>>X)`
    StrictlyGreater(Version),
    /// `(<<X)`
    StrictlyLess(Version),
    /// `(>=X)`
    AtLeast(Version),
    /// `(<=X)`
    AtMost(Version),
    /// `(A..B)`, inclusive on both ends.
    Range(Version, Version),
}

impl Constraint {
    /// Whether `version` satisfies this predicate.
    #[must_use]
    pub fn satisfied_by(&self, version: Version) -> bool {
        match *self {
            Constraint::Exactly(v) => version == v,
            Constraint::StrictlyGreater(v) => version > v,
            Constraint::StrictlyLess(v) => version < v,
            Constraint::AtLeast(v) => version >= v,
            Constraint::AtMost(v) => version <= v,
            Constraint::Range(lo, hi) => version >= lo && version <= hi,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Exactly(v) => write!(f, "=={v}"),
            Constraint::StrictlyGreater(v) => write!(f, ">{v}"),
            Constraint::StrictlyLess(v) => write!(f, "<{v}"),
            Constraint::AtLeast(v) => write!(f, ">={v}"),
            Constraint::AtMost(v) => write!(f, "<={v}"),
            Constraint::Range(lo, hi) => write!(f, "{lo}..{hi}"),
        }
    }
}

impl FromStr for Constraint {
    type Err = ConfigError;

    /// Parses the parenthesized literal of a `requires` entry, e.g. `>>1.2.3`
    /// or `1.0.0..2.0.0`. Callers strip the surrounding parentheses first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::BadConstraintSyntax(s.to_owned());
        let s = s.trim();

        if let Some(rest) = s.strip_prefix(">>") {
            return Ok(Constraint::StrictlyGreater(rest.trim().parse()?));
        }
        if let Some(rest) = s.strip_prefix("<<") {
            return Ok(Constraint::StrictlyLess(rest.trim().parse()?));
        }
        if let Some(rest) = s.strip_prefix(">=") {
            return Ok(Constraint::AtLeast(rest.trim().parse()?));
        }
        if let Some(rest) = s.strip_prefix("<=") {
            return Ok(Constraint::AtMost(rest.trim().parse()?));
        }
        if let Some(rest) = s.strip_prefix('=') {
            return Ok(Constraint::Exactly(rest.trim().parse()?));
        }
        if let Some((lo, hi)) = s.split_once("..") {
            return Ok(Constraint::Range(lo.trim().parse()?, hi.trim().parse()?));
        }

        Err(bad())
    }
}

/// One parsed `requires` entry: a plugin name plus an optional constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Name of the required plugin.
    pub name: String,
    /// Version predicate, or `None` when the entry matched any version.
    pub constraint: Option<Constraint>,
}

impl Requirement {
    /// Parses a `requires` entry of the form `"name"` or `"name (constraint)"`.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let entry = entry.trim();
        match entry.find('(') {
            None => Ok(Requirement {
                name: entry.to_owned(),
                constraint: None,
            }),
            Some(open) => {
                let name = entry[..open].trim().to_owned();
                let rest = entry[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| ConfigError::BadConstraintSyntax(entry.to_owned()))?;
                Ok(Requirement {
                    name,
                    constraint: Some(rest.parse()?),
                })
            }
        }
    }

    /// Checks `actual` against this requirement's constraint, if any.
    pub fn check(&self, actual: Version) -> Result<(), ResolveError> {
        match self.constraint {
            None => Ok(()),
            Some(c) if c.satisfied_by(actual) => Ok(()),
            Some(c) => Err(ResolveError::VersionUnsatisfied {
                plugin: self.name.clone(),
                required: c,
                actual,
            }),
        }
    }
}
