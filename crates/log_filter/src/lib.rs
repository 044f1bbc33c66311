//! Regex-based redaction of sensitive statement fragments from log output.
//!
//! - [`filter`] - [`LogFilter`](filter::LogFilter), the rule list and its
//!   `filter()` entry point
//! - [`writer`] - wires a [`LogFilter`](filter::LogFilter) into
//!   `tracing_subscriber` as a [`MakeWriter`](tracing_subscriber::fmt::MakeWriter)
//! - [`error`] - [`LogFilterError`](error::LogFilterError)

/// Errors raised while compiling redaction rules.
pub mod error;

/// The rule list and redaction entry point.
pub mod filter;

/// `tracing_subscriber` wiring.
pub mod writer;

pub use error::LogFilterError;
pub use filter::LogFilter;
pub use writer::{FilteringMakeWriter, FilteringWriter};
