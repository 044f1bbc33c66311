//! Errors raised while compiling redaction rules.

/// Errors the Log Filter can raise.
#[derive(Debug, thiserror::Error)]
pub enum LogFilterError {
    /// A rule's pattern failed to compile as a regular expression.
    #[error("invalid redaction pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex crate's own error message.
        reason: String,
    },
}
