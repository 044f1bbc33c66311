//! Errors raised by destination selection.

/// Errors the Routing Destination Selector can raise.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// The selector was built with no destinations at all.
    #[error("no destinations configured")]
    NoDestinations,

    /// Every destination was tried and none accepted a connection within
    /// the connect timeout.
    #[error("all {0} destination(s) are unavailable")]
    AllUnavailable(usize),

    /// The underlying connect attempt failed for a reason other than
    /// "refused" or "timed out" (e.g. the host did not resolve).
    #[error("failed to connect to {destination}: {reason}")]
    ConnectFailed {
        /// `host:port` of the destination that was tried.
        destination: String,
        /// Human-readable reason.
        reason: String,
    },
}
