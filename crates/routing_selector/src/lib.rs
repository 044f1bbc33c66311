//! First-available failover destination selection for routed connections.
//!
//! - [`selector`] - [`FirstAvailableSelector`](selector::FirstAvailableSelector),
//!   which tries destinations in order starting from the last known-good
//!   position
//! - [`error`] - [`RoutingError`](error::RoutingError)

/// Errors raised during destination selection.
pub mod error;

/// The first-available selector and its [`Connector`](selector::Connector) trait.
pub mod selector;

pub use error::RoutingError;
pub use selector::{Connector, Destination, FirstAvailableSelector, TcpConnector};
