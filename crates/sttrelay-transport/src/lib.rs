//! Listen and connect endpoints for the relay.
//!
//! Endpoints are written as URIs:
//! - `tcp://host:port`
//! - `unix:///path/to/socket` (Linux/macOS)
//!
//! The blocking [`RelayStream`] is used by command-line clients. The async
//! [`Listener`] (behind the `async` feature) is what the server accepts on.

pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

#[cfg(feature = "async")]
pub mod listener;

pub use endpoint::{Endpoint, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use stream::RelayStream;

#[cfg(feature = "async")]
pub use listener::{Connection, Listener};
