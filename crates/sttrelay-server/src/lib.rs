//! Wyoming speech-to-text relay server.
//!
//! Each accepted connection gets its own [`ConnectionHandler`] with fresh
//! per-utterance state. Only the [`ServerConfig`] and the transcriber are
//! shared between connections.

pub mod config;
pub mod error;
pub mod handler;
pub mod server;

pub use config::{ServerConfig, DEFAULT_LANGUAGE};
pub use error::{Result, ServerError};
pub use handler::{ConnectionHandler, ConnectionStats, State};
pub use server::Server;
