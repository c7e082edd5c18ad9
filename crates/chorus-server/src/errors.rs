//! Error types for the session engine and server.

use thiserror::Error;

use crate::ids::ClientId;

/// Registry failures. Everything else in the registry is a silent no-op.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `register` was called twice for the same client.
    #[error("client {0} is already registered")]
    AlreadyRegistered(ClientId),
}

/// Failures while handling one inbound message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The frame was not a recognizable JSON message.
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),
    /// A reply could not be serialized.
    #[error("failed to encode reply: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Server startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The `host:port` that was tried.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Other listener I/O failure.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
