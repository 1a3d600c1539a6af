//! Error types for riftwatch-core

use thiserror::Error;

/// Main error type for the riftwatch-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend HTTP collaborator error
    #[error("backend error: {0}")]
    Backend(String),

    /// Push event with a missing or undecodable field
    #[error("malformed {event} event: {message}")]
    MalformedEvent { event: String, message: String },

    /// Socket.IO / Engine.IO framing error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// WebSocket transport error
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for riftwatch-core
pub type Result<T> = std::result::Result<T, Error>;
