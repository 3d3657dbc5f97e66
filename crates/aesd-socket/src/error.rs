//! Error types for the socket server

use std::io;
use std::net::SocketAddr;

use aesd_log::LogError;
use thiserror::Error;

/// Errors that can occur in the socket server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Log store error
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed control command from a client
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ServerError {
    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new Protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<toml::de::Error> for ServerError {
    fn from(e: toml::de::Error) -> Self {
        ServerError::Config(e.to_string())
    }
}

/// Result type alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;
