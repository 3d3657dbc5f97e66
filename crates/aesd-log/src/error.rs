//! Error types for aesd-log
//!
//! Every operation that returns one of these leaves the store exactly as it
//! was before the call.

use std::collections::TryReserveError;

use thiserror::Error;

/// `EINVAL` as reported to device-style callers
pub const EINVAL: i32 = 22;
/// `ENOMEM` as reported to device-style callers
pub const ENOMEM: i32 = 12;
/// `EFBIG` as reported to device-style callers
pub const EFBIG: i32 = 27;

/// Errors that can occur in log store operations
#[derive(Debug, Error)]
pub enum LogError {
    /// Offset or index lies beyond the current logical content
    #[error("No data at requested position")]
    NotFound,

    /// Command index or intra-record offset out of range, bad seek target
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation failed while storing a record or growing a pending buffer
    #[error("Resource exhausted: {0}")]
    ResourceExhaustion(String),

    /// Pending bytes would exceed the configured cap before a newline
    #[error("Record too large: {pending} pending + {incoming} incoming exceeds {limit} bytes")]
    RecordTooLarge {
        pending: usize,
        incoming: usize,
        limit: usize,
    },

    /// Store configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<TryReserveError> for LogError {
    fn from(err: TryReserveError) -> Self {
        LogError::ResourceExhaustion(err.to_string())
    }
}

impl LogError {
    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Positive errno value for device-style front-ends.
    ///
    /// `NotFound` maps to 0 because callers report it as end of stream.
    pub fn errno(&self) -> i32 {
        match self {
            LogError::NotFound => 0,
            LogError::InvalidArgument(_) | LogError::Config(_) => EINVAL,
            LogError::ResourceExhaustion(_) => ENOMEM,
            LogError::RecordTooLarge { .. } => EFBIG,
        }
    }
}

/// Result type alias for log store operations
pub type LogResult<T> = Result<T, LogError>;
