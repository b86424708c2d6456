//! Error types for OpenSplit
//!
//! Decode errors are local to a single frame, transport errors are local to a
//! single observer connection. Neither ever reaches the timer state.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Problems turning an inbound frame into a [`crate::Command`]
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Frame is not a JSON object")]
    NotAnObject,
    #[error("Frame has no string `command` field")]
    MissingCommand,
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },
    #[error("Invalid argument `{field}` for command {command}")]
    InvalidArgument {
        command: &'static str,
        field: &'static str,
    },
}

/// Per-connection transport failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network I/O error: {0}")]
    NetworkIo(#[from] std::io::Error),
    #[error("WebSocket error: {reason}")]
    WebSocket { reason: String },
    #[error("Transport timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
    #[error("Transport shutdown: {reason}")]
    Shutdown { reason: String },
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OpenSplitError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Channel error: {message}")]
    Channel { message: String },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for OpenSplitError {
    fn from(err: std::io::Error) -> Self {
        OpenSplitError::Transport(TransportError::NetworkIo(err))
    }
}

pub type OpenSplitResult<T> = Result<T, OpenSplitError>;
