//! Error types for the Spark streaming client

use thiserror::Error;

/// Result type for Spark client operations
pub type SparkResult<T> = Result<T, SparkError>;

/// Errors that can occur while talking to the Spark service
#[derive(Debug, Error)]
pub enum SparkError {
    /// Missing or invalid credentials/endpoint; raised before any network activity
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// WebSocket handshake failed (includes signature rejection by the service)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Send/receive failure not explained by a decoded protocol error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Structurally invalid framing: wrong frame type, premature close,
    /// or an unparseable frame body
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        /// The raw offending frame, kept verbatim for diagnostics
        raw: Option<String>,
    },

    /// The service answered with a non-zero error code. The `sid` identifies
    /// the session in the service-side logs; keep it when reporting errors.
    #[error("Spark service error {code} (sid: {sid}): {message}")]
    Remote {
        code: i32,
        sid: String,
        message: String,
    },

    /// Caller-initiated cancellation observed at a suspension point
    #[error("Operation cancelled")]
    Cancelled,

    /// The stream completed without yielding a single response
    #[error("Response stream produced no frames")]
    EmptyStream,

    /// The terminal frame carried no token usage
    #[error("Terminal frame carried no token usage")]
    MissingUsage,
}

impl SparkError {
    /// Protocol error without an associated raw frame
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        SparkError::Protocol {
            message: message.into(),
            raw: None,
        }
    }

    /// Protocol error carrying the offending frame verbatim
    pub(crate) fn protocol_with_raw(message: impl Into<String>, raw: impl Into<String>) -> Self {
        SparkError::Protocol {
            message: message.into(),
            raw: Some(raw.into()),
        }
    }
}
