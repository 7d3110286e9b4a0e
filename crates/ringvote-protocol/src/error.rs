//! Protocol-level error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a wire message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The bytes read from a connection did not parse as a known message.
    #[error("failed to deserialize message: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The encoded message exceeded the soft size cap.
    #[error("message of {size} bytes exceeds the {max}-byte cap")]
    TooLarge {
        /// The size of the message that was rejected.
        size: usize,
        /// The configured cap.
        max: usize,
    },

    /// An I/O error occurred while reading or writing the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
