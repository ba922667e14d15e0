//! Error types for the Mountain Car transport layer.

use thiserror::Error;

/// Errors that can occur while moving messages between a client and a session.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Socket-level failure (connect, read, write)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The other side hung up or the channel was dropped
    #[error("Transport closed")]
    Closed,

    /// Message contains a line break and would be split on the wire
    #[error("Message spans multiple lines ({0} bytes)")]
    MultiLine(usize),
}

impl From<std::io::Error> for EnvError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::UnexpectedEof => EnvError::Closed,
            _ => EnvError::NetworkError(err.to_string()),
        }
    }
}
