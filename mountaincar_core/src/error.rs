//! Error types for the Mountain Car core.

use std::fmt;
use thiserror::Error;

/// Coarse error classification shared by every failure the core can report.
///
/// The kind is what travels over the wire in `ERROR:<KIND>:<detail>` replies,
/// so the textual names are part of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Action outside `{0, 1, 2}`
    InvalidAction,

    /// Request recognised but its arguments are unusable
    MalformedRequest,

    /// Request prefix not recognised at all
    UnknownRequest,

    /// Parameter missing, mistyped or inconsistent
    ConfigurationError,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidAction => "INVALID_ACTION",
            ErrorKind::MalformedRequest => "MALFORMED_REQUEST",
            ErrorKind::UnknownRequest => "UNKNOWN_REQUEST",
            ErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVALID_ACTION" => Ok(ErrorKind::InvalidAction),
            "MALFORMED_REQUEST" => Ok(ErrorKind::MalformedRequest),
            "UNKNOWN_REQUEST" => Ok(ErrorKind::UnknownRequest),
            "CONFIGURATION_ERROR" => Ok(ErrorKind::ConfigurationError),
            _ => Err(format!("Unknown error kind: {}", s)),
        }
    }
}

/// Errors raised by the simulator itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The caller handed over an action index outside `{0, 1, 2}`.
    #[error("Invalid action: {0} (expected 0, 1 or 2)")]
    InvalidAction(i64),
}

impl SimError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::InvalidAction(_) => ErrorKind::InvalidAction,
        }
    }
}

/// Errors raised while turning a [`ParameterHolder`](crate::ParameterHolder)
/// into [`Parameters`](crate::Parameters).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Key is present but holds the wrong type of value
    #[error("Parameter '{key}' has the wrong type: expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// Raw text could not be read as a bool or a number
    #[error("Parameter '{key}' has an unreadable value: {value}")]
    InvalidValue { key: String, value: String },

    /// Key is not one of the recognised parameters
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Lower bound exceeds upper bound, or a value is not finite
    #[error("Inconsistent parameters: {0}")]
    Inconsistent(String),

    /// Serialized holder could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ConfigError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ConfigurationError
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serialization(err.to_string())
    }
}

/// Errors raised while parsing or answering a protocol request.
///
/// None of these are fatal: the dispatcher encodes them into an `ERROR`
/// reply and leaves the simulator untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Request prefix recognised but the arguments are unusable
    #[error("Malformed request '{payload}': {reason}")]
    MalformedRequest { payload: String, reason: String },

    /// Request prefix not recognised
    #[error("Unknown request: {0}")]
    UnknownRequest(String),
}

impl ProtocolError {
    /// Creates a malformed-request error.
    pub fn malformed(payload: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            payload: payload.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown-request error.
    pub fn unknown(payload: impl Into<String>) -> Self {
        Self::UnknownRequest(payload.into())
    }

    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::MalformedRequest { .. } => ErrorKind::MalformedRequest,
            ProtocolError::UnknownRequest(_) => ErrorKind::UnknownRequest,
        }
    }

    /// Returns the human-readable detail carried in the error reply.
    pub fn detail(&self) -> String {
        match self {
            ProtocolError::MalformedRequest { payload, reason } => {
                format!("{} ({})", payload, reason)
            }
            ProtocolError::UnknownRequest(payload) => payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_wire_names_roundtrip() {
        for kind in [
            ErrorKind::InvalidAction,
            ErrorKind::MalformedRequest,
            ErrorKind::UnknownRequest,
            ErrorKind::ConfigurationError,
        ] {
            assert_eq!(kind.as_str().parse::<ErrorKind>().unwrap(), kind);
        }
        assert!("NOPE".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(SimError::InvalidAction(7).kind(), ErrorKind::InvalidAction);
        assert_eq!(
            ProtocolError::malformed("GETHEIGHTS:2:0.1", "missing sample").kind(),
            ErrorKind::MalformedRequest
        );
        assert_eq!(ProtocolError::unknown("FOO").kind(), ErrorKind::UnknownRequest);
        assert_eq!(
            ConfigError::UnknownParameter("x".into()).kind(),
            ErrorKind::ConfigurationError
        );
    }

    #[test]
    fn test_protocol_error_detail() {
        let err = ProtocolError::malformed("GETHEIGHTS:2:0.1", "expected 2 samples, got 1");
        assert_eq!(err.detail(), "GETHEIGHTS:2:0.1 (expected 2 samples, got 1)");
        assert_eq!(ProtocolError::unknown("HELLO").detail(), "HELLO");
    }
}
