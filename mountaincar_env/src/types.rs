//! Common types for the Mountain Car transport layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a client session.
///
/// Uses UUID v4 so concurrent sessions never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random SessionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic SessionId from a seed (for tests and replays).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Rejects messages that would not survive newline framing.
pub fn check_single_line(message: &str) -> Result<(), crate::EnvError> {
    if message.contains('\n') || message.contains('\r') {
        return Err(crate::EnvError::MultiLine(message.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_from_seed_is_stable() {
        assert_eq!(SessionId::from_seed(7), SessionId::from_seed(7));
        assert_ne!(SessionId::from_seed(7), SessionId::from_seed(8));
        assert_eq!(SessionId::from_seed(7).to_string().len(), 8);
    }

    #[test]
    fn test_check_single_line() {
        assert!(check_single_line("GETMCSTATE").is_ok());
        assert!(check_single_line("A\nB").is_err());
        assert!(check_single_line("A\r").is_err());
    }
}
