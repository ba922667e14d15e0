//! Message transport abstraction for Mountain Car sessions.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::SessionId;

/// Abstraction for the line-oriented link between a client and a session.
///
/// # Implementations
///
/// - **Production**: [`TcpLineTransport`](crate::TcpLineTransport), newline-framed TCP
/// - **In-process**: channel-based, used by tests and the headless runner
///
/// # Message Flow
///
/// ```text
/// Client                    Transport                   Session
///   |                           |                          |
///   |-- "STEP:2" -------------->|                          |
///   |                           |------------------------->|-- recv() -> "STEP:2"
///   |                           |<-------------------------|-- send("RO:...")
///   |<-- "RO:-1.0:0:..." -------|                          |
/// ```
///
/// Exactly one message is in flight per session: the session reads a
/// request, answers it, and only then reads the next.
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    /// Sends one message.
    ///
    /// # Returns
    /// * `Ok(())` - Message written (and flushed)
    /// * `Err(EnvError::Closed)` - The peer is gone
    /// * `Err(EnvError::MultiLine)` - The message would break framing
    async fn send(&self, message: &str) -> Result<(), EnvError>;

    /// Receives the next message.
    ///
    /// # Returns
    /// * `Ok(Some(message))` - A message arrived
    /// * `Ok(None)` - The peer closed the link cleanly
    ///
    /// # Blocking
    /// This method waits until a message arrives or the link closes.
    async fn recv(&self) -> Result<Option<String>, EnvError>;

    /// Returns this end's session ID.
    fn local_id(&self) -> SessionId;
}
