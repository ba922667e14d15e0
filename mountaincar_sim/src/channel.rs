//! In-process transport backed by Tokio channels.

use async_trait::async_trait;
use mountaincar_env::{check_single_line, EnvError, MessageTransport, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One end of an in-process message link.
///
/// Created in connected pairs by [`ChannelTransport::pair`]; whatever one end
/// sends, the other receives, in order.
pub struct ChannelTransport {
    /// This end's ID
    local_id: SessionId,

    /// Sender to the other end
    tx: mpsc::Sender<String>,

    /// Receiver for incoming messages (behind tokio mutex for async)
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
}

impl ChannelTransport {
    /// Creates a connected `(client, server)` pair.
    ///
    /// `capacity` is the number of messages buffered per direction (at least 1).
    pub fn pair(capacity: usize) -> (Self, Self) {
        let capacity = capacity.max(1);
        let (client_tx, server_rx) = mpsc::channel(capacity);
        let (server_tx, client_rx) = mpsc::channel(capacity);

        let client = Self {
            local_id: SessionId::new(),
            tx: client_tx,
            rx: Arc::new(tokio::sync::Mutex::new(client_rx)),
        };
        let server = Self {
            local_id: SessionId::new(),
            tx: server_tx,
            rx: Arc::new(tokio::sync::Mutex::new(server_rx)),
        };
        (client, server)
    }

    /// Sends a message and waits for the single reply.
    pub async fn request(&self, message: &str) -> Result<String, EnvError> {
        self.send(message).await?;
        self.recv().await?.ok_or(EnvError::Closed)
    }
}

#[async_trait]
impl MessageTransport for ChannelTransport {
    async fn send(&self, message: &str) -> Result<(), EnvError> {
        check_single_line(message)?;
        self.tx
            .send(message.to_string())
            .await
            .map_err(|_| EnvError::Closed)
    }

    async fn recv(&self) -> Result<Option<String>, EnvError> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }

    fn local_id(&self) -> SessionId {
        self.local_id
    }
}
