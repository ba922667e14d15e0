//! Production transport: newline-framed TCP on Tokio.

use crate::error::EnvError;
use crate::transport::MessageTransport;
use crate::types::{check_single_line, SessionId};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;

/// One message per line over a TCP stream.
///
/// Trailing `\n` or `\r\n` is stripped on receive; `\n` is appended on send.
pub struct TcpLineTransport {
    /// Identifier for logging
    local_id: SessionId,

    /// Remote address
    peer: SocketAddr,

    /// Buffered reader half (behind tokio mutex for async)
    reader: Mutex<Lines<BufReader<OwnedReadHalf>>>,

    /// Writer half
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpLineTransport {
    /// Wraps an accepted or connected stream.
    pub fn new(stream: TcpStream) -> Result<Self, EnvError> {
        let peer = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            local_id: SessionId::new(),
            peer,
            reader: Mutex::new(BufReader::new(read_half).lines()),
            writer: Mutex::new(write_half),
        })
    }

    /// Connects to a listening session server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, EnvError> {
        let stream = TcpStream::connect(addr).await?;
        Self::new(stream)
    }

    /// Address of the remote end.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Sends a message and waits for the single reply.
    pub async fn request(&self, message: &str) -> Result<String, EnvError> {
        self.send(message).await?;
        self.recv().await?.ok_or(EnvError::Closed)
    }
}

#[async_trait]
impl MessageTransport for TcpLineTransport {
    async fn send(&self, message: &str) -> Result<(), EnvError> {
        check_single_line(message)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(message.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Option<String>, EnvError> {
        let mut reader = self.reader.lock().await;
        Ok(reader.next_line().await?)
    }

    fn local_id(&self) -> SessionId {
        self.local_id
    }
}
