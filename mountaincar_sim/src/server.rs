//! TCP session server.
//!
//! [`SessionServer`] accepts newline-framed connections and gives each one
//! its own [`Session`] and simulator, so concurrent clients never share
//! state. [`SessionServer::serve_one`] handles a single connection in the
//! caller's task, which is what tests use.

use crate::session::{Session, SessionError, SessionStats};
use mountaincar_core::{Parameters, Simulator};
use mountaincar_env::{EnvError, SessionId, TcpLineTransport};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info, warn};

/// Settings shared by every connection.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Problem parameters for each new simulator
    pub params: Parameters,

    /// Base seed. Connection `n` uses `seed + n`; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl ServerConfig {
    fn session_for(&self, index: u64) -> Session<ChaCha8Rng> {
        let (rng, id) = match self.seed {
            Some(seed) => {
                let seed = seed.wrapping_add(index);
                (ChaCha8Rng::seed_from_u64(seed), SessionId::from_seed(seed))
            }
            None => (ChaCha8Rng::from_entropy(), SessionId::new()),
        };
        Session::new(id, Simulator::with_rng(self.params.clone(), rng))
    }
}

/// Listens for session clients.
pub struct SessionServer {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    accepted: AtomicU64,
}

impl SessionServer {
    /// Binds to the given address (e.g. `"127.0.0.1:4096"`).
    pub async fn bind(addr: impl ToSocketAddrs, config: ServerConfig) -> Result<Self, EnvError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            accepted: AtomicU64::new(0),
        })
    }

    /// The local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, EnvError> {
        Ok(self.listener.local_addr()?)
    }

    async fn accept(&self) -> Result<(TcpLineTransport, Session<ChaCha8Rng>), EnvError> {
        let (stream, addr) = self.listener.accept().await?;
        let index = self.accepted.fetch_add(1, Ordering::Relaxed);
        let session = self.config.session_for(index);
        info!("[{}] Accepted connection #{} from {}", session.id(), index, addr);
        Ok((TcpLineTransport::new(stream)?, session))
    }

    /// Accepts one connection and serves it to completion.
    pub async fn serve_one(&self) -> Result<SessionStats, SessionError> {
        let (transport, mut session) = self.accept().await?;
        session.run(&transport).await
    }

    /// Accepts connections forever, one task per connection.
    ///
    /// A failing session is logged and dropped; the server keeps accepting.
    pub async fn serve(&self) -> Result<(), EnvError> {
        info!("Mountain Car session server listening on {}", self.local_addr()?);

        loop {
            let (transport, mut session) = match self.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("Failed to accept connection: {}", err);
                    continue;
                }
            };

            tokio::spawn(async move {
                let id = session.id();
                if let Err(err) = session.run(&transport).await {
                    error!("[{}] Session ended with error: {}", id, err);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mountaincar_env::MessageTransport;

    async fn local_server(seed: Option<u64>) -> SessionServer {
        let config = ServerConfig {
            params: Parameters::default(),
            seed,
        };
        SessionServer::bind("127.0.0.1:0", config).await.unwrap()
    }

    #[tokio::test]
    async fn test_serve_one_session() {
        let server = local_server(Some(5)).await;
        let addr = server.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let link = TcpLineTransport::connect(addr).await.unwrap();
            let spec = link.request("INIT").await.unwrap();
            let obs = link.request("START").await.unwrap();
            let heights = link.request("MSG:GETHEIGHTS:1:0.0").await.unwrap();
            let bye = link.request("QUIT").await.unwrap();
            (spec, obs, heights, bye)
        });

        let stats = server.serve_one().await.unwrap();
        let (spec, obs, heights, bye) = client.await.unwrap();

        assert!(spec.starts_with("TASKSPEC:1:e:2_"));
        assert_eq!(obs, "OBS:2:-0.5:0.0");
        assert_eq!(heights, "HEIGHTS:1:-0.0");
        assert_eq!(bye, "BYE");
        assert_eq!(stats.messages, 4);
    }

    #[tokio::test]
    async fn test_client_hangup_ends_session() {
        let server = local_server(None).await;
        let addr = server.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let link = TcpLineTransport::connect(addr).await.unwrap();
            link.send("INIT").await.unwrap();
            link.recv().await.unwrap()
        });

        let stats = server.serve_one().await.unwrap();
        assert!(client.await.unwrap().is_some());
        assert_eq!(stats.messages, 1);
    }

    #[test]
    fn test_seeded_sessions_are_distinct() {
        let config = ServerConfig {
            params: Parameters::default(),
            seed: Some(10),
        };
        assert_ne!(config.session_for(0).id(), config.session_for(1).id());
        assert_eq!(config.session_for(3).id(), SessionId::from_seed(13));
    }
}
