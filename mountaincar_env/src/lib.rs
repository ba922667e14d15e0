//! Mountain Car Transport Abstraction Layer
//!
//! This crate provides the I/O boundary between a Mountain Car session and
//! the outside world, so the same session loop can run over:
//! - **TCP** (`TcpLineTransport`) for external agents and visualizers
//! - **In-process channels** for tests and headless runs
//!
//! # Framing
//!
//! One message per line. A session reads a request, answers it, and only
//! then reads the next one.
//!
//! # Example
//!
//! ```ignore
//! use mountaincar_env::{MessageTransport, TcpLineTransport};
//!
//! async fn query_state(addr: &str) -> Result<String, mountaincar_env::EnvError> {
//!     let link = TcpLineTransport::connect(addr).await?;
//!     link.request("MSG:GETMCSTATE").await
//! }
//! ```

mod error;
mod tokio_impl;
mod transport;
mod types;

pub use error::EnvError;
pub use tokio_impl::TcpLineTransport;
pub use transport::MessageTransport;
pub use types::{check_single_line, SessionId};
