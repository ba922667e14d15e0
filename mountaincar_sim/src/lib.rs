//! Mountain Car session host and headless runner
//!
//! This crate puts the simulator from `mountaincar_core` behind a
//! line-oriented environment envelope and serves it to remote agents, or
//! drives it locally with scripted policies.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  INIT/START/STEP/MSG  ┌─────────────────────────────┐
//! │ remote agent │ ────────────────────► │ SessionServer               │
//! │ / visualizer │ ◄──────────────────── │  └─ Session (one per conn.) │
//! └──────────────┘   one line per reply  │       └─ Simulator          │
//!                                        └─────────────────────────────┘
//!
//! ┌──────────────┐        act()          ┌─────────────────────────────┐
//! │ Policy       │ ◄───────────────────► │ EpisodeRunner ─► Simulator  │
//! └──────────────┘                       └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use mountaincar_sim::{EpisodeRunner, PolicyId};
//!
//! let summary = EpisodeRunner::new(42)
//!     .with_policy(PolicyId::Energy)
//!     .with_max_steps(500)
//!     .run(10);
//! println!("{}/{} reached the goal", summary.goals, summary.episodes.len());
//! ```

mod channel;
pub mod config;
pub mod policy;
mod runner;
mod server;
mod session;

pub use channel::ChannelTransport;
pub use config::{ParamSources, SetupError};
pub use policy::{Policy, PolicyId};
pub use runner::{EpisodeResult, EpisodeRunner, RunSummary};
pub use server::{ServerConfig, SessionServer};
pub use session::{Command, Outcome, Session, SessionError, SessionStats};
