//! Session host: the environment-call envelope around one simulator.
//!
//! Each line from the client is one command:
//!
//! | command       | reply                                   |
//! |---------------|-----------------------------------------|
//! | `INIT`        | `TASKSPEC:<task spec>`                  |
//! | `START`       | `OBS:2:<position>:<velocity>`           |
//! | `STEP:<a>`    | `RO:<reward>:<0/1>:<position>:<velocity>` |
//! | `MSG:<query>` | reply from the query dispatcher         |
//! | `CLEANUP`     | `OK`                                    |
//! | `QUIT`        | `BYE` (session ends)                    |
//!
//! A session owns its simulator outright and handles one command at a time.
//! An out-of-range action is fatal to the session: it is logged, reported,
//! and the simulator is dropped with the session.

use mountaincar_core::dispatcher;
use mountaincar_core::error::{ErrorKind, ProtocolError, SimError};
use mountaincar_core::protocol::Response;
use mountaincar_core::{Action, Simulator, Stepping};
use mountaincar_env::{EnvError, MessageTransport, SessionId};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The client asked for an action outside `{0, 1, 2}`
    #[error("Fatal: {0}")]
    InvalidAction(#[from] SimError),

    /// The transport failed
    #[error("Transport error: {0}")]
    Transport(#[from] EnvError),
}

/// A decoded envelope command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init,
    Start,
    Step(i64),
    Message(String),
    Cleanup,
    Quit,
}

impl Command {
    /// Decodes one line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        let (head, rest) = match line.split_once(':') {
            Some((head, rest)) => (head, Some(rest)),
            None => (line, None),
        };

        match (head, rest) {
            ("INIT", None) => Ok(Command::Init),
            ("START", None) => Ok(Command::Start),
            ("CLEANUP", None) => Ok(Command::Cleanup),
            ("QUIT", None) => Ok(Command::Quit),
            ("STEP", Some(arg)) => arg
                .trim()
                .parse()
                .map(Command::Step)
                .map_err(|_| ProtocolError::malformed(line, format!("'{}' is not an action", arg))),
            ("STEP", None) => Err(ProtocolError::malformed(line, "missing action")),
            ("MSG", Some(payload)) => Ok(Command::Message(payload.to_string())),
            ("MSG", None) => Err(ProtocolError::malformed(line, "missing payload")),
            ("INIT" | "START" | "CLEANUP" | "QUIT", Some(_)) => {
                Err(ProtocolError::malformed(line, "command takes no arguments"))
            }
            _ => Err(ProtocolError::unknown(line)),
        }
    }
}

/// What the session loop should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send the reply and keep going
    Reply(String),

    /// Send the reply and end the session
    Close(String),
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    /// Lines received
    pub messages: u64,

    /// Lines answered with an `ERROR` reply
    pub rejected: u64,

    /// Steps applied
    pub steps: u64,

    /// Episodes started
    pub episodes: u32,

    /// Episodes that reached the goal
    pub goals: u32,
}

/// One client's environment.
pub struct Session<R: Rng> {
    id: SessionId,
    sim: Simulator<R>,
    stats: SessionStats,
}

fn error_reply(err: &ProtocolError) -> String {
    Response::from_error(err).encode()
}

impl<R: Rng> Session<R> {
    /// Creates a session around a fresh simulator.
    pub fn new(id: SessionId, sim: Simulator<R>) -> Self {
        Self {
            id,
            sim,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn simulator(&self) -> &Simulator<R> {
        &self.sim
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Handles one line.
    ///
    /// Malformed and unknown commands produce `ERROR` replies and leave the
    /// simulator untouched. Only an invalid action index returns `Err`.
    pub fn handle_line(&mut self, line: &str) -> Result<Outcome, SessionError> {
        self.stats.messages += 1;

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                warn!("[{}] {}", self.id, err);
                self.stats.rejected += 1;
                return Ok(Outcome::Reply(error_reply(&err)));
            }
        };
        debug!("[{}] {:?}", self.id, command);

        let outcome = match command {
            Command::Init => Outcome::Reply(format!("TASKSPEC:{}", self.sim.env_init())),
            Command::Start => {
                let obs = self.sim.env_start();
                self.stats.episodes += 1;
                Outcome::Reply(format!("OBS:2:{:?}:{:?}", obs.position, obs.velocity))
            }
            Command::Step(index) => {
                let action = Action::try_from(index).map_err(|err| {
                    error!("[{}] Invalid action selected in Mountain Car: {}", self.id, index);
                    err
                })?;
                let ro = self.sim.env_step(action);
                self.stats.steps += 1;
                if ro.terminal {
                    self.stats.goals += 1;
                }
                Outcome::Reply(format!(
                    "RO:{:?}:{}:{:?}:{:?}",
                    ro.reward,
                    u8::from(ro.terminal),
                    ro.observation.position,
                    ro.observation.velocity
                ))
            }
            Command::Message(payload) => match dispatcher::respond(&mut self.sim, &payload) {
                Ok(response) => Outcome::Reply(response.encode()),
                Err(err) => {
                    warn!("[{}] Rejected message: {}", self.id, err);
                    self.stats.rejected += 1;
                    Outcome::Reply(error_reply(&err))
                }
            },
            Command::Cleanup => {
                self.sim.env_cleanup();
                Outcome::Reply("OK".to_string())
            }
            Command::Quit => Outcome::Close("BYE".to_string()),
        };
        Ok(outcome)
    }

    /// Serves commands from `transport` until the client quits or hangs up.
    pub async fn run<T: MessageTransport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<SessionStats, SessionError> {
        info!("[{}] Session opened", self.id);

        while let Some(line) = transport.recv().await? {
            match self.handle_line(&line) {
                Ok(Outcome::Reply(reply)) => transport.send(&reply).await?,
                Ok(Outcome::Close(reply)) => {
                    transport.send(&reply).await?;
                    break;
                }
                Err(err) => {
                    let reply = format!("ERROR:{}:{}", ErrorKind::InvalidAction, line.trim());
                    // Best effort: the session is ending either way.
                    let _ = transport.send(&reply).await;
                    error!("[{}] Session terminated: {}", self.id, err);
                    return Err(err);
                }
            }
        }

        info!(
            "[{}] Session closed: {} messages, {} episodes, {} steps",
            self.id, self.stats.messages, self.stats.episodes, self.stats.steps
        );
        Ok(self.stats)
    }
}
