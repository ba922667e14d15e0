//! Mountain Car Core - dynamics and query protocol
//!
//! An underpowered car must rock back and forth in a sinusoidal valley to
//! build enough momentum to reach the goal on the right-hand hill.
//!
//! This library provides:
//! 1. **Simulator**: bounded integrator with clipping, wall stop and goal detection
//! 2. **Parameters**: typed, aliased configuration surface with documented defaults
//! 3. **Protocol**: textual requests for state, height samples and variable bounds,
//!    dispatched without sharing memory with the simulator's owner

pub mod capabilities;
pub mod dispatcher;
pub mod error;
pub mod params;
pub mod protocol;
pub mod simulator;
pub mod task_spec;

// Re-export key types for convenience
pub use capabilities::{BoundsQueryable, ObservationForState, ParameterReceivable, Stepping, VersionAware};
pub use error::{ConfigError, ErrorKind, ProtocolError, SimError};
pub use params::{ParamValue, ParameterHolder, Parameters};
pub use protocol::{McState, Request, Response};
pub use simulator::{Action, Observation, Phase, RewardObservation, Simulator, SimulatorState};
pub use task_spec::TaskSpec;
