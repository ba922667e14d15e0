//! Capability traits advertised by an environment.
//!
//! A host or dispatcher only needs the capabilities it actually uses, so each
//! one is a separate trait composed on the concrete [`Simulator`].

use crate::params::ParameterHolder;
use crate::simulator::{Action, Observation, RewardObservation, Simulator};
use crate::task_spec::TaskSpec;
use rand::Rng;
use tracing::info;

/// Fixed protocol version tuple `(major, minor)`.
pub const PROTOCOL_VERSION: (u32, u32) = (1, 1);

/// Episodic environment lifecycle.
pub trait Stepping {
    /// Resets counters and returns the task specification.
    fn env_init(&mut self) -> TaskSpec;

    /// Begins an episode.
    fn env_start(&mut self) -> Observation;

    /// Applies one action.
    fn env_step(&mut self, action: Action) -> RewardObservation;

    /// Lifecycle symmetry hook.
    fn env_cleanup(&mut self);
}

/// Bounds of the observable variables.
pub trait BoundsQueryable {
    /// Number of queryable variables.
    fn num_vars(&self) -> usize;

    /// Upper bound of a variable.
    fn max_value_for_variable(&self, dimension: usize) -> f64;

    /// Lower bound of a variable.
    fn min_value_for_variable(&self, dimension: usize) -> f64;
}

/// Maps a full state to the observation an agent would see.
pub trait ObservationForState {
    fn observation_for_state(&self, state: &[f64]) -> Vec<f64>;
}

/// Accepts parameters pushed at run time.
pub trait ParameterReceivable {
    /// Returns true to acknowledge receipt.
    fn receive_parameters(&mut self, params: &ParameterHolder) -> bool;
}

/// Reports the message-protocol version the environment speaks.
pub trait VersionAware {
    fn supported_version(&self) -> (u32, u32) {
        PROTOCOL_VERSION
    }
}

impl<R: Rng> Stepping for Simulator<R> {
    fn env_init(&mut self) -> TaskSpec {
        self.initialize()
    }

    fn env_start(&mut self) -> Observation {
        self.start_episode()
    }

    fn env_step(&mut self, action: Action) -> RewardObservation {
        self.step(action)
    }

    fn env_cleanup(&mut self) {
        self.cleanup()
    }
}

// Dimension 0 is position; every other dimension answers with the velocity
// bound, which is symmetric around zero.
impl<R: Rng> BoundsQueryable for Simulator<R> {
    fn num_vars(&self) -> usize {
        2
    }

    fn max_value_for_variable(&self, dimension: usize) -> f64 {
        match dimension {
            0 => self.params().max_position,
            _ => self.params().max_velocity,
        }
    }

    fn min_value_for_variable(&self, dimension: usize) -> f64 {
        match dimension {
            0 => self.params().min_position,
            _ => -self.params().max_velocity,
        }
    }
}

// Fully observable: the observation is the state.
impl<R: Rng> ObservationForState for Simulator<R> {
    fn observation_for_state(&self, state: &[f64]) -> Vec<f64> {
        state.to_vec()
    }
}

impl<R: Rng> ParameterReceivable for Simulator<R> {
    fn receive_parameters(&mut self, params: &ParameterHolder) -> bool {
        // Parameters are fixed at construction; run-time ones are only logged.
        let summary: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        info!("Mountain Car received {} parameters: {}", params.len(), summary.join(", "));
        true
    }
}

impl<R: Rng> VersionAware for Simulator<R> {}
