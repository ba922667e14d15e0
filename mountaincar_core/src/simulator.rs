//! Mountain Car dynamics.
//!
//! An underpowered car sits in a valley between two hills described by the
//! height profile `-sin(frequency * x)`. Each step applies one of three thrust
//! values plus a gravity term, integrates with clipping, and checks the goal.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──► Ready ──start_episode()──► Running
//!                                   ▲                          │ step()*
//!                                   └────── terminal step ─────┘
//! ```

use crate::error::{ConfigError, SimError};
use crate::params::{ParameterHolder, Parameters};
use crate::task_spec::TaskSpec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// Discrete thrust command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Full thrust towards negative positions (index 0)
    Reverse,

    /// No thrust (index 1)
    Neutral,

    /// Full thrust towards the goal (index 2)
    Forward,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Action; 3] = [Action::Reverse, Action::Neutral, Action::Forward];

    /// Returns the wire index of this action.
    pub fn index(self) -> i64 {
        match self {
            Action::Reverse => 0,
            Action::Neutral => 1,
            Action::Forward => 2,
        }
    }

    /// Thrust direction: `index - 1`.
    pub fn thrust(self) -> f64 {
        (self.index() - 1) as f64
    }
}

impl TryFrom<i64> for Action {
    type Error = SimError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Action::Reverse),
            1 => Ok(Action::Neutral),
            2 => Ok(Action::Forward),
            other => Err(SimError::InvalidAction(other)),
        }
    }
}

/// Fully observable state: `[position, velocity]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub position: f64,
    pub velocity: f64,
}

impl Observation {
    /// Creates an observation.
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    /// Returns the observation as a 2-vector.
    pub fn to_array(&self) -> [f64; 2] {
        [self.position, self.velocity]
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardObservation {
    pub reward: f64,
    pub observation: Observation,
    pub terminal: bool,
}

/// Mutable simulator state, including the episode counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatorState {
    pub position: f64,
    pub velocity: f64,
    pub episode_number: u32,
    pub current_step: u32,
    pub total_steps: u32,
}

/// Coarse lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `initialize` has not been called yet
    Uninitialized,

    /// Initialized, or the last episode reached the goal
    Ready,

    /// An episode is in progress
    Running,
}

/// The Mountain Car simulator.
///
/// Generic over the random number generator used for random start states.
/// [`Simulator::new`] seeds a `StdRng` from entropy; pass a seeded generator
/// to [`Simulator::with_rng`] for reproducible runs.
pub struct Simulator<R: Rng = StdRng> {
    params: Parameters,
    state: SimulatorState,
    phase: Phase,
    rng: R,
}

impl Simulator<StdRng> {
    /// Creates a simulator with an entropy-seeded generator.
    pub fn new(params: Parameters) -> Self {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Creates a simulator from an external parameter holder.
    ///
    /// An empty holder yields the default parameters.
    pub fn from_holder(holder: &ParameterHolder) -> Result<Self, ConfigError> {
        Ok(Self::new(Parameters::from_holder(holder)?))
    }
}

impl Default for Simulator<StdRng> {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}

impl<R: Rng> Simulator<R> {
    /// Creates a simulator with an injected generator.
    pub fn with_rng(params: Parameters, rng: R) -> Self {
        let state = SimulatorState {
            position: params.default_init_position,
            velocity: params.default_init_velocity,
            ..SimulatorState::default()
        };
        Self {
            params,
            state,
            phase: Phase::Uninitialized,
            rng,
        }
    }

    /// Returns the problem parameters.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Returns the current state and counters.
    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    /// Returns the lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn position(&self) -> f64 {
        self.state.position
    }

    pub fn velocity(&self) -> f64 {
        self.state.velocity
    }

    /// Returns the current observation.
    pub fn observation(&self) -> Observation {
        Observation::new(self.state.position, self.state.velocity)
    }

    /// Resets all counters and the state, and returns the task spec.
    pub fn initialize(&mut self) -> TaskSpec {
        self.state = SimulatorState {
            position: self.params.default_init_position,
            velocity: self.params.default_init_velocity,
            episode_number: 0,
            current_step: 0,
            total_steps: 0,
        };
        self.phase = Phase::Ready;

        let spec = TaskSpec::for_parameters(&self.params);
        info!("Mountain Car initialized: {}", spec);
        spec
    }

    /// Starts a new episode and returns the first observation.
    pub fn start_episode(&mut self) -> Observation {
        self.state.episode_number = self.state.episode_number.wrapping_add(1);
        self.state.current_step = 0;
        self.state.total_steps = self.state.total_steps.wrapping_add(1);

        if self.params.random_starts {
            let p = &self.params;
            self.state.position = self.rng.gen_range(p.min_position..=p.max_position);
            // Drawn symmetrically; clamped in case minVelocity > -maxVelocity.
            let velocity = self.rng.gen_range(-p.max_velocity..=p.max_velocity);
            self.state.velocity = velocity.clamp(p.min_velocity, p.max_velocity);
        } else {
            self.state.position = self.params.default_init_position;
            self.state.velocity = self.params.default_init_velocity;
        }
        self.phase = Phase::Running;

        debug!(
            "Episode {} started at position={:.4} velocity={:.4}",
            self.state.episode_number, self.state.position, self.state.velocity
        );
        self.observation()
    }

    /// Advances the dynamics by one step.
    pub fn step(&mut self, action: Action) -> RewardObservation {
        self.state.current_step = self.state.current_step.wrapping_add(1);
        self.state.total_steps = self.state.total_steps.wrapping_add(1);

        if self.phase != Phase::Running {
            debug!("step() called outside a running episode (phase={:?})", self.phase);
        }

        let p = &self.params;
        let mut velocity = self.state.velocity;
        let mut position = self.state.position;

        velocity += action.thrust() * p.acceleration_factor
            + self.slope(position) * p.gravity_factor;
        velocity = velocity.clamp(p.min_velocity, p.max_velocity);

        position += velocity;
        position = position.clamp(p.min_position, p.max_position);

        // Left wall is inelastic.
        if position == p.min_position && velocity < 0.0 {
            velocity = 0.0;
        }

        self.state.position = position;
        self.state.velocity = velocity;

        let terminal = self.in_goal_region();
        let reward = if terminal {
            self.params.reward_at_goal
        } else {
            self.params.reward_per_step
        };
        if terminal {
            self.phase = Phase::Ready;
            debug!(
                "Episode {} reached the goal after {} steps",
                self.state.episode_number, self.state.current_step
            );
        }

        trace!(
            "step {:?}: position={:.5} velocity={:.5} reward={}",
            action,
            position,
            velocity,
            reward
        );

        RewardObservation {
            reward,
            observation: self.observation(),
            terminal,
        }
    }

    /// End-of-experiment hook; nothing to release.
    pub fn cleanup(&mut self) {
        debug!("Mountain Car cleanup after {} total steps", self.state.total_steps);
    }

    /// True once the car is at or past the goal.
    pub fn in_goal_region(&self) -> bool {
        self.state.position >= self.params.goal_position
    }

    /// Height of the hill under the car.
    pub fn height(&self) -> f64 {
        self.height_at(self.state.position)
    }

    /// Height of the hill profile at an arbitrary position.
    pub fn height_at(&self, position: f64) -> f64 {
        -(self.params.hill_peak_frequency * position).sin()
    }

    /// Slope term used by the gravity update.
    ///
    /// The profile is `-sin(f * x)`, so the exact derivative of `-height` is
    /// `f * cos(f * x)`. The factor `f` is intentionally not applied: the
    /// dynamics are defined by `cos(f * x)`.
    pub fn slope(&self, position: f64) -> f64 {
        (self.params.hill_peak_frequency * position).cos()
    }

    /// Overwrites position and velocity, clamped into their bounds.
    ///
    /// Intended for visualizers and tests that need to place the car.
    pub fn set_state(&mut self, position: f64, velocity: f64) {
        let p = &self.params;
        self.state.position = position.clamp(p.min_position, p.max_position);
        self.state.velocity = velocity.clamp(p.min_velocity, p.max_velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn seeded(params: Parameters) -> Simulator<ChaCha8Rng> {
        Simulator::with_rng(params, ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn test_action_conversion() {
        assert_eq!(Action::try_from(0).unwrap(), Action::Reverse);
        assert_eq!(Action::try_from(1).unwrap(), Action::Neutral);
        assert_eq!(Action::try_from(2).unwrap(), Action::Forward);
        assert_eq!(Action::try_from(3), Err(SimError::InvalidAction(3)));
        assert_eq!(Action::try_from(-1), Err(SimError::InvalidAction(-1)));
        assert_eq!(Action::Reverse.thrust(), -1.0);
        assert_eq!(Action::Forward.thrust(), 1.0);
    }

    #[test]
    fn test_initialize_resets_counters() {
        let mut sim = Simulator::new(Parameters::default());
        assert_eq!(sim.phase(), Phase::Uninitialized);

        let spec = sim.initialize();
        assert_eq!(spec.to_string(), "1:e:2_[f,f]_[-1.2,0.6]_[-0.07,0.07]:1_[i]_[0,2]");
        assert_eq!(sim.phase(), Phase::Ready);

        sim.start_episode();
        sim.step(Action::Forward);
        sim.initialize();

        let state = sim.state();
        assert_eq!(state.episode_number, 0);
        assert_eq!(state.current_step, 0);
        assert_eq!(state.total_steps, 0);
        assert_eq!(sim.observation(), Observation::new(-0.5, 0.0));
    }

    #[test]
    fn test_counters() {
        let mut sim = Simulator::new(Parameters::default());
        sim.initialize();

        sim.start_episode();
        assert_eq!(sim.state().episode_number, 1);
        assert_eq!(sim.state().current_step, 0);
        assert_eq!(sim.state().total_steps, 1);

        sim.step(Action::Neutral);
        sim.step(Action::Neutral);
        assert_eq!(sim.state().current_step, 2);
        assert_eq!(sim.state().total_steps, 3);

        sim.start_episode();
        assert_eq!(sim.state().episode_number, 2);
        assert_eq!(sim.state().current_step, 0);
        assert_eq!(sim.state().total_steps, 4);
    }

    #[test]
    fn test_counters_wrap_instead_of_overflowing() {
        let mut sim = Simulator::new(Parameters::default());
        sim.initialize();
        sim.start_episode();
        sim.state.total_steps = u32::MAX;
        sim.state.current_step = u32::MAX;

        sim.step(Action::Neutral);
        assert_eq!(sim.state().total_steps, 0);
        assert_eq!(sim.state().current_step, 0);

        sim.state.episode_number = u32::MAX;
        sim.start_episode();
        assert_eq!(sim.state().episode_number, 0);
        assert_eq!(sim.state().total_steps, 1);
    }

    #[test]
    fn test_single_forward_step_from_default_start() {
        let mut sim = Simulator::new(Parameters::default());
        sim.initialize();
        let obs = sim.start_episode();
        assert_eq!(obs, Observation::new(-0.5, 0.0));

        let ro = sim.step(Action::Forward);

        let expected_v = 0.0 + (2.0 - 1.0) * 0.001 + (3.0_f64 * -0.5).cos() * -0.0025;
        let expected_p = -0.5 + expected_v;
        assert_relative_eq!(ro.observation.velocity, expected_v, epsilon = 1e-15);
        assert_relative_eq!(ro.observation.position, expected_p, epsilon = 1e-15);
        assert_relative_eq!(expected_v, 0.000823157, epsilon = 1e-8);
        assert!(!ro.terminal);
        assert_eq!(ro.reward, -1.0);
    }

    #[test]
    fn test_wall_stop() {
        let mut sim = Simulator::new(Parameters::default());
        sim.initialize();
        sim.start_episode();
        sim.set_state(-1.19, -0.07);

        let ro = sim.step(Action::Reverse);
        assert_eq!(ro.observation.position, -1.2);
        assert_eq!(ro.observation.velocity, 0.0);
    }

    #[test]
    fn test_goal_detection_and_reward() {
        let mut sim = Simulator::new(Parameters::default());
        sim.initialize();
        sim.start_episode();
        sim.set_state(0.49, 0.07);

        let ro = sim.step(Action::Forward);
        assert!(ro.terminal);
        assert_eq!(ro.reward, 0.0);
        assert!(ro.observation.position >= 0.5);
        assert_eq!(ro.observation.velocity, 0.07);
        assert_eq!(sim.phase(), Phase::Ready);
    }

    #[test]
    fn test_fixed_start_ignores_previous_episode() {
        let mut sim = Simulator::new(Parameters::default());
        sim.initialize();
        sim.start_episode();
        for _ in 0..50 {
            sim.step(Action::Forward);
        }
        assert_ne!(sim.observation(), Observation::new(-0.5, 0.0));

        assert_eq!(sim.start_episode(), Observation::new(-0.5, 0.0));
    }

    #[test]
    fn test_random_starts_within_bounds() {
        let params = Parameters {
            random_starts: true,
            ..Parameters::default()
        };
        let mut sim = seeded(params);
        sim.initialize();

        let mut distinct = std::collections::HashSet::new();
        for _ in 0..200 {
            let obs = sim.start_episode();
            assert!((-1.2..=0.6).contains(&obs.position));
            assert!((-0.07..=0.07).contains(&obs.velocity));
            distinct.insert(obs.position.to_bits());
        }
        assert!(distinct.len() > 100);
    }

    #[test]
    fn test_random_starts_deterministic_with_seed() {
        let params = Parameters {
            random_starts: true,
            ..Parameters::default()
        };
        let mut a = seeded(params.clone());
        let mut b = seeded(params);
        a.initialize();
        b.initialize();

        for _ in 0..10 {
            assert_eq!(a.start_episode(), b.start_episode());
        }
    }

    #[test]
    fn test_height_and_slope_formulas() {
        let sim = Simulator::new(Parameters::default());
        for p in [-1.2, -0.5, 0.0, 0.3, 0.6] {
            assert_eq!(sim.height_at(p), -(3.0 * p).sin());
            assert_eq!(sim.slope(p), (3.0 * p).cos());
        }
        assert_eq!(sim.height(), -(3.0_f64 * -0.5).sin());
    }

    #[test]
    fn test_set_state_clamps() {
        let mut sim = Simulator::new(Parameters::default());
        sim.set_state(5.0, -1.0);
        assert_eq!(sim.position(), 0.6);
        assert_eq!(sim.velocity(), -0.07);
    }

    proptest! {
        #[test]
        fn prop_state_stays_in_bounds(
            position in -1.2f64..=0.6,
            velocity in -0.07f64..=0.07,
            actions in proptest::collection::vec(0i64..3, 1..300),
        ) {
            let mut sim = Simulator::new(Parameters::default());
            sim.initialize();
            sim.start_episode();
            sim.set_state(position, velocity);

            for a in actions {
                let ro = sim.step(Action::try_from(a).unwrap());
                let obs = ro.observation;
                prop_assert!((-1.2..=0.6).contains(&obs.position));
                prop_assert!((-0.07..=0.07).contains(&obs.velocity));
                prop_assert_eq!(ro.terminal, obs.position >= 0.5);
                prop_assert_eq!(ro.reward, if ro.terminal { 0.0 } else { -1.0 });
                if obs.position == -1.2 {
                    prop_assert!(obs.velocity >= 0.0);
                }
            }
        }

        #[test]
        fn prop_height_is_pure(p in -1.2f64..=0.6) {
            let sim = Simulator::new(Parameters::default());
            prop_assert_eq!(sim.height_at(p), -(3.0 * p).sin());
        }
    }
}
