//! Scripted policies for headless runs.

use mountaincar_core::{Action, Observation};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Policy identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyId {
    /// Push in the direction of motion (pumps energy into the car)
    Energy,

    /// Always full thrust towards the goal
    Forward,

    /// Never thrust
    Idle,

    /// Uniformly random action
    Random,
}

impl PolicyId {
    /// Returns a list of all policies.
    pub fn all() -> Vec<PolicyId> {
        vec![
            PolicyId::Energy,
            PolicyId::Forward,
            PolicyId::Idle,
            PolicyId::Random,
        ]
    }

    /// Returns the policy name.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyId::Energy => "energy",
            PolicyId::Forward => "forward",
            PolicyId::Idle => "idle",
            PolicyId::Random => "random",
        }
    }

    /// Returns a description of the policy.
    pub fn description(&self) -> &'static str {
        match self {
            PolicyId::Energy => "Thrust along the current velocity",
            PolicyId::Forward => "Always thrust right",
            PolicyId::Idle => "Never thrust",
            PolicyId::Random => "Uniformly random thrust",
        }
    }

    /// Builds the policy. `seed` only matters for [`PolicyId::Random`].
    pub fn build(&self, seed: u64) -> Box<dyn Policy> {
        match self {
            PolicyId::Energy => Box::new(EnergyPumping),
            PolicyId::Forward => Box::new(Constant(Action::Forward)),
            PolicyId::Idle => Box::new(Constant(Action::Neutral)),
            PolicyId::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PolicyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "energy" | "pump" => Ok(PolicyId::Energy),
            "forward" | "right" => Ok(PolicyId::Forward),
            "idle" | "neutral" => Ok(PolicyId::Idle),
            "random" => Ok(PolicyId::Random),
            _ => Err(format!("Unknown policy: {}", s)),
        }
    }
}

/// Chooses an action from an observation.
pub trait Policy: Send {
    fn act(&mut self, observation: &Observation) -> Action;

    fn name(&self) -> &'static str;
}

/// Thrusts along the current velocity, reversing from rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyPumping;

impl Policy for EnergyPumping {
    fn act(&mut self, observation: &Observation) -> Action {
        if observation.velocity > 0.0 {
            Action::Forward
        } else {
            Action::Reverse
        }
    }

    fn name(&self) -> &'static str {
        "energy"
    }
}

/// Always the same action.
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub Action);

impl Policy for Constant {
    fn act(&mut self, _observation: &Observation) -> Action {
        self.0
    }

    fn name(&self) -> &'static str {
        match self.0 {
            Action::Forward => "forward",
            Action::Neutral => "idle",
            Action::Reverse => "reverse",
        }
    }
}

/// Uniform over the three actions, seeded for reproducibility.
pub struct RandomPolicy {
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: &Observation) -> Action {
        Action::ALL[self.rng.gen_range(0..Action::ALL.len())]
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_id_roundtrip() {
        for id in PolicyId::all() {
            assert_eq!(id.name().parse::<PolicyId>().unwrap(), id);
            assert_eq!(id.build(0).name(), id.name());
        }
        assert!("hover".parse::<PolicyId>().is_err());
    }

    #[test]
    fn test_energy_follows_velocity() {
        let mut policy = EnergyPumping;
        assert_eq!(policy.act(&Observation::new(-0.5, 0.01)), Action::Forward);
        assert_eq!(policy.act(&Observation::new(-0.5, -0.01)), Action::Reverse);
        assert_eq!(policy.act(&Observation::new(-0.5, 0.0)), Action::Reverse);
    }

    #[test]
    fn test_random_policy_is_seeded() {
        let obs = Observation::new(0.0, 0.0);
        let mut a = RandomPolicy::new(7);
        let mut b = RandomPolicy::new(7);
        let xs: Vec<Action> = (0..50).map(|_| a.act(&obs)).collect();
        let ys: Vec<Action> = (0..50).map(|_| b.act(&obs)).collect();
        assert_eq!(xs, ys);
        for action in Action::ALL {
            assert!(xs.contains(&action));
        }
    }
}
