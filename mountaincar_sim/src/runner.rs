//! Episode runner - drives a simulator with a scripted policy.

use crate::policy::PolicyId;
use mountaincar_core::{Parameters, Simulator, Stepping};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of a single episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeResult {
    /// 1-based episode number
    pub episode: u32,

    /// Steps taken (at most the step cap)
    pub steps: u32,

    /// Sum of rewards
    pub total_reward: f64,

    /// Whether the goal was reached before the cap
    pub reached_goal: bool,

    /// Start state
    pub start_position: f64,
    pub start_velocity: f64,

    /// State after the last step
    pub final_position: f64,
    pub final_velocity: f64,
}

/// Aggregate over a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Policy that was run
    pub policy: String,

    /// Seed used
    pub seed: u64,

    /// Per-episode results
    pub episodes: Vec<EpisodeResult>,

    /// Episodes that reached the goal
    pub goals: usize,

    /// Mean steps per episode
    pub mean_steps: f64,

    /// Mean return per episode
    pub mean_reward: f64,
}

impl RunSummary {
    fn from_episodes(policy: PolicyId, seed: u64, episodes: Vec<EpisodeResult>) -> Self {
        let goals = episodes.iter().filter(|e| e.reached_goal).count();
        let n = episodes.len().max(1) as f64;
        let mean_steps = episodes.iter().map(|e| e.steps as f64).sum::<f64>() / n;
        let mean_reward = episodes.iter().map(|e| e.total_reward).sum::<f64>() / n;
        Self {
            policy: policy.name().to_string(),
            seed,
            episodes,
            goals,
            mean_steps,
            mean_reward,
        }
    }

    /// Fraction of episodes that reached the goal.
    pub fn success_rate(&self) -> f64 {
        if self.episodes.is_empty() {
            0.0
        } else {
            self.goals as f64 / self.episodes.len() as f64
        }
    }
}

/// Runs headless episodes.
pub struct EpisodeRunner {
    /// Configuration seed
    seed: u64,

    /// Problem parameters
    params: Parameters,

    /// Step cap per episode
    max_steps: u32,

    /// Policy to drive the car with
    policy: PolicyId,
}

impl EpisodeRunner {
    /// Creates a new runner with default parameters and the energy policy.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            params: Parameters::default(),
            max_steps: 1000,
            policy: PolicyId::Energy,
        }
    }

    /// Sets the problem parameters.
    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    /// Sets the step cap per episode.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the policy.
    pub fn with_policy(mut self, policy: PolicyId) -> Self {
        self.policy = policy;
        self
    }

    /// Runs `episodes` episodes and returns the summary.
    pub fn run(&self, episodes: u32) -> RunSummary {
        info!(
            "Running {} episodes with policy {} (seed={})",
            episodes, self.policy, self.seed
        );

        // Start states and policy noise draw from separate streams.
        let start_seed = self.seed;
        let policy_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);

        let mut sim = Simulator::with_rng(self.params.clone(), ChaCha8Rng::seed_from_u64(start_seed));
        let mut policy = self.policy.build(policy_seed);

        sim.env_init();
        let mut results = Vec::with_capacity(episodes as usize);

        for _ in 0..episodes {
            let start = sim.env_start();
            let mut obs = start;
            let mut total_reward = 0.0;
            let mut reached_goal = false;
            let mut steps = 0;

            while steps < self.max_steps {
                let ro = sim.env_step(policy.act(&obs));
                steps += 1;
                total_reward += ro.reward;
                obs = ro.observation;
                if ro.terminal {
                    reached_goal = true;
                    break;
                }
            }

            let result = EpisodeResult {
                episode: sim.state().episode_number,
                steps,
                total_reward,
                reached_goal,
                start_position: start.position,
                start_velocity: start.velocity,
                final_position: obs.position,
                final_velocity: obs.velocity,
            };
            debug!(
                "Episode {}: {} steps, return {}, goal={}",
                result.episode, result.steps, result.total_reward, result.reached_goal
            );
            results.push(result);
        }

        sim.env_cleanup();

        let summary = RunSummary::from_episodes(self.policy, self.seed, results);
        info!(
            "Finished: {}/{} reached the goal, mean steps {:.1}",
            summary.goals,
            summary.episodes.len(),
            summary.mean_steps
        );
        summary
    }
}
