//! Mountain Car CLI
//!
//! Serve the simulator to remote agents over TCP, or run scripted episodes
//! headlessly.

use clap::Parser;
use mountaincar_sim::config::log_directive;
use mountaincar_sim::{EpisodeRunner, ParamSources, PolicyId, ServerConfig, SessionServer};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Mountain Car simulator
#[derive(Parser, Debug)]
#[command(name = "mountaincar-sim")]
#[command(about = "Mountain Car environment: TCP session server and headless runner", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of episodes to run headlessly
    #[arg(short, long, default_value = "1")]
    episodes: u32,

    /// Step cap per episode
    #[arg(short, long, default_value = "1000")]
    max_steps: u32,

    /// Scripted policy (energy, forward, idle, random)
    #[arg(short, long, default_value = "energy")]
    policy: String,

    /// Parameter override as key=value (repeatable; aliases accepted)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// JSON parameter holder to load before overrides
    #[arg(long)]
    params_file: Option<PathBuf>,

    /// Start episodes from random states
    #[arg(long)]
    random_starts: bool,

    /// Serve sessions on this address instead of running headlessly
    #[arg(long, value_name = "ADDR")]
    serve: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging (RUST_LOG wins over --verbose)
    let directive = log_directive(args.verbose, std::env::var("RUST_LOG").ok().as_deref());
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let sources = ParamSources {
        file: args.params_file.clone(),
        overrides: args.params.clone(),
        random_starts: args.random_starts,
    };
    let params = sources.resolve().unwrap_or_else(|e| {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let policy: PolicyId = args.policy.parse().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        let names: Vec<&str> = PolicyId::all().iter().map(|p| p.name()).collect();
        eprintln!("Available policies: {}", names.join(", "));
        std::process::exit(1);
    });

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if let Some(addr) = &args.serve {
        let config = ServerConfig {
            params,
            seed: Some(base_seed),
        };
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        });
        let result = runtime.block_on(async {
            let server = SessionServer::bind(addr.as_str(), config).await?;
            server.serve().await
        });
        if let Err(e) = result {
            error!("Server failed on {}: {}", addr, e);
            std::process::exit(1);
        }
        return;
    }

    if !args.json {
        info!("Mountain Car v{}", env!("CARGO_PKG_VERSION"));
        info!("Policy: {} ({})", policy, policy.description());
    }

    let summary = EpisodeRunner::new(base_seed)
        .with_params(params)
        .with_max_steps(args.max_steps)
        .with_policy(policy)
        .run(args.episodes);

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to encode summary: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        for episode in &summary.episodes {
            let mark = if episode.reached_goal { "✓" } else { "✗" };
            info!(
                "{} episode {}: {} steps, return {}",
                mark, episode.episode, episode.steps, episode.total_reward
            );
        }
        info!(
            "{}/{} episodes reached the goal (mean steps {:.1}, mean return {:.1})",
            summary.goals,
            summary.episodes.len(),
            summary.mean_steps,
            summary.mean_reward
        );
    }
}
