//! multiagent CLI
//!
//! Command-line driver for running batches of multi-agent environments.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use multiagent::env::{ConstantPolicy, CurryEnv, MultiAgentEnv};
use multiagent::vector::{make_vec_multi_env, Backend, VecEnvConfig};
use multiagent_envs::{Counter, MatchingPennies};

#[derive(Parser)]
#[command(name = "multiagent")]
#[command(version, about = "Multi-agent environment adapters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Serial,
    Parallel,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Serial => Backend::Serial,
            BackendArg::Parallel => Backend::Parallel,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List available environments
    List,

    /// Step a batch of environments with random actions
    Run {
        /// Environment name
        #[arg(default_value = "counter")]
        env: String,

        /// Number of environments
        #[arg(long, default_value = "4")]
        num_envs: usize,

        /// Number of batched steps
        #[arg(long, default_value = "100")]
        steps: usize,

        /// Execution backend
        #[arg(long, value_enum, default_value = "serial")]
        backend: BackendArg,

        /// Seed for resets and action sampling
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Fix this agent to a constant policy
        #[arg(long)]
        curry: Option<usize>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            list_envs();
        }
        Commands::Run {
            env,
            num_envs,
            steps,
            backend,
            seed,
            curry,
        } => {
            let config = VecEnvConfig::new(backend.into()).with_seed(seed);
            match env.as_str() {
                "counter" => run_env(
                    || Counter::new(3).with_horizon(20),
                    num_envs,
                    steps,
                    &config,
                    curry,
                )?,
                "pennies" => run_env(MatchingPennies::default, num_envs, steps, &config, curry)?,
                _ => bail!("Unknown environment: {}", env),
            }
        }
    }

    Ok(())
}

/// Dispatch on `--curry`, which changes the environment type
fn run_env<E, M>(
    make: M,
    num_envs: usize,
    steps: usize,
    config: &VecEnvConfig,
    curry: Option<usize>,
) -> Result<()>
where
    E: MultiAgentEnv + 'static,
    M: Fn() -> E + Copy + Send + 'static,
{
    match curry {
        None => {
            let factories = (0..num_envs).map(|_| move || Ok(make())).collect();
            run_batch(factories, steps, config)
        }
        Some(agent_idx) => {
            let factories = (0..num_envs)
                .map(|_| {
                    move || {
                        let env = make();
                        let action = env
                            .action_space()
                            .get(agent_idx)
                            .map(|space| ArrayD::zeros(IxDyn(&space.shape())))
                            .unwrap_or_else(|| ArrayD::zeros(IxDyn(&[1])));
                        CurryEnv::new(env, ConstantPolicy::new(action), agent_idx)
                    }
                })
                .collect();
            run_batch(factories, steps, config)
        }
    }
}

fn run_batch<E, F>(factories: Vec<F>, steps: usize, config: &VecEnvConfig) -> Result<()>
where
    E: MultiAgentEnv + 'static,
    F: FnOnce() -> multiagent::Result<E> + Send + 'static,
{
    let mut venv = make_vec_multi_env(config, factories)?;
    let num_envs = venv.num_envs();
    let num_agents = venv.num_agents();
    tracing::info!(
        num_envs,
        num_agents,
        steps,
        backend = ?config.backend,
        "Starting run (random policy)"
    );

    let action_space = venv.action_space();
    let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_default());
    let mut totals = vec![0.0f32; num_agents];
    let mut episodes = 0usize;

    venv.reset(None)?;
    for _ in 0..steps {
        let actions = action_space
            .iter()
            .map(|space| (0..num_envs).map(|_| space.sample(&mut rng)).collect())
            .collect();
        let result = venv.step(actions)?;
        for (total, row) in totals.iter_mut().zip(result.rewards.outer_iter()) {
            *total += row.sum();
        }
        episodes += result.dones().iter().filter(|&&done| done).count();
    }
    venv.close();

    let denom = (steps * num_envs).max(1) as f32;
    for (agent, total) in totals.iter().enumerate() {
        println!("agent {}: mean reward {:.3}", agent, total / denom);
    }
    tracing::info!(episodes, "Run complete");
    Ok(())
}

fn list_envs() {
    println!("Available environments:");
    println!();
    println!("  counter    Shared counter (3 agents, Discrete(4), horizon 20)");
    println!("             Rewards reveal agent and environment identity");
    println!();
    println!("  pennies    Matching pennies (2 agents, Discrete(2))");
    println!("             Zero-sum; use --curry to play against a fixed coin");
}
