//! Core environment trait definitions.

use crate::spaces::{DynSpace, Tuple};
use crate::{MultiAgentError, Result};
use ndarray::ArrayD;

/// Information returned from environment steps
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvInfo {
    /// Episode return (if done)
    pub episode_return: Option<f32>,
    /// Episode length (if done)
    pub episode_length: Option<f32>,
    /// Custom metrics (kept minimal for performance)
    pub extra: smallvec::SmallVec<[(&'static str, f32); 4]>,
}

impl EnvInfo {
    /// Create empty info
    pub fn new() -> Self {
        Self::default()
    }

    /// Add episode stats
    pub fn with_episode_stats(mut self, ret: f32, len: u32) -> Self {
        self.episode_return = Some(ret);
        self.episode_length = Some(len as f32);
        self
    }

    /// Add a custom metric (use rarely)
    pub fn with_extra(mut self, key: &'static str, value: f32) -> Self {
        self.extra.push((key, value));
        self
    }

    /// Get a value by key (including defaults)
    pub fn get(&self, key: &str) -> Option<f32> {
        match key {
            "episode_return" => self.episode_return,
            "episode_length" => self.episode_length,
            _ => self.extra.iter().find(|(k, _)| k == &key).map(|(_, v)| *v),
        }
    }
}

/// Result from a single-agent environment step
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Observation after the step
    pub observation: ArrayD<f32>,
    /// Reward received
    pub reward: f32,
    /// Whether episode terminated (goal reached, failure, etc.)
    pub terminated: bool,
    /// Whether episode truncated (time limit, etc.)
    pub truncated: bool,
    /// Additional info
    pub info: EnvInfo,
}

impl StepResult {
    /// Check if episode is done (terminated or truncated)
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Result from a multi-agent environment step, indexed by agent
#[derive(Clone, Debug)]
pub struct MultiAgentStepResult {
    /// Observations for each agent
    pub observations: Vec<ArrayD<f32>>,
    /// Rewards for each agent
    pub rewards: Vec<f32>,
    /// Whether the episode terminated
    pub terminated: bool,
    /// Whether the episode was truncated
    pub truncated: bool,
    /// Additional info
    pub info: EnvInfo,
}

impl MultiAgentStepResult {
    /// Check if episode is done (terminated or truncated)
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Single-agent environment interface.
///
/// # Example
///
/// ```rust,ignore
/// use multiagent::env::{Env, EnvInfo, StepResult};
/// use multiagent::spaces::{Box as BoxSpace, Discrete, DynSpace};
///
/// struct MyEnv {
///     state: f32,
/// }
///
/// impl Env for MyEnv {
///     fn observation_space(&self) -> DynSpace {
///         DynSpace::Box(BoxSpace::uniform(&[1], -1.0, 1.0))
///     }
///
///     fn action_space(&self) -> DynSpace {
///         DynSpace::Discrete(Discrete::new(2))
///     }
///
///     fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
///         self.state = 0.0;
///         Ok((ArrayD::from_elem(IxDyn(&[1]), self.state), EnvInfo::new()))
///     }
///
///     fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult> {
///         // ... implement step logic
///     }
/// }
/// ```
pub trait Env: Send {
    /// Get the observation space
    fn observation_space(&self) -> DynSpace;

    /// Get the action space
    fn action_space(&self) -> DynSpace;

    /// Reset the environment to initial state
    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)>;

    /// Take a single step in the environment
    fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult>;

    /// Optional: Render the environment
    fn render(&self) -> Option<String> {
        None
    }

    /// Optional: Close the environment and free resources
    fn close(&mut self) {}
}

/// Environment producing and consuming one value per agent per timestep.
///
/// `observation_space` and `action_space` are tuples whose i'th entry belongs
/// to agent i; both have exactly `num_agents` entries.
pub trait MultiAgentEnv: Send {
    /// Number of agents
    fn num_agents(&self) -> usize;

    /// Per-agent observation spaces
    fn observation_space(&self) -> Tuple;

    /// Per-agent action spaces
    fn action_space(&self) -> Tuple;

    /// Reset, returning one observation per agent
    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<ArrayD<f32>>, EnvInfo)>;

    /// Step with one action per agent
    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult>;

    /// Optional: Render the environment
    fn render(&self) -> Option<String> {
        None
    }

    /// Optional: Close the environment and free resources
    fn close(&mut self) {}
}

impl<E: MultiAgentEnv + ?Sized> MultiAgentEnv for std::boxed::Box<E> {
    fn num_agents(&self) -> usize {
        (**self).num_agents()
    }

    fn observation_space(&self) -> Tuple {
        (**self).observation_space()
    }

    fn action_space(&self) -> Tuple {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<ArrayD<f32>>, EnvInfo)> {
        (**self).reset(seed)
    }

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult> {
        (**self).step(actions)
    }

    fn render(&self) -> Option<String> {
        (**self).render()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Verify that `num_agents` agrees with both space tuples
pub fn check_agent_spaces<E: MultiAgentEnv + ?Sized>(env: &E) -> Result<()> {
    let num_agents = env.num_agents();
    for len in [env.observation_space().len(), env.action_space().len()] {
        if len != num_agents {
            return Err(MultiAgentError::AgentCountMismatch {
                expected: num_agents,
                actual: len,
            });
        }
    }
    Ok(())
}

/// Error unless `len` matches the current agent count
pub(crate) fn check_len(what: &str, expected: usize, len: usize) -> Result<()> {
    if len != expected {
        return Err(MultiAgentError::InvalidAction(format!(
            "expected {} {}, got {}",
            expected, what, len
        )));
    }
    Ok(())
}
