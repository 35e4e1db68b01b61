//! Keyed view of a multi-agent environment for the vectorized layer.

use super::traits::{check_agent_spaces, check_len};
use super::{EnvInfo, MultiAgentEnv};
use crate::spaces::{tuple_to_dict, tuple_to_dict_space, AgentMap, Dict};
use crate::Result;
use ndarray::ArrayD;

/// Result from a keyed environment step
#[derive(Clone, Debug)]
pub struct KeyedStepResult {
    /// Observations keyed by agent index
    pub observations: AgentMap<ArrayD<f32>>,
    /// Rewards for each agent
    pub rewards: Vec<f32>,
    /// Whether the episode terminated
    pub terminated: bool,
    /// Whether the episode was truncated
    pub truncated: bool,
    /// Additional info
    pub info: EnvInfo,
}

impl KeyedStepResult {
    /// Check if episode is done (terminated or truncated)
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Environment whose spaces and observations are keyed by agent index.
///
/// Actions and rewards stay ordered per agent.
pub trait KeyedEnv: Send {
    fn num_agents(&self) -> usize;

    fn observation_space(&self) -> Dict;

    fn action_space(&self) -> Dict;

    fn reset(&mut self, seed: Option<u64>) -> Result<(AgentMap<ArrayD<f32>>, EnvInfo)>;

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<KeyedStepResult>;

    fn close(&mut self) {}
}

/// Exposes a `MultiAgentEnv` as a `KeyedEnv`
pub struct TupleToDict<E: MultiAgentEnv> {
    env: E,
    observation_space: Dict,
    action_space: Dict,
}

impl<E: MultiAgentEnv> TupleToDict<E> {
    /// Wrap `env`, closing it if its spaces disagree with its agent count
    pub fn new(mut env: E) -> Result<Self> {
        if let Err(e) = check_agent_spaces(&env) {
            env.close();
            return Err(e);
        }
        let observation_space = tuple_to_dict_space(&env.observation_space());
        let action_space = tuple_to_dict_space(&env.action_space());
        Ok(Self {
            env,
            observation_space,
            action_space,
        })
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }
}

impl<E: MultiAgentEnv> KeyedEnv for TupleToDict<E> {
    fn num_agents(&self) -> usize {
        self.env.num_agents()
    }

    fn observation_space(&self) -> Dict {
        self.observation_space.clone()
    }

    fn action_space(&self) -> Dict {
        self.action_space.clone()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(AgentMap<ArrayD<f32>>, EnvInfo)> {
        let (observations, info) = self.env.reset(seed)?;
        Ok((tuple_to_dict(observations), info))
    }

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<KeyedStepResult> {
        check_len("actions", self.env.num_agents(), actions.len())?;
        let result = self.env.step(actions)?;
        Ok(KeyedStepResult {
            observations: tuple_to_dict(result.observations),
            rewards: result.rewards,
            terminated: result.terminated,
            truncated: result.truncated,
            info: result.info,
        })
    }

    fn close(&mut self) {
        self.env.close()
    }
}

/// Wrap a raw environment factory so it yields keyed environments
pub fn wrap_factory<E, F>(factory: F) -> impl FnOnce() -> Result<TupleToDict<E>> + Send
where
    E: MultiAgentEnv,
    F: FnOnce() -> Result<E> + Send,
{
    move || TupleToDict::new(factory()?)
}

/// Wrap every factory of a batch, preserving order
pub fn wrap_factories<E, F>(
    factories: Vec<F>,
) -> Vec<impl FnOnce() -> Result<TupleToDict<E>> + Send>
where
    E: MultiAgentEnv,
    F: FnOnce() -> Result<E> + Send,
{
    factories.into_iter().map(wrap_factory).collect()
}
