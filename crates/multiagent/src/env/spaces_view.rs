//! Spaces of a single agent, for building per-agent policies.

use super::MultiAgentEnv;
use crate::spaces::{DynSpace, Tuple};
use crate::vector::{VecEnvBackend, VecMultiEnv};
use crate::{MultiAgentError, Result};

/// Observation and action space of one agent.
///
/// Carries no environment; use it where only the spaces are needed.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSpaces {
    pub agent_id: usize,
    pub observation_space: DynSpace,
    pub action_space: DynSpace,
    /// Batch size when taken from a vectorized environment
    pub num_envs: Option<usize>,
}

impl AgentSpaces {
    /// Pick agent `agent_id` out of per-agent space tuples
    pub fn from_tuples(observation: &Tuple, action: &Tuple, agent_id: usize) -> Result<Self> {
        match (observation.get(agent_id), action.get(agent_id)) {
            (Some(o), Some(a)) => Ok(Self {
                agent_id,
                observation_space: o.clone(),
                action_space: a.clone(),
                num_envs: None,
            }),
            _ => Err(MultiAgentError::PreconditionViolation(format!(
                "agent {} out of range for {} agents",
                agent_id,
                observation.len().min(action.len())
            ))),
        }
    }

    /// Spaces of agent `agent_id` in `env`
    pub fn of_env<E: MultiAgentEnv + ?Sized>(env: &E, agent_id: usize) -> Result<Self> {
        Self::from_tuples(&env.observation_space(), &env.action_space(), agent_id)
    }

    /// Spaces of agent `agent_id` in a batch, tagged with the batch size
    pub fn of_vec_env<B: VecEnvBackend>(venv: &VecMultiEnv<B>, agent_id: usize) -> Result<Self> {
        venv.agent_spaces(agent_id)
    }

    pub fn with_num_envs(mut self, num_envs: usize) -> Self {
        self.num_envs = Some(num_envs);
        self
    }
}
