//! Fixing one agent of a multi-agent environment to a policy.

use super::traits::{check_agent_spaces, check_len};
use super::{EnvInfo, MultiAgentEnv, MultiAgentStepResult};
use crate::spaces::Tuple;
use crate::{MultiAgentError, Result};
use ndarray::ArrayD;

/// Policy driving a curried agent: last observation in, action out.
pub trait FixedPolicy: Send {
    /// Choose an action for the given observation
    fn get_action(&mut self, observation: &ArrayD<f32>) -> ArrayD<f32>;

    /// Called whenever the curried environment is reset
    fn reset(&mut self) {}
}

impl<F> FixedPolicy for F
where
    F: FnMut(&ArrayD<f32>) -> ArrayD<f32> + Send,
{
    fn get_action(&mut self, observation: &ArrayD<f32>) -> ArrayD<f32> {
        self(observation)
    }
}

/// Policy that always plays the same action
#[derive(Clone, Debug)]
pub struct ConstantPolicy {
    action: ArrayD<f32>,
}

impl ConstantPolicy {
    pub fn new(action: ArrayD<f32>) -> Self {
        Self { action }
    }
}

impl FixedPolicy for ConstantPolicy {
    fn get_action(&mut self, _observation: &ArrayD<f32>) -> ArrayD<f32> {
        self.action.clone()
    }
}

/// State of the fixed agent
#[derive(Clone, Debug)]
enum CurryState {
    /// Constructed, not yet reset
    Idle,
    /// Holds what the fixed agent saw last
    Ready {
        last_observation: ArrayD<f32>,
        last_reward: Option<f32>,
    },
}

/// Substitutes a fixed policy for one agent of a `MultiAgentEnv`.
///
/// The result is a `MultiAgentEnv` with one agent fewer. Agents after the
/// fixed index are renumbered down by one.
pub struct CurryEnv<E: MultiAgentEnv, P: FixedPolicy> {
    env: E,
    policy: P,
    agent_idx: usize,
    num_agents: usize,
    observation_space: Tuple,
    action_space: Tuple,
    state: CurryState,
}

impl<E: MultiAgentEnv, P: FixedPolicy> CurryEnv<E, P> {
    /// Fix agent `agent_idx` of `env` to `policy`.
    ///
    /// Currying the last remaining agent is allowed and yields a zero-agent
    /// environment; currying a zero-agent environment is not.
    pub fn new(env: E, policy: P, agent_idx: usize) -> Result<Self> {
        check_agent_spaces(&env)?;
        let inner_agents = env.num_agents();
        if inner_agents == 0 {
            return Err(MultiAgentError::PreconditionViolation(
                "cannot curry an environment with no agents".into(),
            ));
        }
        if agent_idx >= inner_agents {
            return Err(MultiAgentError::PreconditionViolation(format!(
                "agent index {} out of range for {} agents",
                agent_idx, inner_agents
            )));
        }

        let observation_space = env.observation_space().without(agent_idx);
        let action_space = env.action_space().without(agent_idx);
        tracing::debug!(agent_idx, remaining = inner_agents - 1, "Curried agent");

        Ok(Self {
            env,
            policy,
            agent_idx,
            num_agents: inner_agents - 1,
            observation_space,
            action_space,
            state: CurryState::Idle,
        })
    }

    /// Index of the fixed agent in the wrapped environment
    pub fn fixed_agent(&self) -> usize {
        self.agent_idx
    }

    /// Last observation seen by the fixed agent
    pub fn last_observation(&self) -> Option<&ArrayD<f32>> {
        match &self.state {
            CurryState::Ready {
                last_observation, ..
            } => Some(last_observation),
            CurryState::Idle => None,
        }
    }

    /// Last reward received by the fixed agent (none until the first step)
    pub fn last_reward(&self) -> Option<f32> {
        match &self.state {
            CurryState::Ready { last_reward, .. } => *last_reward,
            CurryState::Idle => None,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Unwrap into the inner environment and policy
    pub fn into_inner(self) -> (E, P) {
        (self.env, self.policy)
    }

    fn pop_fixed<T>(&self, values: &mut Vec<T>) -> Result<T> {
        let expected = self.num_agents + 1;
        if values.len() != expected {
            return Err(MultiAgentError::AgentCountMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(values.remove(self.agent_idx))
    }
}

impl<E: MultiAgentEnv, P: FixedPolicy> MultiAgentEnv for CurryEnv<E, P> {
    fn num_agents(&self) -> usize {
        self.num_agents
    }

    fn observation_space(&self) -> Tuple {
        self.observation_space.clone()
    }

    fn action_space(&self) -> Tuple {
        self.action_space.clone()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<ArrayD<f32>>, EnvInfo)> {
        let (mut observations, info) = self.env.reset(seed)?;
        let last_observation = self.pop_fixed(&mut observations)?;
        self.policy.reset();
        self.state = CurryState::Ready {
            last_observation,
            last_reward: None,
        };
        Ok((observations, info))
    }

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult> {
        check_len("actions", self.num_agents, actions.len())?;
        let fixed_action = match &self.state {
            CurryState::Ready {
                last_observation, ..
            } => self.policy.get_action(last_observation),
            CurryState::Idle => {
                return Err(MultiAgentError::PreconditionViolation(
                    "step called before reset".into(),
                ))
            }
        };

        let mut full_actions = Vec::with_capacity(self.num_agents + 1);
        full_actions.extend_from_slice(&actions[..self.agent_idx]);
        full_actions.push(fixed_action);
        full_actions.extend_from_slice(&actions[self.agent_idx..]);

        let mut result = self.env.step(&full_actions)?;
        let last_observation = self.pop_fixed(&mut result.observations)?;
        let last_reward = self.pop_fixed(&mut result.rewards)?;
        self.state = CurryState::Ready {
            last_observation,
            last_reward: Some(last_reward),
        };
        Ok(result)
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }
}
