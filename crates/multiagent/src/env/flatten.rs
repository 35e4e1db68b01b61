//! Single-agent views of multi-agent environments.

use super::{Env, EnvInfo, MultiAgentEnv, StepResult};
use crate::spaces::{flatten_space, DynSpace, FlatSpace};
use crate::{MultiAgentError, Result};
use ndarray::ArrayD;

/// Reduces per-agent rewards to a single reward
pub type RewardAgg = fn(&[f32]) -> f32;

/// Default reward aggregation: the sum over agents
pub fn sum_rewards(rewards: &[f32]) -> f32 {
    rewards.iter().sum()
}

fn take_single<T>(values: Vec<T>) -> Result<T> {
    let actual = values.len();
    let mut iter = values.into_iter();
    match (iter.next(), iter.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(MultiAgentError::AgentCountMismatch {
            expected: 1,
            actual,
        }),
    }
}

/// Adapts a one-agent `MultiAgentEnv` into a plain `Env`.
///
/// Typically applied after currying away every other agent.
pub struct FlattenSingletonEnv<E: MultiAgentEnv> {
    env: E,
    observation_space: DynSpace,
    action_space: DynSpace,
}

impl<E: MultiAgentEnv> FlattenSingletonEnv<E> {
    pub fn new(env: E) -> Result<Self> {
        if env.num_agents() != 1 {
            return Err(MultiAgentError::AgentCountMismatch {
                expected: 1,
                actual: env.num_agents(),
            });
        }
        let observation_space = take_single(env.observation_space().spaces)?;
        let action_space = take_single(env.action_space().spaces)?;
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

impl<E: MultiAgentEnv> Env for FlattenSingletonEnv<E> {
    fn observation_space(&self) -> DynSpace {
        self.observation_space.clone()
    }

    fn action_space(&self) -> DynSpace {
        self.action_space.clone()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        let (observations, info) = self.env.reset(seed)?;
        Ok((take_single(observations)?, info))
    }

    fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult> {
        let result = self.env.step(std::slice::from_ref(action))?;
        Ok(StepResult {
            observation: take_single(result.observations)?,
            reward: take_single(result.rewards)?,
            terminated: result.terminated,
            truncated: result.truncated,
            info: result.info,
        })
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }
}

/// Centralized single-agent view of a `MultiAgentEnv`.
///
/// Actions are unflattened into per-agent actions, observations flattened
/// into one joint observation and rewards reduced by a `RewardAgg`.
pub struct FlattenMultiEnv<E: MultiAgentEnv> {
    env: E,
    observation: FlatSpace,
    action: FlatSpace,
    reward_agg: RewardAgg,
}

impl<E: MultiAgentEnv> FlattenMultiEnv<E> {
    /// Wrap `env`, summing rewards over agents
    pub fn new(env: E) -> Result<Self> {
        let observation = flatten_space(&env.observation_space())?;
        let action = flatten_space(&env.action_space())?;
        Ok(Self {
            env,
            observation,
            action,
            reward_agg: sum_rewards,
        })
    }

    /// Use a different reward aggregation
    pub fn with_reward_agg(mut self, reward_agg: RewardAgg) -> Self {
        self.reward_agg = reward_agg;
        self
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }
}

impl<E: MultiAgentEnv> Env for FlattenMultiEnv<E> {
    fn observation_space(&self) -> DynSpace {
        self.observation.space().clone()
    }

    fn action_space(&self) -> DynSpace {
        self.action.space().clone()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(ArrayD<f32>, EnvInfo)> {
        let (observations, info) = self.env.reset(seed)?;
        Ok((self.observation.flatten(&observations)?, info))
    }

    fn step(&mut self, action: &ArrayD<f32>) -> Result<StepResult> {
        let actions = self.action.unflatten(action)?;
        let result = self.env.step(&actions)?;
        Ok(StepResult {
            observation: self.observation.flatten(&result.observations)?,
            reward: (self.reward_agg)(&result.rewards),
            terminated: result.terminated,
            truncated: result.truncated,
            info: result.info,
        })
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn close(&mut self) {
        self.env.close()
    }
}
