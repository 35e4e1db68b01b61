//! Vectorized environment abstraction.

use crate::env::{EnvInfo, KeyedEnv, KeyedStepResult};
use crate::spaces::{AgentMap, Dict};
use crate::vector::layout::stack_batch;
use crate::{MultiAgentError, Result};
use ndarray::{Array2, ArrayD};
use serde::{Deserialize, Serialize};

/// Execution strategy for a batch of environments
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Every environment stepped in turn on the calling thread
    #[default]
    Serial,
    /// One worker thread per environment
    Parallel,
}

/// Configuration for vectorized environments
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VecEnvConfig {
    /// Execution strategy
    pub backend: Backend,
    /// Seed base for the first reset; environment i gets `seed + i`
    pub seed: Option<u64>,
}

impl VecEnvConfig {
    /// Create a new config with the given backend
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the backend
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

/// Result from stepping all environments, keyed by agent
#[derive(Clone, Debug)]
pub struct KeyedVecResult {
    /// Per-agent observations stacked over environments: `(num_envs, ..)`
    pub observations: AgentMap<ArrayD<f32>>,
    /// Rewards of shape `(num_envs, num_agents)`
    pub rewards: Array2<f32>,
    /// Terminated flags
    pub terminated: Vec<bool>,
    /// Truncated flags
    pub truncated: Vec<bool>,
    /// Info dictionaries
    pub infos: Vec<EnvInfo>,
}

/// Trait for vectorized environment backends.
///
/// Backends are environment-major: actions arrive as one per-agent action
/// list per environment, in factory order, and results come back in that
/// same order regardless of how environments are scheduled.
pub trait VecEnvBackend: Send {
    /// Get the number of environments
    fn num_envs(&self) -> usize;

    /// Number of agents in every environment
    fn num_agents(&self) -> usize;

    /// Get the observation space (single env)
    fn observation_space(&self) -> Dict;

    /// Get the action space (single env)
    fn action_space(&self) -> Dict;

    /// Reset all environments
    fn reset(&mut self, seed: Option<u64>) -> Result<(AgentMap<ArrayD<f32>>, Vec<EnvInfo>)>;

    /// Hand one action list per environment to the backend
    fn step_async(&mut self, actions: Vec<Vec<ArrayD<f32>>>) -> Result<()>;

    /// Collect the results of the pending `step_async`
    fn step_wait(&mut self) -> Result<KeyedVecResult>;

    /// Close all environments
    fn close(&mut self);
}

impl<B: VecEnvBackend + ?Sized> VecEnvBackend for std::boxed::Box<B> {
    fn num_envs(&self) -> usize {
        (**self).num_envs()
    }

    fn num_agents(&self) -> usize {
        (**self).num_agents()
    }

    fn observation_space(&self) -> Dict {
        (**self).observation_space()
    }

    fn action_space(&self) -> Dict {
        (**self).action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(AgentMap<ArrayD<f32>>, Vec<EnvInfo>)> {
        (**self).reset(seed)
    }

    fn step_async(&mut self, actions: Vec<Vec<ArrayD<f32>>>) -> Result<()> {
        (**self).step_async(actions)
    }

    fn step_wait(&mut self) -> Result<KeyedVecResult> {
        (**self).step_wait()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Step one environment, resetting it in place when the episode ends.
///
/// The reset observation replaces the terminal one and the info is tagged
/// with `terminal = 1.0`.
pub(crate) fn step_with_auto_reset<E: KeyedEnv + ?Sized>(
    env: &mut E,
    actions: &[ArrayD<f32>],
) -> Result<KeyedStepResult> {
    let mut result = env.step(actions)?;
    if result.done() {
        let (observations, _) = env.reset(None)?;
        result.observations = observations;
        result.info = result.info.with_extra("terminal", 1.0);
    }
    Ok(result)
}

/// Spaces and agent count reported by a freshly built environment
#[derive(Clone, Debug)]
pub(crate) struct EnvSpec {
    pub num_agents: usize,
    pub observation_space: Dict,
    pub action_space: Dict,
}

impl EnvSpec {
    pub fn of<E: KeyedEnv + ?Sized>(env: &E) -> Self {
        Self {
            num_agents: env.num_agents(),
            observation_space: env.observation_space(),
            action_space: env.action_space(),
        }
    }

    /// Error unless `other` has the same agent count as this spec
    pub fn check(&self, other: &EnvSpec) -> Result<()> {
        if other.num_agents != self.num_agents {
            return Err(MultiAgentError::AgentCountMismatch {
                expected: self.num_agents,
                actual: other.num_agents,
            });
        }
        Ok(())
    }
}

/// Error unless one action list was given per environment
pub(crate) fn check_num_envs(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(MultiAgentError::InvalidAction(format!(
            "expected actions for {} environments, got {}",
            expected, actual
        )));
    }
    Ok(())
}

/// Stack per-environment keyed observations into per-agent batches
pub(crate) fn collate_observations(
    mut per_env: Vec<AgentMap<ArrayD<f32>>>,
) -> Result<AgentMap<ArrayD<f32>>> {
    let keys: Vec<usize> = per_env
        .first()
        .map(|m| m.keys().copied().collect())
        .unwrap_or_default();
    if let Some(m) = per_env.iter().find(|m| m.len() != keys.len()) {
        return Err(MultiAgentError::AgentCountMismatch {
            expected: keys.len(),
            actual: m.len(),
        });
    }
    let mut out = AgentMap::new();
    for key in keys {
        let values = per_env
            .iter_mut()
            .map(|m| m.remove(&key).ok_or(MultiAgentError::MissingKey(key)))
            .collect::<Result<Vec<_>>>()?;
        out.insert(key, stack_batch(&values)?);
    }
    Ok(out)
}

/// Combine per-environment step results in environment order
pub(crate) fn collate_steps(
    results: Vec<KeyedStepResult>,
    num_agents: usize,
) -> Result<KeyedVecResult> {
    let num_envs = results.len();
    let mut rewards = Vec::with_capacity(num_envs * num_agents);
    let mut terminated = Vec::with_capacity(num_envs);
    let mut truncated = Vec::with_capacity(num_envs);
    let mut infos = Vec::with_capacity(num_envs);
    let mut observations = Vec::with_capacity(num_envs);

    for result in results {
        if result.rewards.len() != num_agents {
            return Err(MultiAgentError::AgentCountMismatch {
                expected: num_agents,
                actual: result.rewards.len(),
            });
        }
        rewards.extend(result.rewards);
        terminated.push(result.terminated);
        truncated.push(result.truncated);
        infos.push(result.info);
        observations.push(result.observations);
    }

    let rewards = Array2::from_shape_vec((num_envs, num_agents), rewards).map_err(|_| {
        MultiAgentError::ShapeMismatch {
            expected: vec![num_envs, num_agents],
            actual: vec![terminated.len()],
        }
    })?;

    Ok(KeyedVecResult {
        observations: collate_observations(observations)?,
        rewards,
        terminated,
        truncated,
        infos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn keyed(values: &[f32]) -> AgentMap<ArrayD<f32>> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i, ArrayD::from_elem(IxDyn(&[1]), v)))
            .collect()
    }

    #[test]
    fn test_config_defaults_and_builders() {
        let config = VecEnvConfig::default();
        assert_eq!(config.backend, Backend::Serial);
        assert_eq!(config.seed, None);

        let config = VecEnvConfig::new(Backend::Parallel).with_seed(3);
        assert_eq!(config.backend, Backend::Parallel);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.with_backend(Backend::Serial).backend, Backend::Serial);
    }

    #[test]
    fn test_config_serde() {
        let config: VecEnvConfig = serde_json::from_str(r#"{"backend": "parallel"}"#).unwrap();
        assert_eq!(config, VecEnvConfig::new(Backend::Parallel));

        let json = serde_json::to_string(&VecEnvConfig::default().with_seed(7)).unwrap();
        assert_eq!(json, r#"{"backend":"serial","seed":7}"#);
    }

    #[test]
    fn test_collate_steps_orders_by_env() {
        let results = (0..3)
            .map(|e| KeyedStepResult {
                observations: keyed(&[e as f32, 10.0 + e as f32]),
                rewards: vec![e as f32, 100.0 + e as f32],
                terminated: e == 1,
                truncated: false,
                info: EnvInfo::new(),
            })
            .collect();

        let out = collate_steps(results, 2).unwrap();
        assert_eq!(out.rewards.shape(), &[3, 2]);
        assert_eq!(out.rewards[[2, 1]], 102.0);
        assert_eq!(out.terminated, vec![false, true, false]);
        assert_eq!(out.observations[&1].shape(), &[3, 1]);
        assert_eq!(out.observations[&1][[2, 0]], 12.0);
    }

    #[test]
    fn test_collate_missing_key() {
        let mut second = keyed(&[1.0, 2.0]);
        let moved = second.remove(&1).unwrap();
        second.insert(2, moved);
        let err = collate_observations(vec![keyed(&[1.0, 2.0]), second]);
        assert!(matches!(err, Err(MultiAgentError::MissingKey(1))));
    }

    #[test]
    fn test_collate_rejects_extra_agent_in_later_env() {
        let err = collate_observations(vec![keyed(&[1.0]), keyed(&[1.0, 2.0])]);
        assert!(matches!(
            err,
            Err(MultiAgentError::AgentCountMismatch {
                expected: 1,
                actual: 2
            })
        ));

        let mut short = keyed(&[1.0, 2.0]);
        short.remove(&1);
        let err = collate_observations(vec![keyed(&[1.0, 2.0]), short]);
        assert!(matches!(
            err,
            Err(MultiAgentError::AgentCountMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_collate_wrong_reward_count() {
        let results = vec![KeyedStepResult {
            observations: keyed(&[0.0]),
            rewards: vec![0.0, 1.0],
            terminated: false,
            truncated: false,
            info: EnvInfo::new(),
        }];
        assert!(matches!(
            collate_steps(results, 1),
            Err(MultiAgentError::AgentCountMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }
}
