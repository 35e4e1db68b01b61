//! Serial (sequential) vectorization backend.
//!
//! Runs environments one at a time in a single thread.
//! Useful for debugging and small-scale experiments.

use super::vecenv::{
    check_num_envs, collate_observations, collate_steps, step_with_auto_reset, EnvSpec,
    KeyedVecResult, VecEnvBackend,
};
use crate::env::{EnvInfo, KeyedEnv};
use crate::spaces::{AgentMap, Dict};
use crate::{MultiAgentError, Result};
use ndarray::ArrayD;

/// Serial vectorization backend
pub struct Serial<E: KeyedEnv> {
    /// Created environments, in factory order
    envs: Vec<E>,
    /// Spaces and agent count shared by every environment
    spec: EnvSpec,
    /// Actions handed over by `step_async`
    pending: Option<Vec<Vec<ArrayD<f32>>>>,
    closed: bool,
}

impl<E: KeyedEnv> Serial<E> {
    /// Build one environment per factory.
    ///
    /// If a factory fails or disagrees with the first environment's agent
    /// count, every environment built so far is closed before returning.
    pub fn new<F>(factories: Vec<F>) -> Result<Self>
    where
        F: FnOnce() -> Result<E>,
    {
        if factories.is_empty() {
            return Err(MultiAgentError::PreconditionViolation(
                "at least one environment factory is required".into(),
            ));
        }

        let mut envs: Vec<E> = Vec::with_capacity(factories.len());
        let mut spec: Option<EnvSpec> = None;
        for factory in factories {
            let checked = factory().and_then(|mut env| {
                let env_spec = EnvSpec::of(&env);
                let consistent = spec.as_ref().map_or(Ok(()), |first| first.check(&env_spec));
                match consistent {
                    Ok(()) => Ok((env, env_spec)),
                    Err(e) => {
                        env.close();
                        Err(e)
                    }
                }
            });
            match checked {
                Ok((env, env_spec)) => {
                    spec.get_or_insert(env_spec);
                    envs.push(env);
                }
                Err(e) => {
                    tracing::warn!(built = envs.len(), error = %e, "Serial backend construction failed");
                    for env in &mut envs {
                        env.close();
                    }
                    return Err(e);
                }
            }
        }

        let spec = spec.ok_or_else(|| {
            MultiAgentError::PreconditionViolation("no environment was built".into())
        })?;
        tracing::debug!(
            num_envs = envs.len(),
            num_agents = spec.num_agents,
            "Created serial backend"
        );
        Ok(Self {
            envs,
            spec,
            pending: None,
            closed: false,
        })
    }

    /// Environments owned by this backend
    pub fn envs(&self) -> &[E] {
        &self.envs
    }
}

impl<E: KeyedEnv> VecEnvBackend for Serial<E> {
    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn num_agents(&self) -> usize {
        self.spec.num_agents
    }

    fn observation_space(&self) -> Dict {
        self.spec.observation_space.clone()
    }

    fn action_space(&self) -> Dict {
        self.spec.action_space.clone()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(AgentMap<ArrayD<f32>>, Vec<EnvInfo>)> {
        self.pending = None;
        let results: Vec<_> = self
            .envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| env.reset(seed.map(|s| s.wrapping_add(i as u64))))
            .collect();
        let (observations, infos): (Vec<_>, Vec<_>) =
            results.into_iter().collect::<Result<Vec<_>>>()?.into_iter().unzip();
        Ok((collate_observations(observations)?, infos))
    }

    fn step_async(&mut self, actions: Vec<Vec<ArrayD<f32>>>) -> Result<()> {
        if self.pending.is_some() {
            return Err(MultiAgentError::PreconditionViolation(
                "step_async called twice without step_wait".into(),
            ));
        }
        check_num_envs(self.envs.len(), actions.len())?;
        self.pending = Some(actions);
        Ok(())
    }

    fn step_wait(&mut self) -> Result<KeyedVecResult> {
        let actions = self.pending.take().ok_or_else(|| {
            MultiAgentError::PreconditionViolation("step_wait called without step_async".into())
        })?;
        let results: Vec<_> = self
            .envs
            .iter_mut()
            .zip(actions)
            .map(|(env, env_actions)| step_with_auto_reset(env, &env_actions))
            .collect();
        collate_steps(results.into_iter().collect::<Result<_>>()?, self.spec.num_agents)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for env in &mut self.envs {
            env.close();
        }
        tracing::debug!(num_envs = self.envs.len(), "Closed serial backend");
    }
}

impl<E: KeyedEnv> Drop for Serial<E> {
    fn drop(&mut self) {
        self.close();
    }
}
