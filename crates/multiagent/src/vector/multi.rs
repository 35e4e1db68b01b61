//! Agent-major front end over an environment-major backend.

use super::layout::tuple_transpose;
use super::parallel::Parallel;
use super::serial::Serial;
use super::vecenv::{Backend, VecEnvBackend, VecEnvConfig};
use crate::env::{wrap_factories, AgentSpaces, EnvInfo, MultiAgentEnv, TupleToDict};
use crate::spaces::{dict_to_tuple, dict_to_tuple_space, Tuple};
use crate::{MultiAgentError, Result};
use ndarray::{Array2, ArrayD};

/// Result from stepping a `VecMultiEnv`
#[derive(Clone, Debug)]
pub struct VecMultiStepResult {
    /// One batch per agent, each of shape `(num_envs, ..)`
    pub observations: Vec<ArrayD<f32>>,
    /// Rewards of shape `(num_agents, num_envs)`
    pub rewards: Array2<f32>,
    /// Terminated flags, one per environment
    pub terminated: Vec<bool>,
    /// Truncated flags, one per environment
    pub truncated: Vec<bool>,
    /// Info per environment
    pub infos: Vec<EnvInfo>,
}

impl VecMultiStepResult {
    /// Per-environment done flags (terminated or truncated)
    pub fn dones(&self) -> Vec<bool> {
        self.terminated
            .iter()
            .zip(&self.truncated)
            .map(|(&t, &tr)| t || tr)
            .collect()
    }
}

/// Batch of multi-agent environments seen agent by agent.
///
/// Every value going in or out is a `num_agents`-length sequence whose i'th
/// entry covers agent i in every environment.
pub struct VecMultiEnv<B: VecEnvBackend> {
    backend: B,
    observation_space: Tuple,
    action_space: Tuple,
    seed: Option<u64>,
}

impl<B: VecEnvBackend> VecMultiEnv<B> {
    /// Wrap a keyed backend, closing it if its spaces cannot be ordered
    pub fn new(mut backend: B) -> Result<Self> {
        let spaces = dict_to_tuple_space(&backend.observation_space())
            .and_then(|obs| Ok((obs, dict_to_tuple_space(&backend.action_space())?)));
        match spaces {
            Ok((observation_space, action_space)) => Ok(Self {
                backend,
                observation_space,
                action_space,
                seed: None,
            }),
            Err(e) => {
                backend.close();
                Err(e)
            }
        }
    }

    /// Seed used by the first `reset(None)`
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn num_envs(&self) -> usize {
        self.backend.num_envs()
    }

    pub fn num_agents(&self) -> usize {
        self.backend.num_agents()
    }

    pub fn observation_space(&self) -> Tuple {
        self.observation_space.clone()
    }

    pub fn action_space(&self) -> Tuple {
        self.action_space.clone()
    }

    /// Spaces of one agent, tagged with this batch's size
    pub fn agent_spaces(&self, agent_id: usize) -> Result<AgentSpaces> {
        Ok(
            AgentSpaces::from_tuples(&self.observation_space, &self.action_space, agent_id)?
                .with_num_envs(self.num_envs()),
        )
    }

    /// Reset every environment; returns one observation batch per agent
    pub fn reset(&mut self, seed: Option<u64>) -> Result<Vec<ArrayD<f32>>> {
        let seed = seed.or_else(|| self.seed.take());
        tracing::debug!(?seed, num_envs = self.num_envs(), "Resetting batch");
        let (observations, _) = self.backend.reset(seed)?;
        dict_to_tuple(observations)
    }

    /// Hand over agent-major actions: `actions[agent][env]`
    pub fn step_async(&mut self, actions: Vec<Vec<ArrayD<f32>>>) -> Result<()> {
        if actions.len() != self.num_agents() {
            return Err(MultiAgentError::InvalidAction(format!(
                "expected actions for {} agents, got {}",
                self.num_agents(),
                actions.len()
            )));
        }
        let mut per_env = tuple_transpose(actions)?;
        if per_env.is_empty() {
            per_env = vec![Vec::new(); self.num_envs()];
        }
        self.backend.step_async(per_env)
    }

    /// Collect the pending step
    pub fn step_wait(&mut self) -> Result<VecMultiStepResult> {
        let result = self.backend.step_wait()?;
        Ok(VecMultiStepResult {
            observations: dict_to_tuple(result.observations)?,
            rewards: result.rewards.reversed_axes(),
            terminated: result.terminated,
            truncated: result.truncated,
            infos: result.infos,
        })
    }

    /// Step every environment with agent-major actions
    pub fn step(&mut self, actions: Vec<Vec<ArrayD<f32>>>) -> Result<VecMultiStepResult> {
        self.step_async(actions)?;
        self.step_wait()
    }

    pub fn close(&mut self) {
        self.backend.close()
    }

    /// Get a reference to the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Build a `VecMultiEnv` stepping every environment on the calling thread
pub fn make_serial_vec_multi_env<E, F>(
    factories: Vec<F>,
) -> Result<VecMultiEnv<Serial<TupleToDict<E>>>>
where
    E: MultiAgentEnv,
    F: FnOnce() -> Result<E> + Send,
{
    VecMultiEnv::new(Serial::new(wrap_factories(factories))?)
}

/// Build a `VecMultiEnv` with one worker thread per environment
pub fn make_parallel_vec_multi_env<E, F>(factories: Vec<F>) -> Result<VecMultiEnv<Parallel>>
where
    E: MultiAgentEnv + 'static,
    F: FnOnce() -> Result<E> + Send + 'static,
{
    VecMultiEnv::new(Parallel::new(wrap_factories(factories))?)
}

/// Build a `VecMultiEnv` with the backend chosen by `config`
pub fn make_vec_multi_env<E, F>(
    config: &VecEnvConfig,
    factories: Vec<F>,
) -> Result<VecMultiEnv<std::boxed::Box<dyn VecEnvBackend>>>
where
    E: MultiAgentEnv + 'static,
    F: FnOnce() -> Result<E> + Send + 'static,
{
    let backend: std::boxed::Box<dyn VecEnvBackend> = match config.backend {
        Backend::Serial => std::boxed::Box::new(Serial::new(wrap_factories(factories))?),
        Backend::Parallel => std::boxed::Box::new(Parallel::new(wrap_factories(factories))?),
    };
    tracing::debug!(backend = ?config.backend, seed = ?config.seed, "Built vectorized multi-agent env");
    Ok(VecMultiEnv::new(backend)?.with_seed(config.seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MultiAgentStepResult;
    use crate::spaces::{Box as BoxSpace, Discrete, DynSpace};
    use ndarray::IxDyn;

    /// Agent i observes `offset + 10 * i + t`; reward is `offset + i + action`
    struct Tagged {
        num_agents: usize,
        offset: f32,
        t: f32,
        horizon: f32,
    }

    impl Tagged {
        fn new(num_agents: usize, offset: f32) -> Self {
            Self {
                num_agents,
                offset,
                t: 0.0,
                horizon: 100.0,
            }
        }

        fn observe(&self) -> Vec<ArrayD<f32>> {
            (0..self.num_agents)
                .map(|i| ArrayD::from_elem(IxDyn(&[1]), self.offset + 10.0 * i as f32 + self.t))
                .collect()
        }
    }

    impl MultiAgentEnv for Tagged {
        fn num_agents(&self) -> usize {
            self.num_agents
        }
        fn observation_space(&self) -> Tuple {
            Tuple::repeat(BoxSpace::unbounded(&[1]), self.num_agents)
        }
        fn action_space(&self) -> Tuple {
            Tuple::repeat(Discrete::new(4), self.num_agents)
        }
        fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<ArrayD<f32>>, EnvInfo)> {
            self.t = seed.map_or(0.0, |s| s as f32);
            Ok((self.observe(), EnvInfo::new()))
        }
        fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult> {
            self.t += 1.0;
            Ok(MultiAgentStepResult {
                observations: self.observe(),
                rewards: actions
                    .iter()
                    .enumerate()
                    .map(|(i, a)| self.offset + i as f32 + a[0])
                    .collect(),
                terminated: self.t >= self.horizon,
                truncated: false,
                info: EnvInfo::new(),
            })
        }
    }

    fn factories(n: usize, agents: usize) -> Vec<impl FnOnce() -> Result<Tagged> + Send + 'static> {
        (0..n)
            .map(move |e| move || Ok(Tagged::new(agents, 100.0 * e as f32)))
            .collect()
    }

    fn actions(agents: usize, envs: usize, value: f32) -> Vec<Vec<ArrayD<f32>>> {
        vec![vec![ArrayD::from_elem(IxDyn(&[1]), value); envs]; agents]
    }

    #[test]
    fn test_reset_is_agent_major_and_seeded_per_env() {
        let mut venv = make_serial_vec_multi_env(factories(3, 2)).unwrap();
        assert_eq!((venv.num_envs(), venv.num_agents()), (3, 2));

        let obs = venv.reset(Some(5)).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].shape(), &[3, 1]);
        // env 2, agent 1, seed 5 + 2
        assert_eq!(obs[1][[2, 0]], 200.0 + 10.0 + 7.0);
    }

    #[test]
    fn test_step_rewards_are_agent_by_env() {
        let mut venv = make_serial_vec_multi_env(factories(3, 2)).unwrap();
        venv.reset(None).unwrap();
        let result = venv.step(actions(2, 3, 1.0)).unwrap();
        assert_eq!(result.rewards.shape(), &[2, 3]);
        assert_eq!(result.rewards[[1, 2]], 200.0 + 1.0 + 1.0);
        assert_eq!(result.rewards[[0, 0]], 1.0);
        assert_eq!(result.dones(), vec![false; 3]);
    }

    #[test]
    fn test_config_seed_applies_to_first_reset() {
        let config = VecEnvConfig::new(Backend::Serial).with_seed(4);
        let mut venv = make_vec_multi_env(&config, factories(2, 1)).unwrap();
        assert_eq!(venv.reset(None).unwrap()[0][[1, 0]], 100.0 + 5.0);
        assert_eq!(venv.reset(None).unwrap()[0][[1, 0]], 100.0);
    }

    #[test]
    fn test_explicit_seed_keeps_config_seed_for_later_reset() {
        let config = VecEnvConfig::new(Backend::Serial).with_seed(7);
        let mut venv = make_vec_multi_env(&config, factories(1, 1)).unwrap();
        assert_eq!(venv.reset(Some(3)).unwrap()[0][[0, 0]], 3.0);
        assert_eq!(venv.reset(None).unwrap()[0][[0, 0]], 7.0);
        assert_eq!(venv.reset(None).unwrap()[0][[0, 0]], 0.0);
    }

    #[test]
    fn test_wrong_agent_count_in_actions() {
        let mut venv = make_serial_vec_multi_env(factories(2, 2)).unwrap();
        venv.reset(None).unwrap();
        assert!(matches!(
            venv.step(actions(3, 2, 0.0)),
            Err(MultiAgentError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_agent_spaces_carry_batch_size() {
        let venv = make_serial_vec_multi_env(factories(4, 2)).unwrap();
        let spaces = venv.agent_spaces(1).unwrap();
        assert_eq!(spaces.num_envs, Some(4));
        assert_eq!(spaces.action_space, DynSpace::Discrete(Discrete::new(4)));
        assert!(venv.agent_spaces(2).is_err());
    }

    #[test]
    fn test_auto_reset_marks_terminal() {
        let make = |e: usize| {
            move || {
                let mut env = Tagged::new(1, e as f32);
                env.horizon = 2.0;
                Ok::<_, MultiAgentError>(env)
            }
        };
        let mut venv = make_serial_vec_multi_env(vec![make(0), make(1)]).unwrap();
        venv.reset(None).unwrap();

        let first = venv.step(actions(1, 2, 0.0)).unwrap();
        assert!(first.infos.iter().all(|info| info.get("terminal").is_none()));

        let second = venv.step(actions(1, 2, 0.0)).unwrap();
        assert_eq!(second.terminated, vec![true, true]);
        assert_eq!(second.infos[0].get("terminal"), Some(1.0));
        // observation comes from the reset, not the terminal step
        assert_eq!(second.observations[0][[1, 0]], 1.0);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let mut serial = make_serial_vec_multi_env(factories(4, 3)).unwrap();
        let mut parallel = make_parallel_vec_multi_env(factories(4, 3)).unwrap();
        assert_eq!(serial.reset(Some(1)).unwrap(), parallel.reset(Some(1)).unwrap());
        for step in 0..5 {
            let a = serial.step(actions(3, 4, step as f32)).unwrap();
            let b = parallel.step(actions(3, 4, step as f32)).unwrap();
            assert_eq!(a.observations, b.observations);
            assert_eq!(a.rewards, b.rewards);
        }
        parallel.close();
        parallel.close();
    }
}
