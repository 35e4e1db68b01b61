//! Deterministic counting environment.

use multiagent::env::{EnvInfo, MultiAgentEnv, MultiAgentStepResult};
use multiagent::spaces::{Box as BoxSpace, Discrete, Tuple};
use multiagent::{MultiAgentError, Result};
use ndarray::{ArrayD, IxDyn};

/// Every agent watches a shared counter.
///
/// The counter starts at the reset seed (or 0) and advances by one per step.
/// Agent i observes `counter + action_i` and receives `action_i + offset`, so
/// results can be traced back to both the agent and the environment instance.
pub struct Counter {
    num_agents: usize,
    num_actions: usize,
    horizon: u32,
    offset: f32,
    counter: f32,
    tick: u32,
}

impl Counter {
    /// Create a counter with `num_agents` agents, 4 actions and horizon 10
    pub fn new(num_agents: usize) -> Self {
        Self {
            num_agents,
            num_actions: 4,
            horizon: 10,
            offset: 0.0,
            counter: 0.0,
            tick: 0,
        }
    }

    /// Constant added to every reward
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Steps until the episode terminates
    pub fn with_horizon(mut self, horizon: u32) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_num_actions(mut self, num_actions: usize) -> Self {
        self.num_actions = num_actions;
        self
    }

    fn scalar(value: f32) -> ArrayD<f32> {
        ArrayD::from_elem(IxDyn(&[1]), value)
    }
}

impl MultiAgentEnv for Counter {
    fn num_agents(&self) -> usize {
        self.num_agents
    }

    fn observation_space(&self) -> Tuple {
        Tuple::repeat(BoxSpace::unbounded(&[1]), self.num_agents)
    }

    fn action_space(&self) -> Tuple {
        Tuple::repeat(Discrete::new(self.num_actions), self.num_agents)
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<ArrayD<f32>>, EnvInfo)> {
        self.counter = seed.map_or(0.0, |s| s as f32);
        self.tick = 0;
        Ok((vec![Self::scalar(self.counter); self.num_agents], EnvInfo::new()))
    }

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult> {
        if actions.len() != self.num_agents {
            return Err(MultiAgentError::InvalidAction(format!(
                "expected {} actions, got {}",
                self.num_agents,
                actions.len()
            )));
        }
        let space = Discrete::new(self.num_actions);
        let chosen = actions
            .iter()
            .enumerate()
            .map(|(agent, a)| {
                space.decode(a).map(|i| i as f32).ok_or_else(|| {
                    MultiAgentError::InvalidAction(format!(
                        "agent {} chose an action outside Discrete({})",
                        agent, self.num_actions
                    ))
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        self.counter += 1.0;
        self.tick += 1;

        Ok(MultiAgentStepResult {
            observations: chosen.iter().map(|&a| Self::scalar(self.counter + a)).collect(),
            rewards: chosen.iter().map(|&a| a + self.offset).collect(),
            terminated: self.tick >= self.horizon,
            truncated: false,
            info: EnvInfo::new(),
        })
    }

    fn render(&self) -> Option<String> {
        Some(format!("counter={} tick={}/{}", self.counter, self.tick, self.horizon))
    }
}
