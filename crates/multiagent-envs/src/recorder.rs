//! Environment that records everything it is asked to do.

use multiagent::env::{EnvInfo, MultiAgentEnv, MultiAgentStepResult};
use multiagent::spaces::{Box as BoxSpace, Discrete, Tuple};
use multiagent::Result;
use ndarray::{ArrayD, IxDyn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Records {
    created: usize,
    closes: usize,
    resets: Vec<Option<u64>>,
    actions: Vec<Vec<ArrayD<f32>>>,
}

/// Log shared between a test and the recorders it builds
#[derive(Clone, Debug, Default)]
pub struct RecorderLog(Arc<Mutex<Records>>);

impl RecorderLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of recorders created with this log
    pub fn created(&self) -> usize {
        self.lock().created
    }

    /// Total `close` calls across recorders
    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    /// Seeds passed to `reset`, in call order
    pub fn resets(&self) -> Vec<Option<u64>> {
        self.lock().resets.clone()
    }

    /// Action lists passed to `step`, in call order
    pub fn actions(&self) -> Vec<Vec<ArrayD<f32>>> {
        self.lock().actions.clone()
    }
}

/// Multi-agent environment that logs resets, actions and closes.
///
/// Agent i observes the number of steps taken so far and is rewarded `i`.
/// Observation and action spaces can be replaced with arbitrary tuples,
/// including ones that disagree with the agent count.
pub struct Recorder {
    num_agents: usize,
    observation_space: Tuple,
    action_space: Tuple,
    log: RecorderLog,
    steps: f32,
}

impl Recorder {
    /// Create a recorder with `Box([1])` observations and `Discrete(3)` actions
    pub fn new(num_agents: usize) -> Self {
        Self::with_log(num_agents, RecorderLog::new())
    }

    /// Create a recorder writing to an existing log
    pub fn with_log(num_agents: usize, log: RecorderLog) -> Self {
        log.lock().created += 1;
        Self {
            num_agents,
            observation_space: Tuple::repeat(BoxSpace::unbounded(&[1]), num_agents),
            action_space: Tuple::repeat(Discrete::new(3), num_agents),
            log,
            steps: 0.0,
        }
    }

    /// Replace the reported spaces
    pub fn with_spaces(mut self, observation_space: Tuple, action_space: Tuple) -> Self {
        self.observation_space = observation_space;
        self.action_space = action_space;
        self
    }

    /// Handle to the shared log
    pub fn log(&self) -> RecorderLog {
        self.log.clone()
    }

    fn observe(&self) -> Vec<ArrayD<f32>> {
        self.observation_space
            .iter()
            .map(|space| ArrayD::from_elem(IxDyn(&space.shape()), self.steps))
            .collect()
    }
}

impl MultiAgentEnv for Recorder {
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
        self.log.lock().resets.push(seed);
        self.steps = 0.0;
        Ok((self.observe(), EnvInfo::new()))
    }

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult> {
        self.log.lock().actions.push(actions.to_vec());
        self.steps += 1.0;
        Ok(MultiAgentStepResult {
            observations: self.observe(),
            rewards: (0..self.num_agents).map(|i| i as f32).collect(),
            terminated: false,
            truncated: false,
            info: EnvInfo::new(),
        })
    }

    fn close(&mut self) {
        tracing::debug!(num_agents = self.num_agents, "Recorder closed");
        self.log.lock().closes += 1;
    }
}
