//! Parallel vectorization backend.
//!
//! Each environment lives on its own worker thread and is driven over a pair
//! of bounded channels. The environment is built inside the worker, so only
//! the factory has to be `Send`.

use super::vecenv::{
    check_num_envs, collate_observations, collate_steps, step_with_auto_reset, EnvSpec,
    KeyedVecResult, VecEnvBackend,
};
use crate::env::{EnvInfo, KeyedEnv, KeyedStepResult};
use crate::spaces::{AgentMap, Dict};
use crate::{MultiAgentError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use ndarray::ArrayD;
use std::thread::{spawn, JoinHandle};

enum Command {
    Reset(Option<u64>),
    Step(Vec<ArrayD<f32>>),
    Close,
}

enum Response {
    Ready(Result<EnvSpec>),
    Reset(Result<(AgentMap<ArrayD<f32>>, EnvInfo)>),
    Step(Result<KeyedStepResult>),
}

struct Worker {
    index: usize,
    cmd_tx: Sender<Command>,
    res_rx: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn<E, F>(index: usize, factory: F) -> Self
    where
        E: KeyedEnv + 'static,
        F: FnOnce() -> Result<E> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = bounded::<Command>(1);
        let (res_tx, res_rx) = bounded::<Response>(1);

        let handle = spawn(move || {
            let mut env = match factory() {
                Ok(env) => env,
                Err(e) => {
                    let _ = res_tx.send(Response::Ready(Err(e)));
                    return;
                }
            };
            if res_tx.send(Response::Ready(Ok(EnvSpec::of(&env)))).is_err() {
                env.close();
                return;
            }

            while let Ok(cmd) = cmd_rx.recv() {
                let response = match cmd {
                    Command::Reset(seed) => Response::Reset(env.reset(seed)),
                    Command::Step(actions) => Response::Step(step_with_auto_reset(&mut env, &actions)),
                    Command::Close => break,
                };
                if res_tx.send(response).is_err() {
                    break;
                }
            }
            env.close();
        });

        Self {
            index,
            cmd_tx,
            res_rx,
            handle: Some(handle),
        }
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| MultiAgentError::WorkerDisconnected(self.index))
    }

    fn recv(&self) -> Result<Response> {
        self.res_rx
            .recv()
            .map_err(|_| MultiAgentError::WorkerDisconnected(self.index))
    }

    fn unexpected(&self) -> MultiAgentError {
        MultiAgentError::EnvError(format!(
            "worker {} answered with an unexpected response",
            self.index
        ))
    }

    fn recv_ready(&self) -> Result<EnvSpec> {
        match self.recv()? {
            Response::Ready(spec) => spec,
            _ => Err(self.unexpected()),
        }
    }

    fn recv_reset(&self) -> Result<(AgentMap<ArrayD<f32>>, EnvInfo)> {
        match self.recv()? {
            Response::Reset(result) => result,
            _ => Err(self.unexpected()),
        }
    }

    fn recv_step(&self) -> Result<KeyedStepResult> {
        match self.recv()? {
            Response::Step(result) => result,
            _ => Err(self.unexpected()),
        }
    }

    fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(Command::Close);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(worker = self.index, "Worker thread panicked");
            }
        }
    }
}

/// Parallel vectorization backend with one worker thread per environment
pub struct Parallel {
    workers: Vec<Worker>,
    spec: EnvSpec,
    /// Per-worker outcome of handing over the pending step
    pending: Option<Vec<Result<()>>>,
    closed: bool,
}

impl Parallel {
    /// Spawn one worker per factory and wait until every environment is built.
    ///
    /// On any failure all workers are shut down, which closes every
    /// environment that was built.
    pub fn new<E, F>(factories: Vec<F>) -> Result<Self>
    where
        E: KeyedEnv + 'static,
        F: FnOnce() -> Result<E> + Send + 'static,
    {
        if factories.is_empty() {
            return Err(MultiAgentError::PreconditionViolation(
                "at least one environment factory is required".into(),
            ));
        }

        let mut workers: Vec<Worker> = factories
            .into_iter()
            .enumerate()
            .map(|(i, factory)| Worker::spawn(i, factory))
            .collect();

        let specs: Vec<Result<EnvSpec>> = workers.iter().map(Worker::recv_ready).collect();
        let spec = specs
            .into_iter()
            .collect::<Result<Vec<_>>>()
            .and_then(|specs| {
                let (first, rest) = specs.split_first().ok_or_else(|| {
                    MultiAgentError::PreconditionViolation("no environment was built".into())
                })?;
                for other in rest {
                    first.check(other)?;
                }
                Ok(first.clone())
            });

        match spec {
            Ok(spec) => {
                tracing::debug!(
                    num_envs = workers.len(),
                    num_agents = spec.num_agents,
                    "Created parallel backend"
                );
                Ok(Self {
                    workers,
                    spec,
                    pending: None,
                    closed: false,
                })
            }
            Err(e) => {
                tracing::warn!(num_envs = workers.len(), error = %e, "Parallel backend construction failed");
                for worker in &mut workers {
                    worker.shutdown();
                }
                Err(e)
            }
        }
    }

    /// Collect and discard the responses of an unfinished step
    fn drain_pending(&mut self) {
        if let Some(sent) = self.pending.take() {
            for (worker, sent) in self.workers.iter().zip(sent) {
                if sent.is_ok() {
                    let _ = worker.recv_step();
                }
            }
        }
    }
}

impl VecEnvBackend for Parallel {
    fn num_envs(&self) -> usize {
        self.workers.len()
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
        self.drain_pending();
        let sent: Vec<Result<()>> = self
            .workers
            .iter()
            .enumerate()
            .map(|(i, worker)| {
                worker.send(Command::Reset(seed.map(|s| s.wrapping_add(i as u64))))
            })
            .collect();
        let results: Vec<_> = self
            .workers
            .iter()
            .zip(sent)
            .map(|(worker, sent)| sent.and_then(|_| worker.recv_reset()))
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
        check_num_envs(self.workers.len(), actions.len())?;
        let sent = self
            .workers
            .iter()
            .zip(actions)
            .map(|(worker, env_actions)| worker.send(Command::Step(env_actions)))
            .collect();
        self.pending = Some(sent);
        Ok(())
    }

    fn step_wait(&mut self) -> Result<KeyedVecResult> {
        let sent = self.pending.take().ok_or_else(|| {
            MultiAgentError::PreconditionViolation("step_wait called without step_async".into())
        })?;
        let results: Vec<_> = self
            .workers
            .iter()
            .zip(sent)
            .map(|(worker, sent)| sent.and_then(|_| worker.recv_step()))
            .collect();
        collate_steps(results.into_iter().collect::<Result<_>>()?, self.spec.num_agents)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.drain_pending();
        for worker in &mut self.workers {
            worker.shutdown();
        }
        tracing::debug!(num_envs = self.workers.len(), "Closed parallel backend");
    }
}

impl Drop for Parallel {
    fn drop(&mut self) {
        self.close();
    }
}
