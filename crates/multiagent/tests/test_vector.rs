use multiagent::prelude::*;
use multiagent_envs::{Counter, Recorder, RecorderLog};
use ndarray::{ArrayD, IxDyn};
use std::thread;
use std::time::Duration;

fn scalar(value: f32) -> ArrayD<f32> {
    ArrayD::from_elem(IxDyn(&[1]), value)
}

fn counters(n: usize, agents: usize) -> Vec<impl FnOnce() -> Result<Counter> + Send + 'static> {
    (0..n)
        .map(move |i| move || Ok(Counter::new(agents).with_offset(1000.0 * i as f32)))
        .collect()
}

fn check_factory_order<B: VecEnvBackend>(mut venv: VecMultiEnv<B>) {
    assert_eq!((venv.num_envs(), venv.num_agents()), (4, 2));
    let obs = venv.reset(Some(10)).unwrap();
    for (i, &start) in [10.0, 11.0, 12.0, 13.0].iter().enumerate() {
        assert_eq!(obs[0][[i, 0]], start);
    }

    let actions = vec![vec![scalar(1.0); 4], vec![scalar(2.0); 4]];
    let result = venv.step(actions).unwrap();
    assert_eq!(result.rewards.shape(), &[2, 4]);
    for i in 0..4 {
        // reward column i comes from factory i, whatever finished first
        assert_eq!(result.rewards[[0, i]], 1000.0 * i as f32 + 1.0);
        assert_eq!(result.rewards[[1, i]], 1000.0 * i as f32 + 2.0);
    }
    venv.close();
}

#[test]
fn test_serial_preserves_factory_order() {
    check_factory_order(make_serial_vec_multi_env(counters(4, 2)).unwrap());
}

#[test]
fn test_parallel_preserves_factory_order() {
    check_factory_order(make_parallel_vec_multi_env(counters(4, 2)).unwrap());
}

#[test]
fn test_config_selects_backend() {
    for backend in [Backend::Serial, Backend::Parallel] {
        let config = VecEnvConfig::new(backend).with_seed(10);
        check_factory_order(make_vec_multi_env(&config, counters(4, 2)).unwrap());
    }
}

#[test]
fn test_actions_reach_the_right_env() {
    let log = RecorderLog::new();
    let factories: Vec<_> = (0..2)
        .map(|_| {
            let log = log.clone();
            move || Ok(Recorder::with_log(2, log))
        })
        .collect();
    let mut venv = make_serial_vec_multi_env(factories).unwrap();
    venv.reset(Some(3)).unwrap();
    assert_eq!(log.resets(), vec![Some(3), Some(4)]);

    // actions[agent][env] = 10 * agent + env
    let actions = (0..2)
        .map(|agent| (0..2).map(|env| scalar((10 * agent + env) as f32)).collect())
        .collect();
    venv.step(actions).unwrap();
    assert_eq!(
        log.actions(),
        vec![vec![scalar(0.0), scalar(10.0)], vec![scalar(1.0), scalar(11.0)]]
    );
}

fn mismatched(log: &RecorderLog) -> Vec<impl FnOnce() -> Result<Recorder> + Send + 'static> {
    [2, 2, 3, 2]
        .into_iter()
        .map(|agents| {
            let log = log.clone();
            move || Ok(Recorder::with_log(agents, log))
        })
        .collect()
}

#[test]
fn test_agent_count_mismatch_closes_everything_once() {
    let log = RecorderLog::new();
    let err = make_serial_vec_multi_env(mismatched(&log)).err();
    assert!(matches!(
        err,
        Some(MultiAgentError::AgentCountMismatch {
            expected: 2,
            actual: 3
        })
    ));
    assert_eq!(log.created(), 3);
    assert_eq!(log.closes(), 3);

    let log = RecorderLog::new();
    let err = make_parallel_vec_multi_env(mismatched(&log)).err();
    assert!(matches!(
        err,
        Some(MultiAgentError::AgentCountMismatch { .. })
    ));
    assert_eq!(log.created(), 4);
    assert_eq!(log.closes(), 4);
}

#[test]
fn test_failing_factory_closes_built_envs() {
    let log = RecorderLog::new();
    let factories: Vec<std::boxed::Box<dyn FnOnce() -> Result<Recorder> + Send>> = vec![
        std::boxed::Box::new({
            let log = log.clone();
            move || Ok(Recorder::with_log(1, log))
        }),
        std::boxed::Box::new(|| Err(MultiAgentError::EnvError("boom".into()))),
    ];
    let err = make_serial_vec_multi_env(factories).err();
    assert!(matches!(err, Some(MultiAgentError::EnvError(_))));
    assert_eq!(log.closes(), 1);
}

#[test]
fn test_close_is_idempotent_and_runs_on_drop() {
    let log = RecorderLog::new();
    let factories: Vec<_> = (0..3)
        .map(|_| {
            let log = log.clone();
            move || Ok(Recorder::with_log(1, log))
        })
        .collect();
    let mut venv = make_parallel_vec_multi_env(factories).unwrap();
    venv.close();
    venv.close();
    drop(venv);
    assert_eq!(log.closes(), 3);

    let factories: Vec<_> = (0..2)
        .map(|_| {
            let log = log.clone();
            move || Ok(Recorder::with_log(1, log))
        })
        .collect();
    drop(make_serial_vec_multi_env(factories).unwrap());
    assert_eq!(log.closes(), 5);
}

#[test]
fn test_step_protocol_violations() {
    let mut venv = make_serial_vec_multi_env(counters(2, 1)).unwrap();
    venv.reset(None).unwrap();
    assert!(matches!(
        venv.step_wait(),
        Err(MultiAgentError::PreconditionViolation(_))
    ));

    venv.step_async(vec![vec![scalar(0.0); 2]]).unwrap();
    assert!(matches!(
        venv.step_async(vec![vec![scalar(0.0); 2]]),
        Err(MultiAgentError::PreconditionViolation(_))
    ));
    venv.step_wait().unwrap();

    assert!(matches!(
        venv.step(vec![vec![scalar(0.0); 3]]),
        Err(MultiAgentError::InvalidAction(_))
    ));
}

#[test]
fn test_inner_errors_propagate_from_workers() {
    let mut venv = make_parallel_vec_multi_env(counters(3, 1)).unwrap();
    venv.reset(None).unwrap();
    // Counter only accepts actions below 4
    let actions = vec![vec![scalar(0.0), scalar(9.0), scalar(0.0)]];
    assert!(matches!(
        venv.step(actions),
        Err(MultiAgentError::InvalidAction(_))
    ));
    // the batch stays usable
    assert!(venv.step(vec![vec![scalar(0.0); 3]]).is_ok());
}

#[test]
fn test_auto_reset_under_parallel_backend() {
    let factories: Vec<_> = (0..2)
        .map(|_| || Ok(Counter::new(1).with_horizon(1)))
        .collect();
    let mut venv = make_parallel_vec_multi_env(factories).unwrap();
    venv.reset(Some(5)).unwrap();
    let result = venv.step(vec![vec![scalar(3.0); 2]]).unwrap();
    assert_eq!(result.dones(), vec![true, true]);
    assert!(result.infos.iter().all(|i| i.get("terminal") == Some(1.0)));
    // observations come from the unseeded reset
    assert_eq!(result.observations[0][[0, 0]], 0.0);
}

#[test]
fn test_max_seed_wraps_per_env_under_both_backends() {
    for backend in [Backend::Serial, Backend::Parallel] {
        let config = VecEnvConfig::new(backend);
        let mut venv = make_vec_multi_env(&config, counters(2, 1)).unwrap();
        let obs = venv.reset(Some(u64::MAX)).unwrap();
        assert_eq!(obs[0][[0, 0]], u64::MAX as f32);
        // env 1 is seeded with u64::MAX + 1, which wraps to 0
        assert_eq!(obs[0][[1, 0]], 0.0);
        venv.close();
    }
}

/// Counter whose steps take longer the lower its index
struct Slow {
    inner: Counter,
    delay: Duration,
}

impl MultiAgentEnv for Slow {
    fn num_agents(&self) -> usize {
        self.inner.num_agents()
    }

    fn observation_space(&self) -> Tuple {
        self.inner.observation_space()
    }

    fn action_space(&self) -> Tuple {
        self.inner.action_space()
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<ArrayD<f32>>, EnvInfo)> {
        self.inner.reset(seed)
    }

    fn step(&mut self, actions: &[ArrayD<f32>]) -> Result<MultiAgentStepResult> {
        thread::sleep(self.delay);
        self.inner.step(actions)
    }
}

#[test]
fn test_parallel_order_ignores_completion_order() {
    let factories: Vec<_> = (0..4u32)
        .map(|i| {
            move || {
                Ok::<_, MultiAgentError>(Slow {
                    inner: Counter::new(2).with_offset(1000.0 * i as f32),
                    delay: Duration::from_millis(40 * u64::from(3 - i)),
                })
            }
        })
        .collect();
    let mut venv = make_parallel_vec_multi_env(factories).unwrap();
    venv.reset(None).unwrap();
    for _ in 0..3 {
        let result = venv.step(vec![vec![scalar(1.0); 4], vec![scalar(3.0); 4]]).unwrap();
        for i in 0..4 {
            assert_eq!(result.rewards[[0, i]], 1000.0 * i as f32 + 1.0);
            assert_eq!(result.rewards[[1, i]], 1000.0 * i as f32 + 3.0);
        }
    }
    venv.close();
}
