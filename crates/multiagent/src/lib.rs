//! # multiagent
//!
//! Adapters that let multi-agent environments interoperate with a
//! single-agent environment interface and with batched (vectorized) execution.
//!
//! ## Overview
//!
//! - Tuple spaces flattened into a single combined space (`spaces::flatten_space`)
//! - Fixing one agent to a policy so the rest looks like a smaller env (`env::CurryEnv`)
//! - Agent-major / environment-major reshaping for batches (`vector::VecMultiEnv`)
//! - Serial and thread-per-env parallel backends (`vector::Serial`, `vector::Parallel`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use multiagent::prelude::*;
//! use multiagent_envs::Counter;
//!
//! let factories = (0..4).map(|i| move || Ok(Counter::new(2).with_offset(i as f32)));
//! let mut venv = make_serial_vec_multi_env(factories.collect())?;
//! let obs = venv.reset(Some(42))?;
//! assert_eq!(obs.len(), venv.num_agents());
//! ```

pub mod env;
pub mod spaces;
pub mod vector;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::env::{
        AgentSpaces, CurryEnv, Env, EnvInfo, FixedPolicy, FlattenMultiEnv, FlattenSingletonEnv,
        MultiAgentEnv, MultiAgentStepResult, StepResult, TupleToDict,
    };
    pub use crate::spaces::*;
    pub use crate::vector::{
        make_parallel_vec_multi_env, make_serial_vec_multi_env, make_vec_multi_env, Backend,
        VecEnvBackend, VecEnvConfig, VecMultiEnv, VecMultiStepResult,
    };
    pub use crate::{MultiAgentError, Result};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum MultiAgentError {
    #[error("Cannot flatten a tuple space mixing kinds: {}", .kinds.join(", "))]
    TypeMismatch { kinds: Vec<String> },

    #[error("Unsupported space: {0}")]
    NotSupported(String),

    #[error("Ragged input at index {index}: expected inner length {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Missing key {0} in agent mapping")]
    MissingKey(usize),

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Agent count mismatch: expected {expected}, got {actual}")]
    AgentCountMismatch { expected: usize, actual: usize },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Environment error: {0}")]
    EnvError(String),

    #[error("Worker for environment {0} disconnected")]
    WorkerDisconnected(usize),
}

pub type Result<T> = core::result::Result<T, MultiAgentError>;
