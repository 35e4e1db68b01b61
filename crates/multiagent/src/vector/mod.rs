//! Vectorized multi-agent environments.
//!
//! `VecMultiEnv` speaks agent-major and sits on a keyed, environment-major
//! backend:
//! - `Serial` - Sequential execution for debugging
//! - `Parallel` - One worker thread per environment

mod layout;
mod multi;
mod parallel;
mod serial;
mod vecenv;

pub use layout::{stack_batch, tuple_transpose, unstack_batch};
pub use multi::{
    make_parallel_vec_multi_env, make_serial_vec_multi_env, make_vec_multi_env, VecMultiEnv,
    VecMultiStepResult,
};
pub use parallel::Parallel;
pub use serial::Serial;
pub use vecenv::{Backend, KeyedVecResult, VecEnvBackend, VecEnvConfig};
