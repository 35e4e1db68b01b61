//! Environment traits and wrappers.
//!
//! Provides the single-agent `Env` and multi-agent `MultiAgentEnv` traits,
//! plus the wrappers translating between them: agent currying, tuple
//! flattening and the keyed view used by the vectorized layer.

mod bridge;
mod curry;
mod flatten;
mod spaces_view;
mod traits;

pub use bridge::{wrap_factories, wrap_factory, KeyedEnv, KeyedStepResult, TupleToDict};
pub use curry::{ConstantPolicy, CurryEnv, FixedPolicy};
pub use flatten::{sum_rewards, FlattenMultiEnv, FlattenSingletonEnv, RewardAgg};
pub use spaces_view::AgentSpaces;
pub use traits::{
    check_agent_spaces, Env, EnvInfo, MultiAgentEnv, MultiAgentStepResult, StepResult,
};
