//! Built-in multi-agent environments.
//!
//! Small deterministic environments for testing and demos:
//! - `Counter` - Shared counter; results reveal agent and env identity
//! - `MatchingPennies` - Two-player zero-sum game
//! - `Recorder` - Logs every reset, action and close

mod counter;
mod matching_pennies;
mod recorder;

pub use counter::Counter;
pub use matching_pennies::MatchingPennies;
pub use recorder::{Recorder, RecorderLog};
