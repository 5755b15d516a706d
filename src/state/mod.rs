//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `RunState`: counters, continuation token and stop flag of the current run
//! - `ShutdownPhase`: the `Running -> Stopping -> Finalizing -> Terminated` lifecycle
//! - `Budget`: the optional item budget of a run

mod phase;
mod run_state;

// Re-export main types
pub use phase::ShutdownPhase;
pub use run_state::{Budget, ContinuationToken, RunState};
