//! Agent state machine for tool-augmented model turns.
//!
//! A [`TurnAgent`] is one model bound to a tool set. The answering agent loops
//! tools back into the model; the media agent stops as soon as its tools ran.

mod runner;

pub use runner::{AfterTools, AgentRun, AgentState, TurnAgent, DEFAULT_MAX_TOOL_ROUNDS};
