//! Orchestration of compile, stage, run, commit and rollback for one image.

/// The session orchestrator and its observer events.
pub mod filter_session;
/// Session options loaded from JSON.
pub mod opts;
/// Session lifecycle states.
pub mod state;
