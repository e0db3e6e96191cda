//! Running compiled units off the calling thread.

/// Worker threads, event streams and completion handles.
pub mod executor;
/// Monotonic progress reporting.
pub mod progress;
