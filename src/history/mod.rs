//! Undo/revert history of image states.

/// Snapshot stack with copy-on-write staging.
pub mod image_history;
