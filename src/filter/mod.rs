//! Turning snippet text into runnable filter units.

/// Snippet wrapping, compilation and diagnostic mapping.
pub mod compiler;
pub(crate) mod host;
/// Compiled, verified units.
pub mod unit;
