//! ARGB pixel buffers and the helpers filter code uses to read and write them.

/// Channel decomposition/composition helpers.
pub mod channel;
/// Image file decoding and encoding for surfaces.
pub mod io;
pub(crate) mod pixel;
pub(crate) mod warnings;
