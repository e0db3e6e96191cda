#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Pixcoder compiles short snippets of Java-like filter code into bytecode units and applies them
//! to an ARGB image on a background worker, with undo/revert history.
//!
//! Typical use goes through [`FilterSession`]:
//!
//! ```no_run
//! use pixcoder::{FilterSession, PixelSurface};
//!
//! let mut session = FilterSession::default();
//! session.set_base(PixelSurface::new(2, 2, 0xFF00_00FF)?)?;
//! session.apply("for (int y = 0; y < height(); y++) for (int x = 0; x < width(); x++) setRGB(x, y, ~getRGB(x, y) | 0xFF000000);")?;
//! assert!(session.history().can_undo());
//! # Ok::<(), pixcoder::PixError>(())
//! ```
//!
//! The lower layers are usable on their own: [`FilterCompiler`] turns text into a [`FilterUnit`],
//! [`FilterExecutor`] runs a unit against a surface and streams [`ExecEvent`]s, and
//! [`ImageHistory`] keeps the snapshot stack.

pub mod exec;
pub mod filter;
pub(crate) mod foundation;
pub mod history;
pub(crate) mod script;
pub mod session;
pub mod surface;

pub use exec::executor::{
    Completion, ExecEvent, ExecutionHandle, ExecutorOpts, FilterExecutor, Outcome,
};
pub use filter::compiler::{FilterCompiler, SnippetPos, UnitId};
pub use filter::unit::FilterUnit;
pub use foundation::error::{ErrorCategory, PixError, PixResult};
pub use history::image_history::{HistoryOpts, ImageHistory};
pub use session::filter_session::{FilterSession, Recovery, SessionEvent, SessionObserver};
pub use session::opts::SessionOpts;
pub use session::state::{SessionState, StateTransition};
pub use surface::io::{decode_surface, load_surface, save_surface};
pub use surface::pixel::PixelSurface;
pub use surface::warnings::WarningLog;
