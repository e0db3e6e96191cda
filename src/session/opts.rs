use crate::exec::executor::ExecutorOpts;
use crate::foundation::error::{PixError, PixResult};
use crate::history::image_history::HistoryOpts;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Options for a [`FilterSession`](crate::FilterSession).
///
/// Every field has a default, so `{}` is a valid options file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOpts {
    /// Record advisory warnings while filters run.
    pub warnings: bool,
    /// Retain at most this many warnings per run.
    pub max_warnings: usize,
    /// Pixel-data budget for the history, counting a staged copy.
    pub history_budget_bytes: Option<u64>,
    /// Stack size of filter worker threads.
    pub worker_stack_bytes: Option<usize>,
}

impl Default for SessionOpts {
    fn default() -> Self {
        let exec = ExecutorOpts::default();
        Self {
            warnings: exec.warnings,
            max_warnings: exec.max_warnings,
            history_budget_bytes: None,
            worker_stack_bytes: exec.stack_bytes,
        }
    }
}

impl SessionOpts {
    /// Parse options from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> PixResult<Self> {
        serde_json::from_reader(r).map_err(|e| {
            PixError::Other(anyhow::Error::new(e).context("parse session options JSON"))
        })
    }

    /// Parse options from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> PixResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            PixError::Other(
                anyhow::Error::new(e)
                    .context(format!("open session options '{}'", path.display())),
            )
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// History options derived from these settings.
    pub fn history(&self) -> HistoryOpts {
        HistoryOpts {
            memory_budget_bytes: self.history_budget_bytes,
        }
    }

    /// Executor options derived from these settings.
    pub fn executor(&self) -> ExecutorOpts {
        ExecutorOpts {
            warnings: self.warnings,
            max_warnings: self.max_warnings,
            stack_bytes: self.worker_stack_bytes,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/opts.rs"]
mod tests;
