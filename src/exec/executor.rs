use crate::exec::progress::ProgressTracker;
use crate::filter::compiler::UnitId;
use crate::filter::host::FilterContext;
use crate::filter::unit::FilterUnit;
use crate::foundation::error::{PixError, PixResult};
use crate::script::vm::{VmError, VmErrorKind};
use crate::surface::pixel::PixelSurface;
use crate::surface::warnings::WarningLog;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvError, Sender, TryRecvError};
use std::thread::JoinHandle;

/// Options controlling how filter units are run.
#[derive(Clone, Debug)]
pub struct ExecutorOpts {
    /// Record advisory warnings (out-of-bounds access, clamped channels).
    pub warnings: bool,
    /// Retain at most this many warning messages per execution.
    pub max_warnings: usize,
    /// Stack size of the worker thread. `None` uses the platform default.
    pub stack_bytes: Option<usize>,
}

impl Default for ExecutorOpts {
    fn default() -> Self {
        Self {
            warnings: false,
            max_warnings: 100,
            stack_bytes: None,
        }
    }
}

/// How an execution ended.
#[derive(Debug)]
pub enum Outcome {
    /// The body returned normally.
    Success,
    /// The body failed; the surface must be discarded.
    Failure(PixError),
}

impl Outcome {
    /// Whether the body returned normally.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&PixError> {
        match self {
            Self::Success => None,
            Self::Failure(e) => Some(e),
        }
    }
}

/// Terminal message of one execution.
#[derive(Debug)]
pub struct Completion {
    /// Unit that ran.
    pub unit_id: UnitId,
    /// Result of the body.
    pub outcome: Outcome,
    /// The surface handed back by the worker. `None` only when the worker vanished.
    pub surface: Option<PixelSurface>,
    /// Warnings raised while running.
    pub warnings: WarningLog,
}

/// One message from a running execution.
#[derive(Debug)]
pub enum ExecEvent {
    /// Progress in `[0,100]`.
    Progress(u8),
    /// Always the last event.
    Complete(Completion),
}

/// Runs filter units on background worker threads.
#[derive(Clone, Debug, Default)]
pub struct FilterExecutor {
    opts: ExecutorOpts,
}

impl FilterExecutor {
    /// Create an executor.
    pub fn new(opts: ExecutorOpts) -> Self {
        Self { opts }
    }

    /// Options in use.
    pub fn opts(&self) -> &ExecutorOpts {
        &self.opts
    }

    /// Move `unit` and `surface` onto a new worker thread and start running.
    #[tracing::instrument(skip_all, fields(unit = %unit.id()))]
    pub fn execute(&self, unit: FilterUnit, surface: PixelSurface) -> PixResult<ExecutionHandle> {
        let unit_id = unit.id();
        let (tx, rx) = mpsc::channel::<ExecEvent>();
        let cancel = Arc::new(AtomicBool::new(false));

        let mut builder = std::thread::Builder::new().name(format!("pixcoder-{}", unit_id.entry_name()));
        if let Some(bytes) = self.opts.stack_bytes {
            builder = builder.stack_size(bytes);
        }
        let opts = self.opts.clone();
        let worker_cancel = Arc::clone(&cancel);
        let thread = builder
            .spawn(move || run_worker(unit, surface, &opts, &worker_cancel, &tx))
            .map_err(|e| PixError::general(format!("failed to start filter worker: {e}")))?;

        tracing::debug!("filter worker started");
        Ok(ExecutionHandle {
            unit_id,
            rx,
            cancel,
            thread: Some(thread),
            pending: VecDeque::new(),
            progress: 0,
            finished: false,
            progress_listeners: Vec::new(),
            complete_listeners: Vec::new(),
        })
    }
}

fn run_worker(
    unit: FilterUnit,
    mut surface: PixelSurface,
    opts: &ExecutorOpts,
    cancel: &AtomicBool,
    tx: &Sender<ExecEvent>,
) {
    let unit_id = unit.id();
    let entry = unit_id.entry_name();
    let mut warnings = WarningLog::new(opts.warnings, opts.max_warnings);
    let mut tracker = ProgressTracker::new();

    // A send only fails once the handle is gone; the run continues until it notices the
    // cancel flag set by the handle's drop.
    let _ = tx.send(ExecEvent::Progress(0));

    let result = {
        let mut on_progress = |p: u8| {
            let _ = tx.send(ExecEvent::Progress(p));
        };
        let mut ctx = FilterContext {
            surface: &mut surface,
            warnings: &mut warnings,
            progress: &mut tracker,
            on_progress: &mut on_progress,
            cancel,
        };
        panic::catch_unwind(AssertUnwindSafe(|| unit.run(&mut ctx)))
    };

    let outcome = match result {
        Ok(Ok(())) => Outcome::Success,
        Ok(Err(e)) => Outcome::Failure(vm_failure(&entry, e)),
        Err(payload) => Outcome::Failure(PixError::general(format!(
            "{entry} panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };
    match &outcome {
        Outcome::Success => tracing::debug!(unit = %unit_id, "filter finished"),
        Outcome::Failure(e) => tracing::debug!(unit = %unit_id, "filter failed: {e}"),
    }

    let _ = tx.send(ExecEvent::Progress(tracker.finish()));
    let _ = tx.send(ExecEvent::Complete(Completion {
        unit_id,
        outcome,
        surface: Some(surface),
        warnings,
    }));
}

fn vm_failure(entry: &str, e: VmError) -> PixError {
    match e.kind {
        VmErrorKind::Runtime => PixError::general(format!("exception in {entry}: {}", e.message)),
        VmErrorKind::ResourceExhausted => {
            PixError::out_of_memory(format!("{entry} ran out of stack: {}", e.message))
        }
        VmErrorKind::Cancelled => PixError::general(e.message),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// The caller's side of a running execution.
///
/// Events are queued by the worker and dispatched to listeners on whichever thread calls
/// [`poll`](Self::poll), [`wait`](Self::wait) or the raw event accessors. Dropping an unfinished
/// handle cancels the run.
pub struct ExecutionHandle {
    unit_id: UnitId,
    rx: Receiver<ExecEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    pending: VecDeque<ExecEvent>,
    progress: u8,
    finished: bool,
    progress_listeners: Vec<Box<dyn FnMut(u8)>>,
    complete_listeners: Vec<Box<dyn FnMut(&Outcome)>>,
}

impl std::fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("unit_id", &self.unit_id)
            .field("progress", &self.progress)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl ExecutionHandle {
    /// Unit being run.
    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    /// Register a progress listener.
    pub fn on_progress(&mut self, f: impl FnMut(u8) + 'static) {
        self.progress_listeners.push(Box::new(f));
    }

    /// Register a completion listener.
    pub fn on_complete(&mut self, f: impl FnMut(&Outcome) + 'static) {
        self.complete_listeners.push(Box::new(f));
    }

    /// Last progress value dispatched.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Whether the completion has been dispatched.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Ask the worker to stop at its next loop back-edge or host call.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Next queued event without blocking.
    pub fn try_next_event(&mut self) -> Option<ExecEvent> {
        if self.finished && self.pending.is_empty() {
            return None;
        }
        let ev = match self.pending.pop_front() {
            Some(ev) => ev,
            None => match self.rx.try_recv() {
                Ok(ev) => ev,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.worker_vanished()?,
            },
        };
        Some(self.dispatch(ev))
    }

    /// Next event, blocking until one arrives. `None` once the completion was dispatched.
    pub fn next_event(&mut self) -> Option<ExecEvent> {
        if self.finished && self.pending.is_empty() {
            return None;
        }
        let ev = match self.pending.pop_front() {
            Some(ev) => ev,
            None => match self.rx.recv() {
                Ok(ev) => ev,
                Err(RecvError) => self.worker_vanished()?,
            },
        };
        Some(self.dispatch(ev))
    }

    /// Drain queued events; returns the completion once it arrives.
    pub fn poll(&mut self) -> Option<Completion> {
        while let Some(ev) = self.try_next_event() {
            if let ExecEvent::Complete(c) = ev {
                return Some(c);
            }
        }
        None
    }

    /// Block until the execution completes.
    pub fn wait(mut self) -> Completion {
        while let Some(ev) = self.next_event() {
            if let ExecEvent::Complete(c) = ev {
                return c;
            }
        }
        // Only reachable if the completion was already taken through the event accessors.
        Completion {
            unit_id: self.unit_id,
            outcome: Outcome::Failure(PixError::invalid_operation(
                "execution already completed",
            )),
            surface: None,
            warnings: WarningLog::disabled(),
        }
    }

    fn worker_vanished(&mut self) -> Option<ExecEvent> {
        if self.finished {
            return None;
        }
        tracing::warn!(unit = %self.unit_id, "filter worker exited without completing");
        self.pending.push_back(ExecEvent::Complete(Completion {
            unit_id: self.unit_id,
            outcome: Outcome::Failure(PixError::general(format!(
                "{} stopped without completing",
                self.unit_id.entry_name()
            ))),
            surface: None,
            warnings: WarningLog::disabled(),
        }));
        if self.progress == 100 {
            return self.pending.pop_front();
        }
        Some(ExecEvent::Progress(100))
    }

    fn dispatch(&mut self, ev: ExecEvent) -> ExecEvent {
        match &ev {
            ExecEvent::Progress(p) => {
                self.progress = *p;
                for f in &mut self.progress_listeners {
                    f(*p);
                }
            }
            ExecEvent::Complete(c) => {
                self.finished = true;
                if let Some(t) = self.thread.take() {
                    let _ = t.join();
                }
                for f in &mut self.complete_listeners {
                    f(&c.outcome);
                }
            }
        }
        ev
    }
}

impl Drop for ExecutionHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/exec/executor.rs"]
mod tests;
