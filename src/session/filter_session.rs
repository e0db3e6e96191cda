use crate::exec::executor::{Completion, ExecEvent, ExecutionHandle, FilterExecutor, Outcome};
use crate::filter::compiler::{FilterCompiler, UnitId};
use crate::foundation::error::{ErrorCategory, PixError, PixResult};
use crate::history::image_history::ImageHistory;
use crate::session::opts::SessionOpts;
use crate::session::state::{SessionMachine, SessionState, StateTransition};
use crate::surface::pixel::PixelSurface;

/// What the user can do about a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing beyond fixing the snippet or retrying.
    None,
    /// Memory ran out while staging and the history can be purged; call
    /// [`FilterSession::purge_history`] and submit again, or ignore to decline.
    PurgeAndRetry,
}

/// Notifications delivered to [`SessionObserver`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session moved between lifecycle states.
    StateChanged {
        /// State left.
        from: SessionState,
        /// State entered.
        to: SessionState,
    },
    /// Progress of the running filter, `[0,100]`.
    Progress(u8),
    /// A filtered image became the current image.
    Committed {
        /// Unit that produced it.
        unit: UnitId,
        /// History length after the commit.
        history_len: usize,
    },
    /// A submission failed; history is unchanged.
    Failed {
        /// Failure class.
        category: ErrorCategory,
        /// Human readable message without category prefix.
        message: String,
        /// Suggested recovery.
        recovery: Recovery,
    },
    /// The history changed length or content.
    HistoryChanged {
        /// New history length.
        len: usize,
    },
}

/// Receives [`SessionEvent`]s on the thread that drives the session.
pub trait SessionObserver {
    /// Handle one event.
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F: FnMut(&SessionEvent)> SessionObserver for F {
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// One image, its history, and at most one filter in flight.
///
/// Compilation and staging happen synchronously inside [`submit`](Self::submit); the run itself
/// is observed through [`poll`](Self::poll) or [`wait`](Self::wait). All history mutation happens
/// on the thread that owns the session.
pub struct FilterSession {
    compiler: FilterCompiler,
    executor: FilterExecutor,
    history: ImageHistory,
    machine: SessionMachine,
    running: Option<ExecutionHandle>,
    progress: u8,
    last_warnings: Vec<String>,
    suppressed_warnings: usize,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl std::fmt::Debug for FilterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSession")
            .field("state", &self.machine.state())
            .field("history_len", &self.history.len())
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl Default for FilterSession {
    fn default() -> Self {
        Self::new(SessionOpts::default())
    }
}

impl FilterSession {
    /// Create a session without an image.
    pub fn new(opts: SessionOpts) -> Self {
        Self {
            compiler: FilterCompiler::new(),
            executor: FilterExecutor::new(opts.executor()),
            history: ImageHistory::new(opts.history()),
            machine: SessionMachine::default(),
            running: None,
            progress: 0,
            last_warnings: Vec::new(),
            suppressed_warnings: 0,
            observers: Vec::new(),
        }
    }

    /// Register an observer.
    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Recent state transitions, oldest first.
    pub fn transitions(&self) -> &[StateTransition] {
        self.machine.transitions()
    }

    /// Whether a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// The image history.
    pub fn history(&self) -> &ImageHistory {
        &self.history
    }

    /// The current image; the pre-filter image while a filter runs.
    pub fn current(&self) -> Option<&PixelSurface> {
        self.history.current()
    }

    /// Last progress value.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Warnings retained from the last finished run.
    pub fn last_warnings(&self) -> &[String] {
        &self.last_warnings
    }

    /// Warnings from the last run that exceeded the retention limit.
    pub fn suppressed_warnings(&self) -> usize {
        self.suppressed_warnings
    }

    fn emit(&mut self, event: SessionEvent) {
        for o in &mut self.observers {
            o.on_event(&event);
        }
    }

    fn enter(&mut self, to: SessionState) -> PixResult<()> {
        let t = self.machine.transition(to)?;
        self.emit(SessionEvent::StateChanged {
            from: t.from,
            to: t.to,
        });
        Ok(())
    }

    fn set_progress(&mut self, p: u8) {
        self.progress = p;
        self.emit(SessionEvent::Progress(p));
    }

    fn history_changed(&mut self) {
        let len = self.history.len();
        self.emit(SessionEvent::HistoryChanged { len });
    }

    fn reject_if_busy(&self, what: &str) -> PixResult<()> {
        if self.is_busy() {
            tracing::warn!(state = ?self.state(), "{what} rejected while busy");
            return Err(PixError::invalid_operation(format!(
                "cannot {what} while a filter is running"
            )));
        }
        Ok(())
    }

    /// Terminal failure branch: report, restore progress, return to idle.
    fn fail(&mut self, err: PixError, recovery: Recovery) -> PixError {
        let category = err.category();
        tracing::warn!(?category, ?recovery, "filter failed: {err}");
        if let Err(e) = self.enter(SessionState::Error(category)) {
            tracing::error!("cannot enter error state: {e}");
        }
        self.emit(SessionEvent::Failed {
            category,
            message: err.user_message(),
            recovery,
        });
        if self.progress != 100 {
            self.set_progress(100);
        }
        if let Err(e) = self.enter(SessionState::Idle) {
            tracing::error!("cannot return to idle: {e}");
        }
        err
    }

    /// Load a new image, replacing the whole history.
    pub fn set_base(&mut self, surface: PixelSurface) -> PixResult<()> {
        self.reject_if_busy("load an image")?;
        self.history.set_base(surface);
        self.history_changed();
        Ok(())
    }

    /// Drop the current image. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> PixResult<bool> {
        self.reject_if_busy("undo")?;
        let changed = self.history.undo();
        if changed {
            self.history_changed();
        }
        Ok(changed)
    }

    /// Return to the base image. `Ok(false)` when already there.
    pub fn revert(&mut self) -> PixResult<bool> {
        self.reject_if_busy("revert")?;
        let changed = self.history.revert();
        if changed {
            self.history_changed();
        }
        Ok(changed)
    }

    /// Keep only the current image. This is the accept path of [`Recovery::PurgeAndRetry`].
    pub fn purge_history(&mut self) -> PixResult<bool> {
        self.reject_if_busy("purge the history")?;
        let changed = self.history.purge();
        if changed {
            self.history_changed();
        }
        Ok(changed)
    }

    /// Compile `text`, stage a copy of the current image and start running the filter on it.
    ///
    /// Compile and staging failures are reported to observers and returned here. Run failures
    /// surface later through [`poll`](Self::poll) or [`wait`](Self::wait).
    #[tracing::instrument(skip_all, fields(len = text.len()))]
    pub fn submit(&mut self, text: &str) -> PixResult<UnitId> {
        self.reject_if_busy("apply a filter")?;
        if !self.history.can_apply_filter() {
            tracing::warn!("submit rejected: no image loaded");
            return Err(PixError::invalid_operation("there is no image to filter"));
        }
        self.progress = 0;

        self.enter(SessionState::Compiling)?;
        let unit = match self.compiler.compile(text) {
            Ok(unit) => unit,
            Err(e) => return Err(self.fail(e, Recovery::None)),
        };
        let unit_id = unit.id();

        self.enter(SessionState::Staging)?;
        let staged = match self.history.stage_copy() {
            Ok(s) => s,
            Err(e) => {
                let recovery = if e.category() == ErrorCategory::OutOfMemory && self.history.can_undo()
                {
                    Recovery::PurgeAndRetry
                } else {
                    Recovery::None
                };
                return Err(self.fail(e, recovery));
            }
        };

        let handle = match self.executor.execute(unit, staged) {
            Ok(h) => h,
            Err(e) => {
                self.discard_staged();
                return Err(self.fail(e, Recovery::None));
            }
        };
        self.running = Some(handle);
        self.enter(SessionState::Running)?;
        tracing::debug!(unit = %unit_id, "filter submitted");
        Ok(unit_id)
    }

    /// Dispatch queued run events without blocking. Returns the run's result once it finishes.
    pub fn poll(&mut self) -> Option<PixResult<UnitId>> {
        loop {
            let ev = self.running.as_mut()?.try_next_event()?;
            if let Some(result) = self.handle_event(ev) {
                return Some(result);
            }
        }
    }

    /// Block until the in-flight run finishes.
    pub fn wait(&mut self) -> PixResult<UnitId> {
        loop {
            let Some(handle) = self.running.as_mut() else {
                return Err(PixError::invalid_operation("no filter is running"));
            };
            let Some(ev) = handle.next_event() else {
                self.running = None;
                return Err(PixError::invalid_operation("no filter is running"));
            };
            if let Some(result) = self.handle_event(ev) {
                return result;
            }
        }
    }

    /// [`submit`](Self::submit) then [`wait`](Self::wait).
    pub fn apply(&mut self, text: &str) -> PixResult<UnitId> {
        self.submit(text)?;
        self.wait()
    }

    /// Ask the running filter to stop. Returns whether anything was running.
    pub fn cancel(&mut self) -> bool {
        match &self.running {
            Some(handle) => {
                tracing::debug!(unit = %handle.unit_id(), "cancel requested");
                handle.cancel();
                true
            }
            None => false,
        }
    }

    fn handle_event(&mut self, ev: ExecEvent) -> Option<PixResult<UnitId>> {
        match ev {
            ExecEvent::Progress(p) => {
                self.set_progress(p);
                None
            }
            ExecEvent::Complete(done) => {
                self.running = None;
                Some(self.finish(done))
            }
        }
    }

    fn finish(&mut self, done: Completion) -> PixResult<UnitId> {
        self.last_warnings = done.warnings.entries().to_vec();
        self.suppressed_warnings = done.warnings.suppressed();
        let unit = done.unit_id;

        match (done.outcome, done.surface) {
            (Outcome::Success, Some(surface)) => {
                self.enter(SessionState::Committing)?;
                if let Err(e) = self.history.commit_last(surface) {
                    self.enter(SessionState::RollingBack)?;
                    self.discard_staged();
                    return Err(self.fail(e, Recovery::None));
                }
                let history_len = self.history.len();
                self.emit(SessionEvent::Committed { unit, history_len });
                self.history_changed();
                self.enter(SessionState::Idle)?;
                Ok(unit)
            }
            (Outcome::Success, None) => {
                self.enter(SessionState::RollingBack)?;
                self.discard_staged();
                Err(self.fail(
                    PixError::general("filter finished without returning the image"),
                    Recovery::None,
                ))
            }
            (Outcome::Failure(e), _) => {
                self.enter(SessionState::RollingBack)?;
                self.discard_staged();
                Err(self.fail(e, Recovery::None))
            }
        }
    }

    fn discard_staged(&mut self) {
        if let Err(e) = self.history.rollback_last() {
            tracing::error!("cannot roll back staged image: {e}");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/filter_session.rs"]
mod tests;
