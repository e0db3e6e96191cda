use crate::foundation::error::{ErrorCategory, PixError, PixResult};

/// Transitions kept for diagnostics.
const MAX_TRANSITIONS: usize = 256;

/// Lifecycle of a [`FilterSession`](crate::FilterSession).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Ready for a new filter.
    #[default]
    Idle,
    /// Compiling the snippet.
    Compiling,
    /// Copying the current image into a new history slot.
    Staging,
    /// A worker is running the filter.
    Running,
    /// Storing the filtered image.
    Committing,
    /// Discarding the staged image.
    RollingBack,
    /// A run failed; always followed by `Idle`.
    Error(ErrorCategory),
}

impl SessionState {
    /// Whether a run is in flight.
    pub fn is_busy(self) -> bool {
        self != Self::Idle
    }
}

/// One recorded state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateTransition {
    /// State left.
    pub from: SessionState,
    /// State entered.
    pub to: SessionState,
}

#[derive(Debug, Default)]
pub(crate) struct SessionMachine {
    state: SessionState,
    transitions: Vec<StateTransition>,
}

impl SessionMachine {
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub(crate) fn can_transition(&self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self.state, to),
            (Idle, Compiling)
                | (Compiling, Staging)
                | (Compiling, Error(_))
                | (Staging, Running)
                | (Staging, Error(_))
                | (Running, Committing)
                | (Running, RollingBack)
                | (Running, Error(_))
                | (Committing, Idle)
                | (Committing, RollingBack)
                | (RollingBack, Idle)
                | (RollingBack, Error(_))
                | (Error(_), Idle)
        )
    }

    pub(crate) fn transition(&mut self, to: SessionState) -> PixResult<StateTransition> {
        let from = self.state;
        if !self.can_transition(to) {
            tracing::warn!(?from, ?to, "invalid session transition requested");
            return Err(PixError::invalid_operation(format!(
                "cannot go from {from:?} to {to:?}"
            )));
        }
        tracing::debug!(?from, ?to, "session transition");
        let record = StateTransition { from, to };
        self.state = to;
        if self.transitions.len() == MAX_TRANSITIONS {
            self.transitions.remove(0);
        }
        self.transitions.push(record);
        Ok(record)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/state.rs"]
mod tests;
