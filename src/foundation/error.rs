/// Convenience result type used across pixcoder.
pub type PixResult<T> = Result<T, PixError>;

/// Top-level error taxonomy used by the compiler, executor, history and session APIs.
#[derive(thiserror::Error, Debug)]
pub enum PixError {
    /// A blank snippet was submitted.
    #[error("nothing to do: write some code first")]
    EmptyInput,

    /// The snippet was rejected by the compiler.
    #[error("source error: {0}")]
    Source(String),

    /// The compiled unit could not be instantiated or failed while running.
    #[error("general error: {0}")]
    General(String),

    /// An allocation failed while staging a copy or while running a filter.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A history or session operation was invoked when its preconditions do not hold.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// User-facing classification of a [`PixError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// See [`PixError::EmptyInput`].
    EmptyInput,
    /// See [`PixError::Source`].
    SourceError,
    /// See [`PixError::General`] and [`PixError::Other`].
    GeneralError,
    /// See [`PixError::OutOfMemory`].
    OutOfMemory,
    /// See [`PixError::InvalidOperation`].
    InvalidOperation,
}

impl ErrorCategory {
    /// Short title suitable for a dialog or a status line.
    pub const fn title(self) -> &'static str {
        match self {
            Self::EmptyInput => "Nothing to do",
            Self::SourceError => "Error in source",
            Self::GeneralError => "General error",
            Self::OutOfMemory => "Out of memory",
            Self::InvalidOperation => "Invalid operation",
        }
    }
}

impl PixError {
    /// Build a [`PixError::Source`] value.
    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`PixError::General`] value.
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }

    /// Build a [`PixError::OutOfMemory`] value.
    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }

    /// Build a [`PixError::InvalidOperation`] value.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Classify this error for the observer layer.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyInput => ErrorCategory::EmptyInput,
            Self::Source(_) => ErrorCategory::SourceError,
            Self::General(_) | Self::Other(_) => ErrorCategory::GeneralError,
            Self::OutOfMemory(_) => ErrorCategory::OutOfMemory,
            Self::InvalidOperation(_) => ErrorCategory::InvalidOperation,
        }
    }

    /// The message without the category prefix used by `Display`.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Nothing to do. Write some code first.".to_owned(),
            Self::Source(m)
            | Self::General(m)
            | Self::OutOfMemory(m)
            | Self::InvalidOperation(m) => m.clone(),
            Self::Other(e) => format!("{e:#}"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
