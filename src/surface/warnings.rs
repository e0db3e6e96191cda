/// Advisory warning channel used by the pixel accessors and channel helpers.
///
/// Warnings never abort a filter. When disabled, nothing is recorded; when enabled, each warning
/// is logged and the first `limit` messages are retained for the caller.
#[derive(Clone, Debug, Default)]
pub struct WarningLog {
    enabled: bool,
    limit: usize,
    entries: Vec<String>,
    suppressed: usize,
}

impl WarningLog {
    /// Create a log; `limit` bounds the number of retained messages.
    pub fn new(enabled: bool, limit: usize) -> Self {
        Self {
            enabled,
            limit,
            entries: Vec::new(),
            suppressed: 0,
        }
    }

    /// A log that drops everything.
    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    /// Whether warnings are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a warning. The message is built lazily so disabled logs cost nothing.
    pub fn warn(&mut self, msg: impl FnOnce() -> String) {
        if !self.enabled {
            return;
        }
        let msg = msg();
        tracing::warn!(target: "pixcoder::filter", "{msg}");
        if self.entries.len() < self.limit {
            self.entries.push(msg);
        } else {
            self.suppressed += 1;
        }
    }

    /// Retained messages, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of warnings raised past the retention limit.
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Total warnings raised while enabled.
    pub fn total(&self) -> usize {
        self.entries.len() + self.suppressed
    }
}
