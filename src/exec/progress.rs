use crate::surface::warnings::WarningLog;

/// Percentage for `done` out of `total`, or `None` when `total` is not positive.
///
/// `done` is clamped to `[0, total]` and the result truncated; the arithmetic is 64-bit so large
/// totals cannot overflow.
pub fn percent(done: i32, total: i32) -> Option<u8> {
    if total <= 0 {
        return None;
    }
    let done = i64::from(done).clamp(0, i64::from(total));
    Some((100 * done / i64::from(total)) as u8)
}

/// Highest value a report from filter code can reach; 100 is reserved for the end of the run.
const IN_BODY_MAX: u8 = 99;

/// Progress of one execution: starts at 0 and never goes back.
#[derive(Debug, Default)]
pub(crate) struct ProgressTracker {
    last: u8,
}

impl ProgressTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn last(&self) -> u8 {
        self.last
    }

    /// Record a report from filter code. Returns the new value when it went up.
    ///
    /// Reports are capped at 99 so that [`finish`](Self::finish) delivers the only 100.
    pub(crate) fn update(&mut self, done: i32, total: i32, warnings: &mut WarningLog) -> Option<u8> {
        let Some(p) = percent(done, total).map(|p| p.min(IN_BODY_MAX)) else {
            warnings.warn(|| format!("Progress total {total} must be positive; ignoring report"));
            return None;
        };
        if p > self.last {
            self.last = p;
            Some(p)
        } else {
            None
        }
    }

    /// Force the terminal value.
    pub(crate) fn finish(&mut self) -> u8 {
        tracing::trace!(from = self.last(), "progress forced to 100");
        self.last = 100;
        self.last
    }
}

#[cfg(test)]
#[path = "../../tests/unit/exec/progress.rs"]
mod tests;
