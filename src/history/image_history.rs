use crate::foundation::error::{PixError, PixResult};
use crate::surface::pixel::PixelSurface;

/// History configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct HistoryOpts {
    /// Maximum bytes of pixel data the history may retain, counting a staged copy. `None` is
    /// unbounded.
    pub memory_budget_bytes: Option<u64>,
}

#[derive(Debug)]
enum Entry {
    Ready(PixelSurface),
    /// Handed out by `stage_copy`, waiting for `commit_last` or `rollback_last`.
    Lent { width: u32, height: u32 },
}

/// Ordered snapshots: index 0 is the base image, the last index the current working image.
#[derive(Debug, Default)]
pub struct ImageHistory {
    entries: Vec<Entry>,
    opts: HistoryOpts,
}

impl ImageHistory {
    /// Empty history.
    pub fn new(opts: HistoryOpts) -> Self {
        Self {
            entries: Vec::new(),
            opts,
        }
    }

    /// Change the memory budget for future staging.
    pub fn set_memory_budget(&mut self, bytes: Option<u64>) {
        self.opts.memory_budget_bytes = bytes;
    }

    /// Replace the whole history with `surface`.
    pub fn set_base(&mut self, surface: PixelSurface) {
        tracing::debug!(
            width = surface.width(),
            height = surface.height(),
            dropped = self.entries.len(),
            "history base set"
        );
        self.entries.clear();
        self.entries.push(Entry::Ready(surface));
    }

    /// Deep-copy the current image into a new lent slot and hand the copy out.
    ///
    /// On failure the history is unchanged.
    pub fn stage_copy(&mut self) -> PixResult<PixelSurface> {
        if self.is_staging() {
            return Err(PixError::invalid_operation("a filter is already staged"));
        }
        let Some(Entry::Ready(last)) = self.entries.last() else {
            return Err(PixError::invalid_operation("there is no image to filter"));
        };

        let needed = last.byte_len() as u64;
        if let Some(budget) = self.opts.memory_budget_bytes {
            let retained = self.retained_bytes();
            if retained.saturating_add(needed) > budget {
                tracing::warn!(retained, needed, budget, "history memory budget exceeded");
                return Err(PixError::out_of_memory(format!(
                    "copying the image needs {needed} bytes but only {} of the {budget} byte budget are free",
                    budget.saturating_sub(retained)
                )));
            }
        }

        let copy = last.try_clone()?;
        self.entries.push(Entry::Lent {
            width: copy.width(),
            height: copy.height(),
        });
        tracing::debug!(len = self.entries.len(), "history slot staged");
        Ok(copy)
    }

    /// Fill the lent slot with the filtered surface.
    pub fn commit_last(&mut self, surface: PixelSurface) -> PixResult<()> {
        let Some(Entry::Lent { width, height }) = self.entries.last() else {
            return Err(PixError::invalid_operation("nothing is staged"));
        };
        if (*width, *height) != (surface.width(), surface.height()) {
            return Err(PixError::invalid_operation(format!(
                "staged image is {width}x{height} but {}x{} was committed",
                surface.width(),
                surface.height()
            )));
        }
        if let Some(slot) = self.entries.last_mut() {
            *slot = Entry::Ready(surface);
        }
        tracing::debug!(len = self.entries.len(), "history slot committed");
        Ok(())
    }

    /// Drop the lent slot.
    pub fn rollback_last(&mut self) -> PixResult<()> {
        if !self.is_staging() {
            return Err(PixError::invalid_operation("nothing is staged"));
        }
        self.entries.pop();
        tracing::debug!(len = self.entries.len(), "history slot rolled back");
        Ok(())
    }

    fn can_shrink(&self) -> bool {
        self.entries.len() > 1 && !self.is_staging()
    }

    /// Drop the current image. No-op at length 1.
    pub fn undo(&mut self) -> bool {
        if !self.can_shrink() {
            return false;
        }
        self.entries.pop();
        tracing::debug!(len = self.entries.len(), "history undo");
        true
    }

    /// Go back to the base image. No-op at length 1.
    pub fn revert(&mut self) -> bool {
        if !self.can_shrink() {
            return false;
        }
        self.entries.truncate(1);
        tracing::debug!("history reverted");
        true
    }

    /// Keep only the current image, freeing everything before it. No-op at length 1.
    pub fn purge(&mut self) -> bool {
        if !self.can_shrink() {
            return false;
        }
        let dropped = self.entries.len() - 1;
        self.entries.drain(..dropped);
        tracing::debug!(dropped, "history purged");
        true
    }

    /// Whether an image is loaded.
    pub fn has_image(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Last available snapshot. While a slot is lent this is the pre-filter image.
    pub fn current(&self) -> Option<&PixelSurface> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Ready(s) => Some(s),
            Entry::Lent { .. } => None,
        })
    }

    /// The base image.
    pub fn base(&self) -> Option<&PixelSurface> {
        match self.entries.first() {
            Some(Entry::Ready(s)) => Some(s),
            _ => None,
        }
    }

    /// Number of snapshots, counting a lent slot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no image is loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether [`undo`](Self::undo) would do something.
    pub fn can_undo(&self) -> bool {
        self.can_shrink()
    }

    /// Whether [`revert`](Self::revert) would do something.
    pub fn can_revert(&self) -> bool {
        self.can_shrink()
    }

    /// Whether a filter may be staged now.
    pub fn can_apply_filter(&self) -> bool {
        self.has_image() && !self.is_staging()
    }

    /// Whether a slot is lent out.
    pub fn is_staging(&self) -> bool {
        matches!(self.entries.last(), Some(Entry::Lent { .. }))
    }

    /// Bytes of pixel data held by ready snapshots.
    pub fn retained_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| match e {
                Entry::Ready(s) => s.byte_len() as u64,
                Entry::Lent { .. } => 0,
            })
            .sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/image_history.rs"]
mod tests;
