use crate::exec::progress::ProgressTracker;
use crate::script::vm::Host;
use crate::surface::pixel::PixelSurface;
use crate::surface::warnings::WarningLog;
use std::sync::atomic::{AtomicBool, Ordering};

/// The host a running unit sees: one surface, the warning log, progress and the stop flag.
pub(crate) struct FilterContext<'a> {
    pub(crate) surface: &'a mut PixelSurface,
    pub(crate) warnings: &'a mut WarningLog,
    pub(crate) progress: &'a mut ProgressTracker,
    pub(crate) on_progress: &'a mut dyn FnMut(u8),
    pub(crate) cancel: &'a AtomicBool,
}

fn out_of_bounds(x: i32, y: i32) -> String {
    format!("Coordinate [{x},{y}] is out of the image's bounds")
}

impl Host for FilterContext<'_> {
    fn width(&self) -> i32 {
        i32::try_from(self.surface.width()).unwrap_or(i32::MAX)
    }

    fn height(&self) -> i32 {
        i32::try_from(self.surface.height()).unwrap_or(i32::MAX)
    }

    fn get_pixel(&mut self, x: i32, y: i32) -> i32 {
        match self.surface.pixel(x.into(), y.into()) {
            Some(argb) => argb as i32,
            None => {
                self.warnings.warn(|| out_of_bounds(x, y));
                0
            }
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, argb: i32) {
        if !self.surface.set_pixel(x.into(), y.into(), argb as u32) {
            self.warnings.warn(|| out_of_bounds(x, y));
        }
    }

    fn report_progress(&mut self, done: i32, total: i32) {
        if let Some(p) = self.progress.update(done, total, self.warnings) {
            (self.on_progress)(p);
        }
    }

    fn warnings(&mut self) -> &mut WarningLog {
        self.warnings
    }

    fn should_stop(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/host.rs"]
mod tests;
