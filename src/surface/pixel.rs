use crate::foundation::error::{PixError, PixResult};

/// A `width x height` buffer of packed ARGB pixels, row-major, tightly packed.
///
/// Dimensions are fixed at creation. Accessors take signed coordinates and never panic:
/// out-of-bounds reads return `None` and out-of-bounds writes are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelSurface {
    /// A surface filled with `argb`.
    pub fn new(width: u32, height: u32, argb: u32) -> PixResult<Self> {
        let len = pixel_count(width, height)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|e| PixError::out_of_memory(format!("allocate {width}x{height} surface: {e}")))?;
        pixels.resize(len, argb);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Wrap an existing row-major ARGB buffer.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> PixResult<Self> {
        let len = pixel_count(width, height)?;
        if pixels.len() != len {
            return Err(PixError::invalid_operation(format!(
                "surface {width}x{height} needs {len} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a surface from straight (non-premultiplied) RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8]) -> PixResult<Self> {
        let len = pixel_count(width, height)?;
        if rgba.len() != len.saturating_mul(4) {
            return Err(PixError::invalid_operation(format!(
                "rgba8 buffer for {width}x{height} needs {} bytes, got {}",
                len.saturating_mul(4),
                rgba.len()
            )));
        }
        let pixels = rgba
            .chunks_exact(4)
            .map(|px| {
                (u32::from(px[3]) << 24)
                    | (u32::from(px[0]) << 16)
                    | (u32::from(px[1]) << 8)
                    | u32::from(px[2])
            })
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Straight RGBA8 bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &argb in &self.pixels {
            out.push((argb >> 16) as u8);
            out.push((argb >> 8) as u8);
            out.push(argb as u8);
            out.push((argb >> 24) as u8);
        }
        out
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether `(x, y)` lies inside `[0,width) x [0,height)`.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    /// Read one pixel.
    pub fn pixel(&self, x: i64, y: i64) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Write one pixel; returns `false` (and does nothing) when out of bounds.
    pub fn set_pixel(&mut self, x: i64, y: i64, argb: u32) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.pixels[i] = argb;
                true
            }
            None => false,
        }
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Size of the pixel store in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<u32>()
    }

    /// Deep copy that reports allocation failure instead of aborting.
    pub fn try_clone(&self) -> PixResult<Self> {
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(self.pixels.len()).map_err(|e| {
            PixError::out_of_memory(format!(
                "copy {}x{} surface ({} bytes): {e}",
                self.width,
                self.height,
                self.byte_len()
            ))
        })?;
        pixels.extend_from_slice(&self.pixels);
        Ok(Self {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

fn pixel_count(width: u32, height: u32) -> PixResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| PixError::out_of_memory(format!("surface {width}x{height} is too large")))
}

#[cfg(test)]
#[path = "../../tests/unit/surface/pixel.rs"]
mod tests;
