//! ARGB channel decomposition and composition.
//!
//! Composition helpers take integer-like input. Anything outside `[0,255]` is clamped; the
//! warning log is told about it, but the clamped value is used either way.

use crate::surface::warnings::WarningLog;

/// Opaque alpha.
pub const OPAQUE: u32 = 0xff;

/// Alpha channel of a packed ARGB value.
pub const fn alpha(argb: u32) -> u32 {
    (argb >> 24) & 0xff
}

/// Red channel of a packed ARGB value.
pub const fn red(argb: u32) -> u32 {
    (argb >> 16) & 0xff
}

/// Green channel of a packed ARGB value.
pub const fn green(argb: u32) -> u32 {
    (argb >> 8) & 0xff
}

/// Blue channel of a packed ARGB value.
pub const fn blue(argb: u32) -> u32 {
    argb & 0xff
}

/// Pack four channels that are already known to be in range.
pub const fn pack_argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    ((a & 0xff) << 24) | ((r & 0xff) << 16) | ((g & 0xff) << 8) | (b & 0xff)
}

/// Clamp `val` into `[min, max]`.
pub fn limit(val: i64, min: i64, max: i64) -> i64 {
    if val < min {
        min
    } else if val > max {
        max
    } else {
        val
    }
}

/// Clamp one channel into `[0,255]`, warning when the input was out of range.
pub fn clamp_channel(value: i64, name: &str, warnings: &mut WarningLog) -> u32 {
    if !(0..=0xff).contains(&value) {
        warnings.warn(|| format!("Color value {value} for {name} is not in the range [0,255]"));
    }
    limit(value, 0, 0xff) as u32
}

/// Compose an ARGB value from four channels.
pub fn make_argb(a: i64, r: i64, g: i64, b: i64, warnings: &mut WarningLog) -> u32 {
    let a = clamp_channel(a, "alpha", warnings);
    let r = clamp_channel(r, "red", warnings);
    let g = clamp_channel(g, "green", warnings);
    let b = clamp_channel(b, "blue", warnings);
    pack_argb(a, r, g, b)
}

/// Compose an opaque ARGB value from three channels.
pub fn make_rgb(r: i64, g: i64, b: i64, warnings: &mut WarningLog) -> u32 {
    let r = clamp_channel(r, "red", warnings);
    let g = clamp_channel(g, "green", warnings);
    let b = clamp_channel(b, "blue", warnings);
    pack_argb(OPAQUE, r, g, b)
}

#[cfg(test)]
#[path = "../../tests/unit/surface/channel.rs"]
mod tests;
