use std::path::Path;

use anyhow::Context;

use crate::foundation::error::PixResult;
use crate::surface::pixel::PixelSurface;

/// Decode an image file (any format `image` can read) into an ARGB surface.
pub fn load_surface(path: impl AsRef<Path>) -> PixResult<PixelSurface> {
    let path = path.as_ref();
    let dyn_img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelSurface::from_rgba8(width, height, rgba.as_raw())
}

/// Decode encoded image bytes into an ARGB surface.
pub fn decode_surface(bytes: &[u8]) -> PixResult<PixelSurface> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelSurface::from_rgba8(width, height, rgba.as_raw())
}

/// Encode a surface to `path`; the format is chosen from the file extension.
pub fn save_surface(surface: &PixelSurface, path: impl AsRef<Path>) -> PixResult<()> {
    let path = path.as_ref();
    let format = image::ImageFormat::from_path(path)
        .with_context(|| format!("unsupported image file type '{}'", path.display()))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let rgba = surface.to_rgba8();
    match format {
        // These encoders have no alpha channel.
        image::ImageFormat::Jpeg | image::ImageFormat::Bmp => {
            let rgb: Vec<u8> = rgba
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            image::save_buffer_with_format(
                path,
                &rgb,
                surface.width(),
                surface.height(),
                image::ColorType::Rgb8,
                format,
            )
        }
        _ => image::save_buffer_with_format(
            path,
            &rgba,
            surface.width(),
            surface.height(),
            image::ColorType::Rgba8,
            format,
        ),
    }
    .with_context(|| format!("write image '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/surface/io.rs"]
mod tests;
