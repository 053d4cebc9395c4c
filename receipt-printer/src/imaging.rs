//! Image preparation: load, desaturate and scale to the print head width
//!
//! The encoders expect a bitmap exactly `dot_width` dots wide. These helpers
//! get an arbitrary image file there.

use crate::error::EncodingError;
use image::DynamicImage;
use image::imageops::FilterType;
use std::path::Path;
use tracing::{info, instrument};

/// Open an image file
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage, EncodingError> {
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|e| EncodingError::RasterizeFailed(format!("{}: {}", path.display(), e)))?;
    info!(width = img.width(), height = img.height(), "image opened");
    Ok(img)
}

/// Pixels with alpha below this are treated as paper
pub const ALPHA_CUTOFF: u8 = 128;

/// Strip color, keeping 8-bit luma.
///
/// Mostly transparent pixels become white so they print nothing.
pub fn desaturate(img: &DynamicImage) -> DynamicImage {
    let mut gray = img.to_luma8();
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        for (dst, src) in gray.pixels_mut().zip(rgba.pixels()) {
            if src[3] < ALPHA_CUTOFF {
                dst[0] = 255;
            }
        }
    }
    DynamicImage::ImageLuma8(gray)
}

/// Height after scaling `width x height` to `target_width`, never below 1
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let ratio = target_width as f64 / width as f64;
    ((height as f64 * ratio).round() as u32).max(1)
}

/// Scale to `target_width`, preserving aspect ratio. Scales up as well as down.
pub fn resize_to_width(
    img: &DynamicImage,
    target_width: u32,
) -> Result<DynamicImage, EncodingError> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 || target_width == 0 {
        return Err(EncodingError::EmptyBitmap {
            width: w.min(target_width),
            height: h,
        });
    }
    if w == target_width {
        return Ok(img.clone());
    }

    let new_h = scaled_height(w, h, target_width);
    Ok(img.resize_exact(target_width, new_h, FilterType::Nearest))
}

/// Desaturate then resize, ready for an encoder
#[instrument(skip(img), fields(src_width = img.width(), src_height = img.height()))]
pub fn prepare_for_print(
    img: &DynamicImage,
    dot_width: u32,
) -> Result<DynamicImage, EncodingError> {
    let gray = desaturate(img);
    let prepared = resize_to_width(&gray, dot_width)?;
    info!(
        width = prepared.width(),
        height = prepared.height(),
        "image prepared"
    );
    Ok(prepared)
}
