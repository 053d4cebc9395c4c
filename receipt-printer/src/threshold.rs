//! Fixed-cutoff monochrome conversion
//!
//! Every pixel maps to print/no-print on its own. No dithering.

use crate::bitmap::ColorSample;

/// Luminance below this prints a dot
pub const THRESHOLD: f64 = 128.0;

/// Perceptual luma (ITU-R BT.601 weights)
pub fn luminance(sample: ColorSample) -> f64 {
    0.299 * sample.r as f64 + 0.587 * sample.g as f64 + 0.114 * sample.b as f64
}

/// Decide whether a dot with the given luminance is printed.
///
/// Strictly below [`THRESHOLD`] is black; exactly 128 stays white.
pub fn is_dark_luma(luma: f64) -> bool {
    luma < THRESHOLD
}

/// Print decision for one color sample
pub fn is_dark(sample: ColorSample) -> bool {
    is_dark_luma(luminance(sample))
}
