//! Luminance conversion and median helpers.
//!
//! Templates are analysed on an 8-bit grayscale plane computed with the
//! ITU-R 601 luma weights (`0.299 R + 0.587 G + 0.114 B`), rounded to the
//! nearest integer. `image`'s own `to_luma8` uses Rec. 709 weights, which
//! shift thresholds on warm-lit photographs, so the conversion lives here.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Luma of a single RGB pixel, unrounded.
#[inline]
pub fn luminance(px: &Rgb<u8>) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

/// Convert an RGB image into an 8-bit luma plane.
pub fn luma_plane(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let l = luminance(img.get_pixel(x, y)).round().clamp(0.0, 255.0);
        Luma([l as u8])
    })
}

/// Median of a set of 8-bit samples.
///
/// Even-length input averages the two middle values. Empty input yields `None`.
pub fn median_u8(samples: &mut [u8]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();
    let mid = samples.len() / 2;
    if samples.len() % 2 == 0 {
        Some((samples[mid - 1] as f64 + samples[mid] as f64) / 2.0)
    } else {
        Some(samples[mid] as f64)
    }
}
