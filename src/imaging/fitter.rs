//! Cover fitting: crop-to-fill without distortion.
//!
//! The cover is center-cropped to the face's aspect ratio, then resampled
//! with Lanczos3 to the exact face size. Covers are often text-heavy, so the
//! filter choice matters more than speed here.
//!
//! With a non-zero bleed the crop is resampled `bleed` pixels larger on every
//! side and the centre is cut back out. The outermost pixels of a resampled
//! crop are softened by the filter running off the crop edge; trimming them
//! removes the light seam they leave against the template.

use super::calculations::{calculate_bleed_dimensions, calculate_center_crop};
use super::compositor::CompositeError;
use super::params::FitParams;
use image::RgbImage;
use image::imageops::{self, FilterType};

/// Fit `cover` to exactly `width` x `height`.
///
/// Fails with [`CompositeError::InvalidTargetSize`] when either target
/// dimension is not positive, or the cover itself is empty.
pub fn fit_cover(
    cover: &RgbImage,
    width: i64,
    height: i64,
    params: &FitParams,
) -> Result<RgbImage, CompositeError> {
    if width <= 0 || height <= 0 || cover.width() == 0 || cover.height() == 0 {
        return Err(CompositeError::InvalidTargetSize { width, height });
    }
    let target = (width as u32, height as u32);

    let (cx, cy, cw, ch) = calculate_center_crop(cover.dimensions(), target);
    tracing::debug!(
        source = ?cover.dimensions(),
        crop = ?(cx, cy, cw, ch),
        ?target,
        bleed = params.bleed,
        "fitting cover"
    );
    let cropped = imageops::crop_imm(cover, cx, cy, cw, ch).to_image();

    if params.bleed == 0 {
        return Ok(imageops::resize(&cropped, target.0, target.1, FilterType::Lanczos3));
    }

    let (bw, bh) = calculate_bleed_dimensions(target, params.bleed);
    let oversized = imageops::resize(&cropped, bw, bh, FilterType::Lanczos3);
    Ok(imageops::crop_imm(&oversized, params.bleed, params.bleed, target.0, target.1).to_image())
}
