//! Shadow blending: carry the template's lighting onto the cover.
//!
//! The template's luma inside the face, divided by the paper-white reference
//! and clipped to 1.0, is a per-pixel darkening factor. Multiplying the fitted
//! cover by it reproduces creases, spine shadow and lighting falloff. The
//! clip matters: areas brighter than the reference must not brighten the
//! cover.
//!
//! [`FeatherMask`] optionally fades the patch into the template over a few
//! pixels at the border so the paste has no hard rectangular seam.

use super::calculations::Rect;
use super::compositor::CompositeError;
use image::imageops;
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Per-pixel darkening factors in `[0, 1]` for one rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadingMap {
    width: u32,
    height: u32,
    ratios: Vec<f32>,
}

impl ShadingMap {
    /// Build from the template luma inside `rect`.
    ///
    /// `ratio = min(luma / reference_white, 1.0)`; a reference below 1 is
    /// treated as 1.
    pub fn from_luma(gray: &GrayImage, rect: &Rect, reference_white: f64) -> Self {
        let white = reference_white.max(1.0) as f32;
        let ratios = (rect.y..rect.bottom())
            .flat_map(|y| (rect.x..rect.right()).map(move |x| (x, y)))
            .map(|(x, y)| (gray.get_pixel(x, y)[0] as f32 / white).min(1.0))
            .collect();
        Self {
            width: rect.width,
            height: rect.height,
            ratios,
        }
    }

    /// A map that leaves the cover untouched.
    pub fn flat(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ratios: vec![1.0; (width as usize) * (height as usize)],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn ratio(&self, x: u32, y: u32) -> f32 {
        self.ratios[(y * self.width + x) as usize]
    }

    pub fn ratios(&self) -> &[f32] {
        &self.ratios
    }

    /// Multiply every channel of `cover` by the ratio at the same position.
    ///
    /// The result stays in floating point; rounding happens at write-back.
    pub fn apply(&self, cover: &RgbImage) -> Result<ShadedPatch, CompositeError> {
        self.check(cover.dimensions())?;
        let pixels = cover
            .pixels()
            .zip(&self.ratios)
            .map(|(px, &r)| [px[0] as f32 * r, px[1] as f32 * r, px[2] as f32 * r])
            .collect();
        Ok(ShadedPatch {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    /// Shade a single color across the whole map, for flat spine fills.
    pub fn apply_uniform(&self, color: Rgb<u8>) -> ShadedPatch {
        let pixels = self
            .ratios
            .iter()
            .map(|&r| [color[0] as f32 * r, color[1] as f32 * r, color[2] as f32 * r])
            .collect();
        ShadedPatch {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    fn check(&self, actual: (u32, u32)) -> Result<(), CompositeError> {
        if actual != self.dimensions() {
            tracing::error!(
                expected = ?self.dimensions(),
                ?actual,
                "shading map and fitted cover disagree in size"
            );
            return Err(CompositeError::DimensionMismatch {
                expected: self.dimensions(),
                actual,
            });
        }
        Ok(())
    }
}

/// Shaded pixels in floating point, not yet written to the template.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadedPatch {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 3]>,
}

impl ShadedPatch {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Alpha in `[0, 1]`: 1 inside, fading towards 0 at the border.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatherMask {
    width: u32,
    height: u32,
    alpha: Vec<f32>,
}

impl FeatherMask {
    /// Blur of a white mask with a black border `radius` pixels wide.
    ///
    /// Returns `None` for radius 0 (no feathering).
    pub fn new(width: u32, height: u32, radius: u32) -> Option<Self> {
        if radius == 0 || width == 0 || height == 0 {
            return None;
        }
        let mask = GrayImage::from_fn(width, height, |x, y| {
            let edge = x.min(y).min(width - 1 - x).min(height - 1 - y);
            if edge < radius { Luma([0]) } else { Luma([255]) }
        });
        let blurred = imageops::blur(&mask, radius as f32 / 2.0);
        let alpha = blurred.pixels().map(|p| p[0] as f32 / 255.0).collect();
        Some(Self {
            width,
            height,
            alpha,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn alpha(&self, x: u32, y: u32) -> f32 {
        self.alpha[(y * self.width + x) as usize]
    }
}

/// Round a float channel to 8 bits, clipping to `[0, 255]`.
#[inline]
pub fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Write `patch` into `target` at `rect`, optionally blended through `mask`.
///
/// `final = shaded * alpha + original * (1 - alpha)`. Pixels outside `rect`
/// are never touched.
pub fn write_patch(
    target: &mut RgbImage,
    rect: &Rect,
    patch: &ShadedPatch,
    mask: Option<&FeatherMask>,
) -> Result<(), CompositeError> {
    let expected = (rect.width, rect.height);
    for actual in [Some(patch.dimensions()), mask.map(FeatherMask::dimensions)]
        .into_iter()
        .flatten()
    {
        if actual != expected {
            tracing::error!(?expected, ?actual, "patch does not fit its rectangle");
            return Err(CompositeError::DimensionMismatch { expected, actual });
        }
    }

    for dy in 0..rect.height {
        for dx in 0..rect.width {
            let shaded = patch.pixel(dx, dy);
            let dst = target.get_pixel_mut(rect.x + dx, rect.y + dy);
            match mask {
                Some(mask) => {
                    let a = mask.alpha(dx, dy);
                    for c in 0..3 {
                        dst[c] = to_u8(shaded[c] * a + dst[c] as f32 * (1.0 - a));
                    }
                }
                None => {
                    for c in 0..3 {
                        dst[c] = to_u8(shaded[c]);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(width: u32, height: u32) -> Rect {
        Rect {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    // =========================================================================
    // ShadingMap tests
    // =========================================================================

    #[test]
    fn ratios_are_luma_over_white() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([[0, 100, 200, 255][x as usize]]));
        let map = ShadingMap::from_luma(&gray, &full(4, 1), 200.0);
        assert_eq!(map.ratio(0, 0), 0.0);
        assert_eq!(map.ratio(1, 0), 0.5);
        assert_eq!(map.ratio(2, 0), 1.0);
        // Brighter than the reference clips to 1.0
        assert_eq!(map.ratio(3, 0), 1.0);
    }

    #[test]
    fn ratios_are_bounded() {
        let gray = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 16 + y) as u8]));
        for white in [1.0, 37.5, 128.0, 255.0] {
            let map = ShadingMap::from_luma(&gray, &full(16, 16), white);
            assert!(map.ratios().iter().all(|r| (0.0..=1.0).contains(r)));
        }
    }

    #[test]
    fn map_covers_only_the_rect() {
        let gray = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 255 }]));
        let rect = Rect {
            x: 5,
            y: 2,
            width: 3,
            height: 4,
        };
        let map = ShadingMap::from_luma(&gray, &rect, 255.0);
        assert_eq!(map.dimensions(), (3, 4));
        assert!(map.ratios().iter().all(|&r| r == 1.0));
    }

    #[test]
    fn apply_multiplies_each_channel() {
        let gray = GrayImage::from_pixel(2, 2, Luma([128]));
        let map = ShadingMap::from_luma(&gray, &full(2, 2), 256.0);
        let cover = RgbImage::from_pixel(2, 2, Rgb([200, 100, 50]));
        let patch = map.apply(&cover).unwrap();
        assert_eq!(patch.pixel(1, 1), [100.0, 50.0, 25.0]);
    }

    #[test]
    fn flat_map_is_identity() {
        let cover = RgbImage::from_pixel(3, 2, Rgb([7, 8, 9]));
        let patch = ShadingMap::flat(3, 2).apply(&cover).unwrap();
        assert_eq!(patch.pixel(2, 1), [7.0, 8.0, 9.0]);
    }

    #[test]
    fn apply_rejects_mismatched_cover() {
        let map = ShadingMap::flat(4, 4);
        let cover = RgbImage::new(4, 5);
        assert!(matches!(
            map.apply(&cover),
            Err(CompositeError::DimensionMismatch {
                expected: (4, 4),
                actual: (4, 5)
            })
        ));
    }

    #[test]
    fn apply_uniform_shades_a_single_color() {
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 255 } else { 51 }]));
        let map = ShadingMap::from_luma(&gray, &full(2, 1), 255.0);
        let patch = map.apply_uniform(Rgb([100, 200, 255]));
        assert_eq!(patch.pixel(0, 0), [100.0, 200.0, 255.0]);
        let dark = patch.pixel(1, 0);
        assert!((dark[0] - 20.0).abs() < 1e-3);
        assert!((dark[2] - 51.0).abs() < 1e-3);
    }

    // =========================================================================
    // FeatherMask tests
    // =========================================================================

    #[test]
    fn zero_radius_has_no_mask() {
        assert!(FeatherMask::new(10, 10, 0).is_none());
    }

    #[test]
    fn feather_fades_at_border_and_is_opaque_inside() {
        let mask = FeatherMask::new(60, 60, 4).unwrap();
        assert!(mask.alpha(0, 0) < 0.2);
        assert!(mask.alpha(0, 30) < 0.3);
        assert!(mask.alpha(30, 30) > 0.99);
        assert!(mask.alpha(30, 0) < mask.alpha(30, 6));
    }

    // =========================================================================
    // write_patch tests
    // =========================================================================

    #[test]
    fn write_patch_touches_only_the_rect() {
        let mut target = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        let rect = Rect {
            x: 2,
            y: 3,
            width: 4,
            height: 2,
        };
        let patch = ShadingMap::flat(4, 2).apply_uniform(Rgb([200, 200, 200]));
        write_patch(&mut target, &rect, &patch, None).unwrap();

        for (x, y, px) in target.enumerate_pixels() {
            if rect.contains(x, y) {
                assert_eq!(px.0, [200, 200, 200]);
            } else {
                assert_eq!(px.0, [10, 20, 30]);
            }
        }
    }

    #[test]
    fn write_patch_rounds_and_clips() {
        let mut target = RgbImage::new(1, 1);
        let patch = ShadedPatch {
            width: 1,
            height: 1,
            pixels: vec![[-4.0, 127.5, 300.0]],
        };
        write_patch(&mut target, &full(1, 1), &patch, None).unwrap();
        assert_eq!(target.get_pixel(0, 0).0, [0, 128, 255]);
    }

    #[test]
    fn write_patch_blends_through_mask() {
        let mut target = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        let rect = full(40, 40);
        let patch = ShadingMap::flat(40, 40).apply_uniform(Rgb([255, 255, 255]));
        let mask = FeatherMask::new(40, 40, 3).unwrap();
        write_patch(&mut target, &rect, &patch, Some(&mask)).unwrap();

        assert!(target.get_pixel(0, 0)[0] < 64);
        assert!(target.get_pixel(20, 20)[0] >= 250);
    }

    #[test]
    fn write_patch_rejects_wrong_size() {
        let mut target = RgbImage::new(10, 10);
        let patch = ShadingMap::flat(3, 3).apply_uniform(Rgb([1, 1, 1]));
        let rect = full(4, 3);
        assert!(matches!(
            write_patch(&mut target, &rect, &patch, None),
            Err(CompositeError::DimensionMismatch { .. })
        ));
    }
}
