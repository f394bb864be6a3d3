//! The compositing pipeline.
//!
//! ```text
//! template ──► luma plane ──► locate ──► face (+ spine, reference white)
//!                                          │
//! cover ─────────────────────► fit_cover ──┤
//!                                          ▼
//!                              shading map × fitted cover
//!                                          │
//!                 copy of template ◄── write back (optionally feathered)
//! ```
//!
//! [`composite`] is a pure function: the template and cover are only read,
//! and the result is a fresh RGB image the size of the template. Every
//! failure is local to the (template, cover) pair and recoverable by the
//! caller.

use super::calculations::Rect;
use super::fitter::fit_cover;
use super::locator::{TemplateRegion, locate};
use super::luma::{luma_plane, median_u8};
use super::params::CompositeParams;
use super::shading::{FeatherMask, ShadingMap, write_patch};
use crate::catalog::TemplateCatalog;
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    #[error("No book region found: template is indistinguishable from its background")]
    RegionNotFound,
    #[error("Invalid geometry: computed region is {width}x{height}")]
    InvalidGeometry { width: i64, height: i64 },
    #[error("Invalid target size: {width}x{height}")]
    InvalidTargetSize { width: i64, height: i64 },
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

impl CompositeError {
    /// Whether a batch can skip this pair and carry on.
    ///
    /// Always true: nothing in the core is fatal beyond one pair. The method
    /// exists so callers state the policy instead of assuming it.
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Short machine-friendly label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CompositeError::RegionNotFound => "region-not-found",
            CompositeError::InvalidGeometry { .. } => "invalid-geometry",
            CompositeError::InvalidTargetSize { .. } => "invalid-target-size",
            CompositeError::DimensionMismatch { .. } => "dimension-mismatch",
        }
    }
}

/// A finished composite and where the cover went.
#[derive(Debug, Clone)]
pub struct Composite {
    pub image: RgbImage,
    pub region: TemplateRegion,
}

/// Per-channel median of the leftmost `columns` columns of `img`.
pub fn edge_color(img: &RgbImage, columns: u32) -> Rgb<u8> {
    let columns = columns.clamp(1, img.width().max(1)).min(img.width());
    let mut channels: [Vec<u8>; 3] = Default::default();
    for y in 0..img.height() {
        for x in 0..columns {
            let px = img.get_pixel(x, y);
            for c in 0..3 {
                channels[c].push(px[c]);
            }
        }
    }
    let mut out = [0u8; 3];
    for (c, samples) in channels.iter_mut().enumerate() {
        out[c] = median_u8(samples).map(|m| m.round() as u8).unwrap_or(0);
    }
    Rgb(out)
}

/// Composite `cover` onto `template`.
///
/// The template is looked up in `catalog` by `template_id`; a hit uses the
/// calibrated fractional placement, a miss falls back to automatic detection.
pub fn composite(
    template: &DynamicImage,
    cover: &DynamicImage,
    template_id: &str,
    catalog: &TemplateCatalog,
    params: &CompositeParams,
) -> Result<Composite, CompositeError> {
    let mut output = template.to_rgb8();
    let gray = luma_plane(&output);

    let entry = catalog.lookup(template_id);
    let region = locate(&gray, entry, params.border_offset, &params.detection)?;
    let face = region.face;
    tracing::debug!(
        template = template_id,
        mode = if entry.is_some() { "catalog" } else { "auto" },
        ?face,
        "located face"
    );

    let fitted = fit_cover(
        &cover.to_rgb8(),
        face.width as i64,
        face.height as i64,
        &params.fit,
    )?;

    if let Some(spine) = region.spine {
        paint_spine(&mut output, &gray, &spine, &fitted, &region, params)?;
    }

    let shading = if region.flat {
        ShadingMap::flat(face.width, face.height)
    } else {
        ShadingMap::from_luma(&gray, &face, region.reference_white)
    };
    let patch = shading.apply(&fitted)?;
    let mask = FeatherMask::new(face.width, face.height, params.shade.feather_radius);
    write_patch(&mut output, &face, &patch, mask.as_ref())?;

    Ok(Composite {
        image: output,
        region,
    })
}

/// Fill the spine with the cover's edge color, shaded by the spine's own luma.
fn paint_spine(
    output: &mut RgbImage,
    gray: &image::GrayImage,
    spine: &Rect,
    fitted: &RgbImage,
    region: &TemplateRegion,
    params: &CompositeParams,
) -> Result<(), CompositeError> {
    let color = edge_color(fitted, params.shade.spine_strip);
    let shading = if region.flat {
        ShadingMap::flat(spine.width, spine.height)
    } else {
        ShadingMap::from_luma(gray, spine, region.reference_white)
    };
    write_patch(output, spine, &shading.apply_uniform(color), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::imaging::{DetectionParams, FractionalRegion, ShadeParams};
    use crate::test_helpers::{book_template, gray_template, spine_book_template};

    fn solid_cover(w: u32, h: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)))
    }

    fn assert_untouched_outside(original: &RgbImage, result: &RgbImage, rects: &[Rect]) {
        assert_eq!(original.dimensions(), result.dimensions());
        for (x, y, px) in result.enumerate_pixels() {
            if rects.iter().any(|r| r.contains(x, y)) {
                continue;
            }
            assert_eq!(px, original.get_pixel(x, y), "pixel ({x}, {y}) changed");
        }
    }

    // =========================================================================
    // Catalog (fixed-fraction) placement
    // =========================================================================

    #[test]
    fn catalog_placement_writes_only_the_face() {
        let template = gray_template(200, 100, 255);
        let catalog = TemplateCatalog::new().with_entry(
            "t.jpg",
            CatalogEntry::new(FractionalRegion::new(10.0, 20.0, 50.0, 60.0)),
        );
        let cover = solid_cover(64, 64, [200, 40, 40]);

        let result = composite(
            &DynamicImage::ImageRgb8(template.clone()),
            &cover,
            "t.jpg",
            &catalog,
            &CompositeParams::default(),
        )
        .unwrap();

        let face = result.region.face;
        assert_eq!(
            face,
            Rect {
                x: 20,
                y: 20,
                width: 100,
                height: 60
            }
        );
        assert_untouched_outside(&template, &result.image, &[face]);
        // White template, white reference: the cover comes through unchanged
        assert_eq!(result.image.get_pixel(70, 50).0, [200, 40, 40]);
    }

    #[test]
    fn catalog_placement_shades_with_template_luma() {
        let template = gray_template(100, 100, 128);
        let catalog = TemplateCatalog::new().with_entry(
            "t.jpg",
            CatalogEntry::new(FractionalRegion::new(0.0, 0.0, 100.0, 100.0)),
        );
        let cover = solid_cover(10, 10, [255, 255, 255]);
        let result = composite(
            &DynamicImage::ImageRgb8(template),
            &cover,
            "t.jpg",
            &catalog,
            &CompositeParams::default(),
        )
        .unwrap();
        // 255 * 128/255 = 128
        assert_eq!(result.image.get_pixel(50, 50).0, [128, 128, 128]);
    }

    #[test]
    fn flat_entry_skips_shading() {
        let template = gray_template(100, 100, 60);
        let catalog = TemplateCatalog::new().with_entry(
            "sheet.jpg",
            CatalogEntry {
                flat: true,
                ..CatalogEntry::new(FractionalRegion::new(10.0, 10.0, 80.0, 80.0))
            },
        );
        let cover = solid_cover(20, 20, [10, 150, 250]);
        let result = composite(
            &DynamicImage::ImageRgb8(template),
            &cover,
            "sheet.jpg",
            &catalog,
            &CompositeParams::default(),
        )
        .unwrap();
        assert!(result.region.flat);
        assert_eq!(result.image.get_pixel(50, 50).0, [10, 150, 250]);
    }

    #[test]
    fn template_and_cover_are_not_mutated() {
        let template = DynamicImage::ImageRgb8(gray_template(50, 50, 200));
        let cover = solid_cover(8, 8, [1, 2, 3]);
        let before_t = template.clone();
        let before_c = cover.clone();
        let catalog = TemplateCatalog::new().with_entry(
            "t.jpg",
            CatalogEntry::new(FractionalRegion::new(10.0, 10.0, 50.0, 50.0)),
        );
        composite(&template, &cover, "t.jpg", &catalog, &CompositeParams::default()).unwrap();
        assert_eq!(template, before_t);
        assert_eq!(cover, before_c);
    }

    #[test]
    fn rgba_template_produces_rgb_output() {
        let template = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            30,
            20,
            image::Rgba([255, 255, 255, 255]),
        ));
        let catalog = TemplateCatalog::new()
            .with_entry("t.png", CatalogEntry::new(FractionalRegion::FULL_FRAME));
        let result = composite(
            &template,
            &solid_cover(5, 5, [9, 9, 9]),
            "t.png",
            &catalog,
            &CompositeParams::default(),
        )
        .unwrap();
        assert_eq!(result.image.dimensions(), (30, 20));
    }

    // =========================================================================
    // Automatic detection
    // =========================================================================

    #[test]
    fn blank_template_is_region_not_found() {
        let template = DynamicImage::ImageRgb8(gray_template(100, 100, 128));
        let result = composite(
            &template,
            &solid_cover(10, 10, [0, 0, 0]),
            "blank.jpg",
            &TemplateCatalog::new(),
            &CompositeParams::default(),
        );
        assert!(matches!(result, Err(CompositeError::RegionNotFound)));
    }

    #[test]
    fn auto_detection_places_cover_on_book() {
        let book = Rect {
            x: 30,
            y: 20,
            width: 60,
            height: 80,
        };
        let template = book_template(150, 120, book);
        let result = composite(
            &DynamicImage::ImageRgb8(template.clone()),
            &solid_cover(300, 400, [250, 0, 0]),
            "unknown.jpg",
            &TemplateCatalog::new(),
            &CompositeParams::default(),
        )
        .unwrap();

        assert_eq!(result.region.face, book);
        assert_untouched_outside(&template, &result.image, &[book]);
        // Book luma equals the reference white: unshaded red
        assert_eq!(result.image.get_pixel(60, 60).0, [250, 0, 0]);
    }

    #[test]
    fn spine_gets_flat_shaded_color() {
        let book = Rect {
            x: 20,
            y: 10,
            width: 80,
            height: 70,
        };
        let template = spine_book_template(140, 100, book, 12);
        let params = CompositeParams {
            detection: DetectionParams::default(),
            shade: ShadeParams {
                spine_strip: 4,
                ..ShadeParams::default()
            },
            ..CompositeParams::default()
        };
        let result = composite(
            &DynamicImage::ImageRgb8(template.clone()),
            &solid_cover(200, 200, [0, 200, 100]),
            "spine.jpg",
            &TemplateCatalog::new(),
            &params,
        )
        .unwrap();

        let spine = result.region.spine.unwrap();
        assert_untouched_outside(&template, &result.image, &[spine, result.region.face]);
        // Spine luma 120, reference 250: 200 * 0.48 = 96, 100 * 0.48 = 48
        assert_eq!(result.image.get_pixel(25, 40).0, [0, 96, 48]);
    }

    #[test]
    fn feathering_stays_inside_the_face() {
        let book = Rect {
            x: 30,
            y: 20,
            width: 60,
            height: 80,
        };
        let template = book_template(150, 120, book);
        let params = CompositeParams {
            shade: ShadeParams {
                feather_radius: 4,
                ..ShadeParams::default()
            },
            ..CompositeParams::default()
        };
        let result = composite(
            &DynamicImage::ImageRgb8(template.clone()),
            &solid_cover(60, 80, [0, 0, 0]),
            "unknown.jpg",
            &TemplateCatalog::new(),
            &params,
        )
        .unwrap();
        assert_untouched_outside(&template, &result.image, &[book]);
        // Border pixel keeps most of the template, centre is fully cover
        assert!(result.image.get_pixel(30, 60)[0] > 150);
        assert!(result.image.get_pixel(60, 60)[0] <= 2);
    }

    // =========================================================================
    // Helpers and errors
    // =========================================================================

    #[test]
    fn edge_color_is_median_of_left_strip() {
        let img = RgbImage::from_fn(10, 3, |x, y| {
            if x < 2 {
                Rgb([10 + y as u8, 20, 30])
            } else {
                Rgb([255, 255, 255])
            }
        });
        assert_eq!(edge_color(&img, 2).0, [11, 20, 30]);
    }

    #[test]
    fn edge_color_clamps_strip_to_width() {
        let img = RgbImage::from_pixel(3, 3, Rgb([5, 6, 7]));
        assert_eq!(edge_color(&img, 50).0, [5, 6, 7]);
        assert_eq!(edge_color(&img, 0).0, [5, 6, 7]);
    }

    #[test]
    fn every_error_is_recoverable() {
        let errors = [
            CompositeError::RegionNotFound,
            CompositeError::InvalidGeometry {
                width: 0,
                height: -1,
            },
            CompositeError::InvalidTargetSize {
                width: 0,
                height: 0,
            },
            CompositeError::DimensionMismatch {
                expected: (1, 1),
                actual: (2, 2),
            },
        ];
        assert!(errors.iter().all(CompositeError::is_recoverable));
        assert_eq!(errors[0].kind(), "region-not-found");
    }
}
