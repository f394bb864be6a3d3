//! End-to-end properties of the compositing pipeline, exercised through the
//! public library API only.

use cover_mockup::catalog::{CatalogEntry, TemplateCatalog};
use cover_mockup::imaging::locator::locate_fixed;
use cover_mockup::imaging::luma::luma_plane;
use cover_mockup::imaging::{
    CompositeError, CompositeParams, DetectionParams, FitParams, FractionalRegion, Rect,
    ShadingMap, calculate_center_crop, composite, fit_cover, locate,
};
use image::{DynamicImage, Rgb, RgbImage};

/// Dark backdrop with a paper book whose right half falls into shadow.
fn shaded_book(width: u32, height: u32, book: Rect) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if !book.contains(x, y) {
            Rgb([30, 35, 40])
        } else if x < book.x + book.width / 2 {
            Rgb([245, 245, 245])
        } else {
            Rgb([150, 150, 150])
        }
    })
}

fn solid_cover(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

// =============================================================================
// Fixed-fraction placement and fitting
// =============================================================================

#[test]
fn fixed_fraction_worked_example() {
    let mut entry = CatalogEntry::new(FractionalRegion::new(20.0, 10.0, 60.0, 80.0));
    entry.offset = Some(1);

    let face = locate_fixed((1000, 1500), &entry, 0).unwrap();
    assert_eq!(
        face,
        Rect {
            x: 201,
            y: 151,
            width: 598,
            height: 1198
        }
    );
    // Pure function of its inputs
    assert_eq!(locate_fixed((1000, 1500), &entry, 0).unwrap(), face);

    // The 800x600 cover is too short for a height crop; it loses width instead.
    assert_eq!(
        calculate_center_crop((800, 600), (598, 1198)),
        (250, 0, 299, 600)
    );

    let cover = RgbImage::from_pixel(800, 600, Rgb([10, 120, 200]));
    let fitted = fit_cover(&cover, 598, 1198, &FitParams::default()).unwrap();
    assert_eq!(fitted.dimensions(), (598, 1198));
}

#[test]
fn degenerate_fit_target_is_rejected() {
    let cover = RgbImage::from_pixel(10, 10, Rgb([1, 2, 3]));
    assert_eq!(
        fit_cover(&cover, 0, 10, &FitParams::default()),
        Err(CompositeError::InvalidTargetSize {
            width: 0,
            height: 10
        })
    );
}

#[test]
fn builtin_catalog_resolves_template_paths() {
    let catalog = TemplateCatalog::builtin();
    let template = DynamicImage::ImageRgb8(shaded_book(
        500,
        500,
        Rect {
            x: 100,
            y: 20,
            width: 300,
            height: 460,
        },
    ));
    let cover = solid_cover(200, 300, [220, 40, 40]);

    let result = composite(
        &template,
        &cover,
        "mockups/base_bottom_app.jpg",
        &catalog,
        &CompositeParams::default(),
    )
    .unwrap();

    let expected = locate_fixed(
        (500, 500),
        catalog.lookup("base_bottom_app.jpg").unwrap(),
        0,
    )
    .unwrap();
    assert_eq!(result.region.face, expected);
    assert_eq!(result.region.spine, None);
}

// =============================================================================
// Automatic detection
// =============================================================================

#[test]
fn uniform_template_is_region_not_found() {
    let template = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([128, 128, 128])));
    let gray = luma_plane(&template.to_rgb8());

    assert_eq!(
        locate(&gray, None, 0, &DetectionParams::default()),
        Err(CompositeError::RegionNotFound)
    );

    let err = composite(
        &template,
        &solid_cover(10, 10, [0, 0, 0]),
        "gray.jpg",
        &TemplateCatalog::new(),
        &CompositeParams::default(),
    )
    .unwrap_err();
    assert_eq!(err, CompositeError::RegionNotFound);
    assert!(err.is_recoverable());
}

#[test]
fn detected_face_matches_book_outline() {
    let book = Rect {
        x: 40,
        y: 30,
        width: 120,
        height: 160,
    };
    let template = DynamicImage::ImageRgb8(shaded_book(220, 240, book));

    let result = composite(
        &template,
        &solid_cover(90, 120, [200, 200, 200]),
        "unknown.jpg",
        &TemplateCatalog::new(),
        &CompositeParams::default(),
    )
    .unwrap();

    // The bright half starts at the book's left edge, so no spine split.
    assert_eq!(result.region.face, book);
    assert_eq!(result.region.spine, None);
}

// =============================================================================
// Composite properties
// =============================================================================

#[test]
fn composite_is_local_shaded_and_pure() {
    let book = Rect {
        x: 40,
        y: 30,
        width: 120,
        height: 160,
    };
    let template_rgb = shaded_book(220, 240, book);
    let template = DynamicImage::ImageRgb8(template_rgb.clone());
    let cover = solid_cover(300, 400, [200, 100, 50]);
    let cover_before = cover.clone();

    let first = composite(
        &template,
        &cover,
        "unknown.jpg",
        &TemplateCatalog::new(),
        &CompositeParams::default(),
    )
    .unwrap();
    let face = first.region.face;

    assert_eq!(first.image.dimensions(), template_rgb.dimensions());
    for (x, y, px) in first.image.enumerate_pixels() {
        let original = template_rgb.get_pixel(x, y);
        if face.contains(x, y) {
            // Multiplicative shading never brightens the cover
            assert!(px[0] <= 200 && px[1] <= 100 && px[2] <= 50);
        } else {
            assert_eq!(px, original, "pixel ({x}, {y}) outside the face changed");
        }
    }

    // Shadowed half is visibly darker than the lit half
    let lit = first.image.get_pixel(face.x + 10, face.y + 80)[0];
    let shadow = first.image.get_pixel(face.right() - 10, face.y + 80)[0];
    assert!(shadow < lit, "lit {lit}, shadow {shadow}");

    // Inputs untouched, output reproducible
    assert_eq!(template.to_rgb8(), template_rgb);
    assert_eq!(cover, cover_before);
    let second = composite(
        &template,
        &cover,
        "unknown.jpg",
        &TemplateCatalog::new(),
        &CompositeParams::default(),
    )
    .unwrap();
    assert_eq!(first.image, second.image);
}

#[test]
fn shading_ratios_stay_in_unit_range() {
    let book = Rect {
        x: 10,
        y: 10,
        width: 80,
        height: 60,
    };
    let gray = luma_plane(&shaded_book(100, 80, book));

    // Reference white below the paper luma: bright pixels must clip at 1.
    let map = ShadingMap::from_luma(&gray, &book, 200.0);
    assert!(map.ratios().iter().all(|r| (0.0..=1.0).contains(r)));
    assert_eq!(map.ratio(0, 0), 1.0);
    assert!(map.ratio(79, 0) < 1.0);
}

#[test]
fn flat_catalog_entry_pastes_cover_unshaded() {
    let book = Rect {
        x: 40,
        y: 30,
        width: 120,
        height: 160,
    };
    let template = DynamicImage::ImageRgb8(shaded_book(220, 240, book));
    let mut entry = CatalogEntry::new(FractionalRegion::new(25.0, 25.0, 50.0, 50.0));
    entry.flat = true;
    let catalog = TemplateCatalog::new().with_entry("studio_flat.jpg", entry);

    let result = composite(
        &template,
        &solid_cover(50, 50, [12, 34, 56]),
        "studio_flat.jpg",
        &catalog,
        &CompositeParams::default(),
    )
    .unwrap();

    let face = result.region.face;
    assert!(result.region.flat);
    for y in face.y..face.bottom() {
        for x in face.x..face.right() {
            assert_eq!(result.image.get_pixel(x, y), &Rgb([12, 34, 56]));
        }
    }
}
