//! Region location: where on the template the cover goes.
//!
//! Two strategies, picked by whether the template has a catalog entry:
//!
//! - **Fixed fraction** — the entry's percentages are resolved against the
//!   template size (see [`resolve_fractional`]) and inset by the border offset.
//! - **Automatic detection** — the background is estimated from the four
//!   corners, everything that differs from it by more than the margin is the
//!   book, and the bounding box of that mask is the book outline. A bright
//!   run on the box's mid-line separates a darker spine from the face, and the
//!   median luma inside the face becomes the paper-white reference.
//!
//! ```text
//!   corners → bg         |luma - bg| > margin          bright run ≥ N
//!   ┌───────────────┐    ┌───────────────┐             ┌──┬────────────┐
//!   │               │    │   ┌───────┐   │             │sp│   face     │
//!   │   template    │ →  │   │ mask  │   │  →  bbox →  │in│            │
//!   │               │    │   └───────┘   │             │e │            │
//!   └───────────────┘    └───────────────┘             └──┴────────────┘
//! ```

use super::calculations::{Rect, resolve_fractional};
use super::compositor::CompositeError;
use super::luma::median_u8;
use super::params::DetectionParams;
use crate::catalog::CatalogEntry;
use image::GrayImage;

/// Paper-white reference used when nothing better is known.
pub const FULL_WHITE: f64 = 255.0;

/// Where and how to composite on one template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateRegion {
    /// Front face receiving the cover design.
    pub face: Rect,
    /// Spine strip left of the face, when one was detected.
    pub spine: Option<Rect>,
    /// Luma treated as unshaded paper.
    pub reference_white: f64,
    /// Flat reference template: paste without shading.
    pub flat: bool,
}

/// Outline of the non-background area of a template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Bounding box of every foreground pixel.
    pub bounds: Rect,
    /// Corner-sampled background luma.
    pub background: f64,
}

/// Resolve fixed-fraction placement for a catalog entry.
///
/// Computed width or height of zero or less is raised to one pixel; the
/// rectangle is then clamped to the template. Only a rectangle that lies
/// entirely outside the template is an error.
pub fn locate_fixed(
    template: (u32, u32),
    entry: &CatalogEntry,
    border_offset: u32,
) -> Result<Rect, CompositeError> {
    let offset = entry.offset.unwrap_or(border_offset);
    let (x, y, w, h) = resolve_fractional(&entry.region(), template, offset);
    Rect::within(x, y, w.max(1), h.max(1), template).ok_or(CompositeError::InvalidGeometry {
        width: w,
        height: h,
    })
}

/// Corner-sampled background luma.
fn background_luma(gray: &GrayImage, inset: u32) -> f64 {
    let (w, h) = gray.dimensions();
    let near = |dim: u32| inset.min(dim - 1);
    let far = |dim: u32| dim.saturating_sub(inset).min(dim - 1);
    let mut corners = [
        gray.get_pixel(near(w), near(h))[0],
        gray.get_pixel(far(w), near(h))[0],
        gray.get_pixel(near(w), far(h))[0],
        gray.get_pixel(far(w), far(h))[0],
    ];
    median_u8(&mut corners).unwrap_or(0.0)
}

/// Find the bounding box of everything that is not background.
///
/// Returns `None` when no pixel differs from the background by more than
/// `params.margin`, e.g. a uniformly colored image.
pub fn detect_bounds(gray: &GrayImage, params: &DetectionParams) -> Option<Detection> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let background = background_luma(gray, params.corner_inset);
    let margin = params.margin as f64;

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for (x, y, px) in gray.enumerate_pixels() {
        if (px[0] as f64 - background).abs() > margin {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x == u32::MAX {
        return None;
    }

    Some(Detection {
        bounds: Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        },
        background,
    })
}

/// Column where the face begins, scanning the box's mid-line left to right.
///
/// Each column is the mean luma of `strip_height` rows centred on the
/// vertical midpoint. Returns `None` when no run of `min_bright_run` bright
/// columns exists inside the box.
fn find_face_start(gray: &GrayImage, bounds: &Rect, params: &DetectionParams) -> Option<u32> {
    let mid = bounds.y + bounds.height / 2;
    let half = params.strip_height / 2;
    let top = mid.saturating_sub(half).max(bounds.y);
    let bottom = (top + params.strip_height).min(bounds.bottom());
    let rows = (bottom - top).max(1) as f64;
    let threshold = params.bright_threshold as f64;

    let mut run_start = None;
    let mut run_len = 0;
    for x in bounds.x..bounds.right() {
        let sum: f64 = (top..bottom).map(|y| gray.get_pixel(x, y)[0] as f64).sum();
        if sum / rows > threshold {
            if run_len == 0 {
                run_start = Some(x);
            }
            run_len += 1;
            if run_len >= params.min_bright_run {
                return run_start;
            }
        } else {
            run_len = 0;
        }
    }
    None
}

/// Median luma of the face, inset from its edges to stay clear of shadows.
///
/// Falls back to the whole face when the inset would leave nothing.
pub fn reference_white(gray: &GrayImage, face: &Rect, inset: u32) -> f64 {
    let area = face.inset(inset).unwrap_or(*face);
    let mut samples: Vec<u8> = (area.y..area.bottom())
        .flat_map(|y| (area.x..area.right()).map(move |x| (x, y)))
        .map(|(x, y)| gray.get_pixel(x, y)[0])
        .collect();
    median_u8(&mut samples).unwrap_or(FULL_WHITE).max(1.0)
}

/// Locate the face (and spine) automatically.
pub fn locate_auto(gray: &GrayImage, params: &DetectionParams) -> Result<TemplateRegion, CompositeError> {
    let detection = detect_bounds(gray, params).ok_or(CompositeError::RegionNotFound)?;
    let bounds = detection.bounds;

    let split = if params.detect_spine {
        find_face_start(gray, &bounds, params).filter(|&start| start > bounds.x)
    } else {
        None
    };

    let (face, spine) = match split {
        Some(start) => {
            let spine = Rect {
                width: start - bounds.x,
                ..bounds
            };
            let face = Rect {
                x: start,
                width: bounds.right() - start,
                ..bounds
            };
            (face, Some(spine))
        }
        None => (bounds, None),
    };

    let white = reference_white(gray, &face, params.reference_inset);
    tracing::debug!(
        ?face,
        ?spine,
        background = detection.background,
        reference_white = white,
        "detected template region"
    );

    Ok(TemplateRegion {
        face,
        spine,
        reference_white: white,
        flat: false,
    })
}

/// Locate the compositing region, preferring the catalog entry when present.
pub fn locate(
    gray: &GrayImage,
    entry: Option<&CatalogEntry>,
    border_offset: u32,
    params: &DetectionParams,
) -> Result<TemplateRegion, CompositeError> {
    match entry {
        Some(entry) => {
            let face = locate_fixed(gray.dimensions(), entry, border_offset)?;
            Ok(TemplateRegion {
                face,
                spine: None,
                reference_white: entry.reference_white.unwrap_or(FULL_WHITE),
                flat: entry.flat,
            })
        }
        None => locate_auto(gray, params),
    }
}
