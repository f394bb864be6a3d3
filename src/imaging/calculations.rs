//! Pure geometry for template placement and cover fitting.
//!
//! All functions here are pure and testable without any I/O or images.

use serde::{Deserialize, Serialize};

/// A pixel rectangle inside an image.
///
/// Constructed through [`Rect::within`], which enforces `width > 0`,
/// `height > 0` and that the rectangle lies inside the owning image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Build a rectangle clamped to `bounds`, or `None` if nothing is left.
    pub fn within(x: i64, y: i64, width: i64, height: i64, bounds: (u32, u32)) -> Option<Rect> {
        let (bw, bh) = (bounds.0 as i64, bounds.1 as i64);
        let x0 = x.clamp(0, bw);
        let y0 = y.clamp(0, bh);
        let x1 = (x + width).clamp(0, bw);
        let y1 = (y + height).clamp(0, bh);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Shrink by `margin` on every side. Returns `None` when the inset collapses.
    pub fn inset(&self, margin: u32) -> Option<Rect> {
        let m = margin as u64;
        if (self.width as u64) <= 2 * m || (self.height as u64) <= 2 * m {
            return None;
        }
        Some(Rect {
            x: self.x + margin,
            y: self.y + margin,
            width: self.width - 2 * margin,
            height: self.height - 2 * margin,
        })
    }
}

/// Placement of a cover expressed as percentages of the template size.
///
/// `x`/`w` are percentages of the template width, `y`/`h` of its height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractionalRegion {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FractionalRegion {
    pub const FULL_FRAME: FractionalRegion = FractionalRegion {
        x: 0.0,
        y: 0.0,
        w: 100.0,
        h: 100.0,
    };

    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

impl From<[f64; 4]> for FractionalRegion {
    fn from(c: [f64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Resolve a fractional region against a template size, before clamping.
///
/// Returns `(x, y, width, height)` where each edge is `floor(pct * dim / 100)`
/// and `offset` insets the rectangle on every side. Width and height may be
/// zero or negative here; callers decide how to treat degenerate results.
///
/// # Examples
/// ```
/// # use cover_mockup::imaging::{FractionalRegion, resolve_fractional};
/// let region = FractionalRegion::new(20.0, 10.0, 60.0, 80.0);
/// assert_eq!(resolve_fractional(&region, (1000, 1500), 1), (201, 151, 598, 1198));
/// ```
pub fn resolve_fractional(
    region: &FractionalRegion,
    template: (u32, u32),
    offset: u32,
) -> (i64, i64, i64, i64) {
    let (w, h) = (template.0 as f64, template.1 as f64);
    let off = offset as i64;

    let x = (region.x * w / 100.0).floor() as i64 + off;
    let y = (region.y * h / 100.0).floor() as i64 + off;
    let width = (region.w * w / 100.0).floor() as i64 - 2 * off;
    let height = (region.h * h / 100.0).floor() as i64 - 2 * off;

    (x, y, width, height)
}

/// Express a pixel bounding box as template percentages, rounded to 0.1.
///
/// `x1..=x2`/`y1..=y2` are the first and last foreground columns and rows.
/// Width is measured edge to edge (`x2 - x1`), the same convention a
/// calibration scan has always used when seeding catalog entries.
pub fn fractional_from_bounds(
    (x1, y1, x2, y2): (u32, u32, u32, u32),
    template: (u32, u32),
) -> FractionalRegion {
    let (w, h) = (template.0 as f64, template.1 as f64);
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    FractionalRegion {
        x: round1(x1 as f64 / w * 100.0),
        y: round1(y1 as f64 / h * 100.0),
        w: round1((x2 - x1) as f64 / w * 100.0),
        h: round1((y2 - y1) as f64 / h * 100.0),
    }
}

/// Center crop of a source that matches a target aspect ratio.
///
/// Returns `(x, y, width, height)` of the crop inside the source. A source
/// wider than the target keeps its full height and loses columns on both
/// sides; otherwise it keeps its full width and loses rows.
///
/// # Examples
/// ```
/// # use cover_mockup::imaging::calculate_center_crop;
/// // 800x600 cover into a 598x1198 face: crop to 299 px wide, centered
/// assert_eq!(calculate_center_crop((800, 600), (598, 1198)), (250, 0, 299, 600));
/// ```
pub fn calculate_center_crop(source: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (src_w, src_h) = source;
    let target_aspect = target.0 as f64 / target.1 as f64;
    let source_aspect = src_w as f64 / src_h as f64;

    if source_aspect > target_aspect {
        // Source is wider: keep height, trim columns
        let crop_w = ((src_h as f64 * target_aspect).round() as u32).clamp(1, src_w);
        ((src_w - crop_w) / 2, 0, crop_w, src_h)
    } else {
        // Source is taller (or equal): keep width, trim rows
        let crop_h = ((src_w as f64 / target_aspect).round() as u32).clamp(1, src_h);
        (0, (src_h - crop_h) / 2, src_w, crop_h)
    }
}

/// Dimensions to resample to before trimming `bleed` pixels from every edge.
pub fn calculate_bleed_dimensions(target: (u32, u32), bleed: u32) -> (u32, u32) {
    (target.0 + 2 * bleed, target.1 + 2 * bleed)
}
