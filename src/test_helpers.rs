//! Synthetic templates for the test suite.
//!
//! Real mockup photographs are too large to check in, so tests build small
//! stand-ins in memory: a dark backdrop with a bright book, optionally with a
//! mid-gray spine on its left.
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let template = book_template(150, 120, Rect { x: 30, y: 20, width: 60, height: 80 });
//! ```

use crate::imaging::Rect;
use image::{Rgb, RgbImage};

/// Backdrop luma used by every synthetic template.
pub const BACKDROP: u8 = 40;
/// Book face (paper) luma.
pub const PAPER: u8 = 250;
/// Spine luma.
pub const SPINE: u8 = 120;

/// A uniform gray template.
pub fn gray_template(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// A paper-white book at `book` on a dark backdrop.
pub fn book_template(width: u32, height: u32, book: Rect) -> RgbImage {
    spine_book_template(width, height, book, 0)
}

/// Like [`book_template`], with the leftmost `spine_width` columns of the
/// book painted mid-gray.
pub fn spine_book_template(width: u32, height: u32, book: Rect, spine_width: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = if !book.contains(x, y) {
            BACKDROP
        } else if x < book.x + spine_width {
            SPINE
        } else {
            PAPER
        };
        Rgb([v, v, v])
    })
}
