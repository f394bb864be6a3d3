//! The compositing core, built on the `image` crate.
//!
//! | Stage | Module | Function |
//! |---|---|---|
//! | **Locate** | [`locator`] | fixed fraction from the catalog, or corner-background detection |
//! | **Fit** | [`fitter`] | center crop to the face aspect, Lanczos3 resize, optional bleed |
//! | **Shade** | [`shading`] | `min(luma / white, 1)` multiply, optional feathered seam |
//! | **Composite** | [`compositor`] | orchestration and write-back into a template copy |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for rectangle and crop math (unit testable)
//! - **Parameters**: Numeric knobs for every stage
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`] for decode/encode
//! - **Stages**: locator, fitter, shading, compositor

pub mod backend;
mod calculations;
pub mod compositor;
pub mod fitter;
pub mod locator;
pub mod luma;
mod params;
pub mod rust_backend;
pub mod shading;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{
    FractionalRegion, Rect, calculate_bleed_dimensions, calculate_center_crop,
    fractional_from_bounds, resolve_fractional,
};
pub use compositor::{Composite, CompositeError, composite};
pub use fitter::fit_cover;
pub use locator::{TemplateRegion, locate};
pub use params::{CompositeParams, DetectionParams, FitParams, Quality, ShadeParams};
pub use rust_backend::RustBackend;
pub use shading::{FeatherMask, ShadingMap};
