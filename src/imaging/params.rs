//! Parameter types for the compositing pipeline.
//!
//! These structs describe *how much*, not *what*: every numeric knob that
//! used to be a per-variant magic number (detection margin, bleed, feather
//! radius) is a field here with a default. The [`config`](crate::config)
//! module builds them from `config.toml`.
//!
//! ## Types
//!
//! - [`DetectionParams`] — automatic region detection thresholds.
//! - [`FitParams`] — cover fitting (bleed).
//! - [`ShadeParams`] — shading and seam feathering.
//! - [`CompositeParams`] — everything the compositor needs in one value.
//! - [`Quality`] — JPEG encoding quality (1–100, default 92). Clamped on construction.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// Thresholds for automatic face detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Minimum luma difference from the corner background to count as book.
    pub margin: u8,
    /// Distance of the four background samples from the image edges.
    pub corner_inset: u32,
    /// Luma above which a pixel counts as bright paper when looking for the spine edge.
    pub bright_threshold: u8,
    /// Consecutive bright columns required to mark the start of the face.
    pub min_bright_run: u32,
    /// Rows averaged around the vertical midpoint for the spine scan.
    pub strip_height: u32,
    /// Inset from the face edges before sampling the reference white.
    pub reference_inset: u32,
    /// Whether to look for a spine at all.
    pub detect_spine: bool,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            margin: 8,
            corner_inset: 5,
            bright_threshold: 240,
            min_bright_run: 5,
            strip_height: 5,
            reference_inset: 10,
            detect_spine: true,
        }
    }
}

/// Cover fitting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FitParams {
    /// Extra pixels resampled on each side and then trimmed, hiding the soft
    /// edge the filter leaves at the crop boundary. 0 disables.
    pub bleed: u32,
}

/// Shading parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadeParams {
    /// Width of the fade band at the face border. 0 disables feathering.
    pub feather_radius: u32,
    /// Columns of the fitted cover sampled for the spine fill color.
    pub spine_strip: u32,
}

impl Default for ShadeParams {
    fn default() -> Self {
        Self {
            feather_radius: 0,
            spine_strip: 4,
        }
    }
}

/// All tuning for one composite call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompositeParams {
    /// Fallback inset for fixed-fraction placement when the catalog entry has none.
    pub border_offset: u32,
    pub detection: DetectionParams,
    pub fit: FitParams,
    pub shade: ShadeParams,
}
