//! Tool configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by whatever the user file sets; the result is converted into
//! the core's [`CompositeParams`] for each run.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! catalog = "catalog.json"   # Calibrated templates (omit for built-ins only)
//!
//! [detection]
//! margin = 8                 # Luma difference from the corners that counts as book
//! corner_inset = 5           # Distance of background samples from the edges
//! bright_threshold = 240     # Paper luma when looking for the spine edge
//! min_bright_run = 5         # Bright columns needed to start the face
//! strip_height = 5           # Rows averaged on the mid-line spine scan
//! reference_inset = 10       # Inset before sampling the paper white
//! detect_spine = true
//!
//! [placement]
//! border_offset = 0          # Inset for catalog entries without their own offset
//!
//! [fitting]
//! bleed = 0                  # Extra resample margin trimmed off (0-15)
//!
//! [shading]
//! feather_radius = 0         # Seam fade width in pixels (0 = hard edge)
//! spine_strip = 4            # Cover columns sampled for the spine color
//!
//! [output]
//! quality = 92               # JPEG quality (1-100)
//! format = "jpg"             # "jpg" or "png"
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{CompositeParams, DetectionParams, FitParams, Quality, ShadeParams};
use crate::process::BatchSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest bleed that still trims only resampling artefacts.
pub const MAX_BLEED: u32 = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Path to a catalog JSON, relative to the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    pub detection: DetectionConfig,
    pub placement: PlacementConfig,
    pub fitting: FittingConfig,
    pub shading: ShadingConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.margin == 0 {
            return Err(ConfigError::Validation(
                "detection.margin must be at least 1".into(),
            ));
        }
        if self.detection.min_bright_run == 0 {
            return Err(ConfigError::Validation(
                "detection.min_bright_run must be at least 1".into(),
            ));
        }
        if self.detection.strip_height == 0 {
            return Err(ConfigError::Validation(
                "detection.strip_height must be at least 1".into(),
            ));
        }
        if self.fitting.bleed > MAX_BLEED {
            return Err(ConfigError::Validation(format!(
                "fitting.bleed must be 0-{MAX_BLEED}"
            )));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// The core's parameters for this configuration.
    pub fn composite_params(&self) -> CompositeParams {
        let d = &self.detection;
        CompositeParams {
            border_offset: self.placement.border_offset,
            detection: DetectionParams {
                margin: d.margin,
                corner_inset: d.corner_inset,
                bright_threshold: d.bright_threshold,
                min_bright_run: d.min_bright_run,
                strip_height: d.strip_height,
                reference_inset: d.reference_inset,
                detect_spine: d.detect_spine,
            },
            fit: FitParams {
                bleed: self.fitting.bleed,
            },
            shade: ShadeParams {
                feather_radius: self.shading.feather_radius,
                spine_strip: self.shading.spine_strip,
            },
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.output.quality)
    }

    /// Settings for a batch run of the `composite` command.
    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            params: self.composite_params(),
            quality: self.quality(),
            format: self.output.format,
        }
    }

    /// Path of the configured catalog, resolved against the config directory.
    pub fn catalog_path(&self, config_dir: &Path) -> Option<PathBuf> {
        self.catalog.as_ref().map(|c| config_dir.join(c))
    }
}

/// Automatic detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub margin: u8,
    pub corner_inset: u32,
    pub bright_threshold: u8,
    pub min_bright_run: u32,
    pub strip_height: u32,
    pub reference_inset: u32,
    pub detect_spine: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let d = DetectionParams::default();
        Self {
            margin: d.margin,
            corner_inset: d.corner_inset,
            bright_threshold: d.bright_threshold,
            min_bright_run: d.min_bright_run,
            strip_height: d.strip_height,
            reference_inset: d.reference_inset,
            detect_spine: d.detect_spine,
        }
    }
}

/// Fixed-fraction placement settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    /// Pixels inset on every side for catalog entries without an `offset`.
    pub border_offset: u32,
}

/// Cover fitting settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FittingConfig {
    pub bleed: u32,
}

/// Shading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadingConfig {
    pub feather_radius: u32,
    pub spine_strip: u32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        let s = ShadeParams::default();
        Self {
            feather_radius: s.feather_radius,
            spine_strip: s.spine_strip,
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG quality (1 = worst, 100 = best). Ignored for PNG.
    pub quality: u32,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            format: OutputFormat::default(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel compositing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ToolConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config does not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<ToolConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Cover Mockup Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Catalog of calibrated templates (JSON), relative to this file.
# Templates listed there use fixed placement; all others are auto-detected.
# catalog = "catalog.json"

# ---------------------------------------------------------------------------
# Automatic detection (templates without a catalog entry)
# ---------------------------------------------------------------------------
[detection]
# Luma difference from the corner-sampled background that counts as book.
margin = 8

# Distance of the four background samples from the image edges.
corner_inset = 5

# Luma above which a column counts as bright paper on the spine scan.
bright_threshold = 240

# Consecutive bright columns that mark the start of the front face.
min_bright_run = 5

# Rows averaged around the vertical midpoint for the spine scan.
strip_height = 5

# Inset from the face edges before sampling the paper-white reference.
reference_inset = 10

# Look for a spine left of the face at all.
detect_spine = true

# ---------------------------------------------------------------------------
# Fixed placement (templates with a catalog entry)
# ---------------------------------------------------------------------------
[placement]
# Pixels inset on every side, for entries without their own "offset".
border_offset = 0

# ---------------------------------------------------------------------------
# Cover fitting
# ---------------------------------------------------------------------------
[fitting]
# Resample this many extra pixels per side and trim them off, hiding the
# soft edge left by resampling (0-15).
bleed = 0

# ---------------------------------------------------------------------------
# Shading
# ---------------------------------------------------------------------------
[shading]
# Width in pixels of the fade between cover and template (0 = hard edge).
feather_radius = 0

# Cover columns sampled for the flat spine color.
spine_strip = 4

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG quality (1 = worst, 100 = best). Ignored for PNG.
quality = 92

# "jpg" or "png".
format = "jpg"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel compositing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
