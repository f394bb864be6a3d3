//! Template calibration scan.
//!
//! Seeds catalog entries for new templates. Each template runs through the
//! same foreground detection the compositor uses in automatic mode, and the
//! detected book outline is expressed as percentages of the template size,
//! rounded to one decimal place:
//!
//! ```text
//! base_bottom_app.jpg  1000x1500
//!   bounds  x 228..=775, y 66..=1409
//!   entry   [22.8, 4.4, 54.7, 89.5]
//! ```
//!
//! A template with nothing to detect (uniform color) is not an error: the
//! scan reports the full frame and flags the result as a fallback. A template
//! that cannot be read keeps its [`ScanError`] in its own slot, so a batch of
//! templates always produces one line per input and one bad file does not
//! cost the others their entries.
//!
//! Scanned entries are catalog-ready: [`catalog_from_scans`] collects them
//! into a [`TemplateCatalog`] that can be merged over an existing file.

use crate::catalog::{CatalogEntry, TemplateCatalog};
use crate::imaging::locator::detect_bounds;
use crate::imaging::luma::luma_plane;
use crate::imaging::rust_backend::is_supported_input;
use crate::imaging::{
    BackendError, DetectionParams, FractionalRegion, ImageBackend, Rect, fractional_from_bounds,
};
use image::DynamicImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Unsupported template format: {path}")]
    Unsupported { path: PathBuf },
    #[error("Failed to read template {path}: {source}")]
    Backend {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// Outcome of scanning one template image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    /// Book outline as template percentages.
    pub region: FractionalRegion,
    /// Detected pixel bounds, absent on fallback.
    pub bounds: Option<Rect>,
    /// Template dimensions.
    pub dimensions: (u32, u32),
}

impl ScanResult {
    /// True when nothing was detected and the full frame was reported.
    pub fn is_fallback(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn to_entry(&self) -> CatalogEntry {
        CatalogEntry::new(self.region)
    }
}

/// A scanned template file.
#[derive(Debug)]
pub struct ScannedTemplate {
    /// Catalog key: the template's file name.
    pub name: String,
    pub source: PathBuf,
    pub result: Result<ScanResult, ScanError>,
}

/// Scan one decoded template.
pub fn scan_template(template: &DynamicImage, params: &DetectionParams) -> ScanResult {
    let gray = luma_plane(&template.to_rgb8());
    let dimensions = gray.dimensions();

    match detect_bounds(&gray, params) {
        Some(detection) => {
            let b = detection.bounds;
            let region = fractional_from_bounds(
                (b.x, b.y, b.right() - 1, b.bottom() - 1),
                dimensions,
            );
            tracing::debug!(bounds = ?b, ?region, "scanned template");
            ScanResult {
                region,
                bounds: Some(b),
                dimensions,
            }
        }
        None => {
            tracing::warn!(?dimensions, "no book detected, reporting full frame");
            ScanResult {
                region: FractionalRegion::FULL_FRAME,
                bounds: None,
                dimensions,
            }
        }
    }
}

/// Catalog key for a template path.
pub fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Decode and scan every template in parallel, preserving input order.
///
/// Read failures are recorded per template; the rest of the batch still runs.
pub fn scan_paths(
    backend: &impl ImageBackend,
    paths: &[PathBuf],
    params: &DetectionParams,
) -> Vec<ScannedTemplate> {
    paths
        .par_iter()
        .map(|path| {
            let result = load_template(backend, path).map(|image| scan_template(&image, params));
            if let Err(e) = &result {
                tracing::warn!(error = %e, "cannot scan template");
            }
            ScannedTemplate {
                name: template_name(path),
                source: path.clone(),
                result,
            }
        })
        .collect()
}

fn load_template(backend: &impl ImageBackend, path: &Path) -> Result<DynamicImage, ScanError> {
    if !is_supported_input(path) {
        return Err(ScanError::Unsupported {
            path: path.to_path_buf(),
        });
    }
    backend.load(path).map_err(|source| ScanError::Backend {
        path: path.to_path_buf(),
        source,
    })
}

/// Collect scanned templates into a catalog, leaving out fallbacks and
/// templates that could not be read.
pub fn catalog_from_scans(scans: &[ScannedTemplate]) -> TemplateCatalog {
    scans
        .iter()
        .filter_map(|s| match &s.result {
            Ok(result) if !result.is_fallback() => Some((s.name.clone(), result.to_entry())),
            _ => None,
        })
        .fold(TemplateCatalog::new(), |catalog, (name, entry)| {
            catalog.with_entry(name, entry)
        })
}
