//! Template catalog: pre-calibrated placement for known templates.
//!
//! A [`TemplateCatalog`] maps a template identifier (usually its file name)
//! to a [`CatalogEntry`] holding the face position as percentages of the
//! template size. Templates found here use fixed-fraction placement; anything
//! else falls back to automatic detection.
//!
//! ## JSON Format
//!
//! ```json
//! {
//!   "base_bottom_app.jpg": { "coords": [22.8, 4.4, 54.8, 89.6], "offset": 1 },
//!   "white_sheet.jpg":     { "coords": [10.0, 10.0, 80.0, 80.0], "flat": true }
//! }
//! ```
//!
//! - `coords` — `[x, y, w, h]` in percent (required)
//! - `offset` — pixels to inset on every side (optional)
//! - `flat` — skip shading, paste the cover unmodified (default `false`)
//! - `reference_white` — luma treated as paper white (optional, default 255)
//!
//! ## Snapshots
//!
//! A catalog is immutable once built. Editing tools produce a new snapshot
//! with [`TemplateCatalog::with_entry`] and hand that to later composites;
//! in-flight work keeps reading the snapshot it started with.

use crate::imaging::FractionalRegion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid catalog entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },
}

/// Calibrated geometry for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    pub coords: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_white: Option<f64>,
}

impl CatalogEntry {
    pub fn new(region: FractionalRegion) -> Self {
        Self {
            coords: region.as_array(),
            offset: None,
            flat: false,
            reference_white: None,
        }
    }

    pub fn region(&self) -> FractionalRegion {
        FractionalRegion::from(self.coords)
    }

    fn validate(&self, name: &str) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidEntry {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if self.coords.iter().any(|c| !c.is_finite()) {
            return Err(invalid("coords must be finite numbers"));
        }
        if self.coords.iter().any(|c| !(0.0..=100.0).contains(c)) {
            return Err(invalid("coords must be percentages in 0-100"));
        }
        if self.coords[2] <= 0.0 || self.coords[3] <= 0.0 {
            return Err(invalid("width and height must be positive"));
        }
        if let Some(white) = self.reference_white {
            if !(white > 0.0 && white <= 255.0) {
                return Err(invalid("reference_white must be in (0, 255]"));
            }
        }
        Ok(())
    }
}

/// Immutable mapping from template identifier to calibrated geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Templates shipped with calibrated coordinates.
    pub fn builtin() -> Self {
        let table: &[(&str, [f64; 4])] = &[
            ("base_verticale_temi_app.jpg", [35.1, 10.4, 29.8, 79.2]),
            ("base_orizzontale_temi_app.jpg", [19.4, 9.4, 61.2, 81.2]),
            ("base_orizzontale_temi_app3.jpg", [19.4, 9.4, 61.2, 81.2]),
            ("base_quadrata_temi_app.jpg", [28.2, 10.4, 43.6, 77.4]),
            ("base_bottom_app.jpg", [22.8, 4.4, 54.8, 89.6]),
        ];
        let entries = table
            .iter()
            .map(|(name, coords)| (name.to_string(), CatalogEntry::new((*coords).into())))
            .collect();
        Self { entries }
    }

    /// Parse and validate a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: TemplateCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog JSON file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the catalog as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for (name, entry) in &self.entries {
            entry.validate(name)?;
        }
        Ok(())
    }

    /// Entries of `self` layered on top of `base`.
    pub fn merged_over(self, base: TemplateCatalog) -> TemplateCatalog {
        let mut entries = base.entries;
        entries.extend(self.entries);
        TemplateCatalog { entries }
    }

    /// A new snapshot with `name` set to `entry`.
    pub fn with_entry(&self, name: impl Into<String>, entry: CatalogEntry) -> TemplateCatalog {
        let mut entries = self.entries.clone();
        entries.insert(name.into(), entry);
        TemplateCatalog { entries }
    }

    /// Find the entry for a template.
    ///
    /// Tries the identifier as given, then its file-name component, so a
    /// path like `templates/base_bottom_app.jpg` resolves too.
    pub fn lookup(&self, template_id: &str) -> Option<&CatalogEntry> {
        self.entries.get(template_id).or_else(|| {
            Path::new(template_id)
                .file_name()
                .and_then(|f| f.to_str())
                .and_then(|name| self.entries.get(name))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
