//! Batch compositing of templates × covers.
//!
//! Every cover is composited onto every template. Inputs are decoded once, in
//! parallel; the pairs are then composited in parallel with
//! [rayon](https://docs.rs/rayon), each worker reading the same immutable
//! [`TemplateCatalog`] snapshot.
//!
//! ## Output Structure
//!
//! ```text
//! out/
//! ├── novel__base_verticale_temi_app.jpg     # <cover_stem>__<template_stem>.<ext>
//! ├── novel__base_bottom_app.jpg
//! ├── poetry__base_verticale_temi_app.jpg
//! └── poetry__base_bottom_app.jpg
//! ```
//!
//! Names are planned before any work starts; a pair whose name is already
//! taken (`novel.jpg` and `novel.png`) gets a `-2`, `-3`, ... suffix.
//!
//! ## Failure Policy
//!
//! A pair that cannot be produced (undecodable input, no region found,
//! encode failure) is recorded as skipped with its reason and the batch
//! carries on. Only setup failures, such as an output directory that cannot
//! be created, return [`ProcessError`].
//!
//! Progress is reported as [`BatchEvent`]s over an optional channel so the
//! CLI can print from a single thread while workers run.

use crate::catalog::TemplateCatalog;
use crate::config::OutputFormat;
use crate::imaging::rust_backend::is_supported_input;
use crate::imaging::{CompositeParams, ImageBackend, Quality, Rect, RustBackend, composite};
use crate::scan::template_name;
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a batch needs besides its inputs.
#[derive(Debug, Clone, Default)]
pub struct BatchSettings {
    pub params: CompositeParams,
    pub quality: Quality,
    pub format: OutputFormat,
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// A template was decoded and is ready for compositing.
    TemplateLoaded {
        template: String,
        width: u32,
        height: u32,
    },
    PairComposited {
        template: String,
        cover: String,
        output: PathBuf,
        face: Rect,
    },
    PairSkipped {
        template: String,
        cover: String,
        reason: String,
    },
}

/// What happened to one (template, cover) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Composited { output: PathBuf, face: Rect },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    pub template: PathBuf,
    pub cover: PathBuf,
    pub outcome: PairOutcome,
}

/// Result of a batch run, in template-major input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub pairs: Vec<PairResult>,
}

impl BatchReport {
    pub fn stats(&self) -> BatchStats {
        let mut stats = BatchStats::default();
        for pair in &self.pairs {
            match pair.outcome {
                PairOutcome::Composited { .. } => stats.record_composited(),
                PairOutcome::Skipped { .. } => stats.record_skipped(),
            }
        }
        stats
    }
}

/// Summary counts for a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub composited: u32,
    pub skipped: u32,
}

impl BatchStats {
    pub fn record_composited(&mut self) {
        self.composited += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn total(&self) -> u32 {
        self.composited + self.skipped
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} composited, {} skipped ({} total)",
            self.composited,
            self.skipped,
            self.total()
        )
    }
}

/// Output path for a pair: `<cover_stem>__<template_stem>.<ext>`.
pub fn output_path(output_dir: &Path, template: &Path, cover: &Path, format: OutputFormat) -> PathBuf {
    output_dir.join(format!(
        "{}__{}.{}",
        file_stem(cover),
        file_stem(template),
        format.extension()
    ))
}

/// Output paths for every pair in template-major order.
///
/// Pairs whose `<cover_stem>__<template_stem>` collide (`a.jpg` and `a.png`,
/// or equal file names in different directories) get `-2`, `-3`, ...
/// appended to the later ones, so no two pairs share an output file.
pub fn plan_outputs(
    output_dir: &Path,
    templates: &[PathBuf],
    covers: &[PathBuf],
    format: OutputFormat,
) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    let mut planned = Vec::with_capacity(templates.len() * covers.len());
    for template in templates {
        for cover in covers {
            let mut path = output_path(output_dir, template, cover, format);
            let mut n = 2;
            while taken.contains(&path) {
                path = output_dir.join(format!(
                    "{}__{}-{}.{}",
                    file_stem(cover),
                    file_stem(template),
                    n,
                    format.extension()
                ));
                n += 1;
            }
            if n > 2 {
                tracing::debug!(output = %path.display(), "renamed colliding output");
            }
            taken.insert(path.clone());
            planned.push(path);
        }
    }
    planned
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string())
}

/// Composite every cover onto every template using the `image` crate backend.
pub fn process(
    templates: &[PathBuf],
    covers: &[PathBuf],
    output_dir: &Path,
    catalog: &TemplateCatalog,
    settings: &BatchSettings,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(
        &backend, templates, covers, output_dir, catalog, settings, events,
    )
}

/// Composite with a specific backend (allows testing with mock).
pub fn process_with_backend(
    backend: &impl ImageBackend,
    templates: &[PathBuf],
    covers: &[PathBuf],
    output_dir: &Path,
    catalog: &TemplateCatalog,
    settings: &BatchSettings,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, ProcessError> {
    std::fs::create_dir_all(output_dir)?;

    let decoded_templates = decode_all(backend, templates);
    let decoded_covers = decode_all(backend, covers);

    if let Some(tx) = &events {
        for (path, decoded) in templates.iter().zip(&decoded_templates) {
            if let Ok(img) = decoded {
                tx.send(BatchEvent::TemplateLoaded {
                    template: template_name(path),
                    width: img.width(),
                    height: img.height(),
                })
                .ok();
            }
        }
    }

    let pairs: Vec<(usize, usize)> = (0..templates.len())
        .flat_map(|t| (0..covers.len()).map(move |c| (t, c)))
        .collect();
    let outputs = plan_outputs(output_dir, templates, covers, settings.format);

    let results: Vec<PairResult> = pairs
        .into_par_iter()
        .zip(outputs)
        .map_with(events, |tx, ((t, c), output)| {
            let template_path = &templates[t];
            let cover_path = &covers[c];
            let outcome = run_pair(
                backend,
                template_path,
                &decoded_templates[t],
                cover_path,
                &decoded_covers[c],
                output,
                catalog,
                settings,
            );

            let template = template_name(template_path);
            let cover = template_name(cover_path);
            let event = match &outcome {
                PairOutcome::Composited { output, face } => BatchEvent::PairComposited {
                    template,
                    cover,
                    output: output.clone(),
                    face: *face,
                },
                PairOutcome::Skipped { reason } => {
                    tracing::warn!(%template, %cover, %reason, "skipping pair");
                    BatchEvent::PairSkipped {
                        template,
                        cover,
                        reason: reason.clone(),
                    }
                }
            };
            if let Some(tx) = tx {
                tx.send(event).ok();
            }

            PairResult {
                template: template_path.clone(),
                cover: cover_path.clone(),
                outcome,
            }
        })
        .collect();

    Ok(BatchReport { pairs: results })
}

/// Decode each input once; files without a known image extension are not
/// read at all. Failures are kept as the reason string so every
/// pair using the input can report it.
fn decode_all(backend: &impl ImageBackend, paths: &[PathBuf]) -> Vec<Result<DynamicImage, String>> {
    paths
        .par_iter()
        .map(|path| {
            if !is_supported_input(path) {
                return Err(format!("unsupported input format: {}", path.display()));
            }
            backend
                .load(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn run_pair(
    backend: &impl ImageBackend,
    template_path: &Path,
    template: &Result<DynamicImage, String>,
    cover_path: &Path,
    cover: &Result<DynamicImage, String>,
    output: PathBuf,
    catalog: &TemplateCatalog,
    settings: &BatchSettings,
) -> PairOutcome {
    let (template, cover) = match (template, cover) {
        (Ok(t), Ok(c)) => (t, c),
        (Err(reason), _) | (_, Err(reason)) => {
            return PairOutcome::Skipped {
                reason: reason.clone(),
            };
        }
    };

    let template_id = template_path.to_string_lossy();
    let result = match composite(template, cover, &template_id, catalog, &settings.params) {
        Ok(result) => result,
        Err(e) => {
            return PairOutcome::Skipped {
                reason: format!("{} ({})", e, e.kind()),
            };
        }
    };

    match backend.save(&result.image, &output, settings.quality) {
        Ok(()) => PairOutcome::Composited {
            output,
            face: result.region.face,
        },
        Err(e) => PairOutcome::Skipped {
            reason: format!("cannot write {}: {}", output.display(), e),
        },
    }
}
