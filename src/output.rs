//! CLI output formatting for the scan and composite commands.
//!
//! # Output Format
//!
//! ## Scan
//!
//! One catalog-ready line per template, followed by the detected pixel
//! bounds as context:
//!
//! ```text
//! "base_bottom_app.jpg": [22.8, 4.4, 54.7, 89.5]
//!     Bounds: 548x1344 at (228, 66) in 1000x1500
//! "blank.png": [0.0, 0.0, 100.0, 100.0]
//!     Fallback: no book detected, full frame
//! "broken.jpg": not scanned
//!     Error: Failed to read template broken.jpg: ...
//! ```
//!
//! ## Composite
//!
//! Workers finish in any order, so every line names its pair in full:
//!
//! ```text
//! Template base_bottom_app.jpg (1000x1500)
//! novel.jpg + base_bottom_app.jpg → novel__base_bottom_app.jpg
//!     Face: 548x1344 at (228, 66)
//! poetry.jpg + blank.png: skipped
//!     Reason: No book region found: ... (region-not-found)
//!
//! 1 composited, 1 skipped (2 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::catalog::TemplateCatalog;
use crate::imaging::{FractionalRegion, Rect};
use crate::process::{BatchEvent, BatchReport, PairOutcome};
use crate::scan::{ScannedTemplate, template_name};

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn rect_line(rect: &Rect) -> String {
    format!("{}x{} at ({}, {})", rect.width, rect.height, rect.x, rect.y)
}

fn coords(region: &FractionalRegion) -> String {
    format!(
        "[{:.1}, {:.1}, {:.1}, {:.1}]",
        region.x, region.y, region.w, region.h
    )
}

// ============================================================================
// Scan output
// ============================================================================

/// Format scan results as catalog-ready lines.
pub fn format_scan_output(scans: &[ScannedTemplate]) -> Vec<String> {
    let mut lines = Vec::new();
    for scan in scans {
        let result = match &scan.result {
            Ok(result) => result,
            Err(e) => {
                lines.push(format!("\"{}\": not scanned", scan.name));
                lines.push(format!("{}Error: {}", indent(1), e));
                continue;
            }
        };
        lines.push(format!("\"{}\": {}", scan.name, coords(&result.region)));
        match &result.bounds {
            Some(bounds) => lines.push(format!(
                "{}Bounds: {} in {}x{}",
                indent(1),
                rect_line(bounds),
                result.dimensions.0,
                result.dimensions.1
            )),
            None => lines.push(format!(
                "{}Fallback: no book detected, full frame",
                indent(1)
            )),
        }
    }
    lines
}

/// Print scan results to stdout.
pub fn print_scan_output(scans: &[ScannedTemplate]) {
    for line in format_scan_output(scans) {
        println!("{}", line);
    }
}

/// Format a catalog as a listing, one entry per line, sorted by name.
pub fn format_catalog_listing(catalog: &TemplateCatalog) -> Vec<String> {
    catalog
        .iter()
        .map(|(name, entry)| {
            let mut line = format!("{} {}", name, coords(&entry.region()));
            if let Some(offset) = entry.offset {
                line.push_str(&format!(" offset {}", offset));
            }
            if entry.flat {
                line.push_str(" flat");
            }
            line
        })
        .collect()
}

// ============================================================================
// Composite output
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_process_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::TemplateLoaded {
            template,
            width,
            height,
        } => vec![format!("Template {} ({}x{})", template, width, height)],
        BatchEvent::PairComposited {
            template,
            cover,
            output,
            face,
        } => vec![
            format!("{} + {} \u{2192} {}", cover, template, template_name(output)),
            format!("{}Face: {}", indent(1), rect_line(face)),
        ],
        BatchEvent::PairSkipped {
            template,
            cover,
            reason,
        } => vec![
            format!("{} + {}: skipped", cover, template),
            format!("{}Reason: {}", indent(1), reason),
        ],
    }
}

/// Format the end-of-batch summary.
///
/// Skipped pairs are repeated here so they are not lost in the progress
/// stream; the last line is always the [`BatchStats`](crate::process::BatchStats) summary.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let skipped: Vec<String> = report
        .pairs
        .iter()
        .filter_map(|pair| match &pair.outcome {
            PairOutcome::Skipped { reason } => Some(format!(
                "{}{} + {}: {}",
                indent(1),
                template_name(&pair.cover),
                template_name(&pair.template),
                reason
            )),
            PairOutcome::Composited { .. } => None,
        })
        .collect();

    let mut lines = Vec::new();
    if !skipped.is_empty() {
        lines.push("Skipped".to_string());
        lines.extend(skipped);
    }
    lines.push(report.stats().to_string());
    lines
}

/// Print the end-of-batch summary to stdout.
pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}
