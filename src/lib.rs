//! # Cover Mockup
//!
//! Places flat book-cover designs onto photographs of physical books
//! ("mockup templates"), keeping the folds, shadows and page curvature of the
//! photo so the result looks like the real printed book.
//!
//! # Architecture: Locate, Fit, Shade
//!
//! Every composite runs the same three steps over one template and one cover:
//!
//! ```text
//! 1. Locate   template  →  face rectangle (+ spine, paper white)
//! 2. Fit      cover     →  cover cropped and resized to the face
//! 3. Shade    both      →  cover × min(luma / white, 1), written into a copy of the template
//! ```
//!
//! The core in [`imaging`] is a set of pure functions over decoded buffers:
//! no filesystem access, no global state. Everything around it (config,
//! the template catalog, decode/encode, batch parallelism) is layered on top
//! so the core can be tested with images built in memory.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Compositing core: region location, cover fitting, shading, write-back |
//! | [`catalog`] | Calibrated template placements: built-ins plus a JSON file |
//! | [`scan`] | Calibration: measure a template's book outline as catalog percentages |
//! | [`process`] | Batch driver: every cover onto every template, in parallel |
//! | [`config`] | `config.toml` loading, validation, merging, and the stock config |
//! | [`output`] | CLI output formatting for scan and batch results |
//!
//! # Design Decisions
//!
//! ## Catalog First, Detection Second
//!
//! A template with a catalog entry is placed by fixed percentages; detection
//! is only the fallback. Calibrated placements are exact on photographs where
//! the background is busy or the book edge is soft, and detection still lets
//! a brand new template work without any setup. [`scan`] bridges the two: it
//! runs detection once and prints the entry to pin.
//!
//! ## Multiply, Never Lighten
//!
//! Shading multiplies the cover by the template's luma relative to its paper
//! white, capped at 1. Folds and shadows darken the design; nothing in the
//! photo can push a cover pixel brighter than the artwork itself.
//!
//! ## One Snapshot Per Batch
//!
//! The catalog is loaded once and shared by reference across workers. Adding
//! an entry produces a new [`catalog::TemplateCatalog`] value rather than
//! mutating the shared one, so a batch never sees half-updated placements.

pub mod catalog;
pub mod config;
pub mod imaging;
pub mod output;
pub mod process;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
