/// DevStats Core — scanning, ignore rules, collectors and size histograms.
///
/// This crate contains all business logic with zero UI dependencies.
/// Frontends subscribe to the scan engine's progress channel and read the
/// collectors' published snapshots.
///
/// # Modules
///
/// - [`ignore`] — gitignore-style pattern compilation and the per-scan ignore set.
/// - [`scanner`] — Background, cancellable directory traversal with progress reporting.
/// - [`collector`] — The collector capability and the built-in statistics collectors.
/// - [`histogram`] — Adaptive file-size binning into labelled buckets.
/// - [`model`] — Size samples and human-readable size formatting.
/// - [`error`] — Error types shared by the modules above.
pub mod collector;
pub mod error;
pub mod histogram;
pub mod ignore;
pub mod model;
pub mod scanner;

pub use error::{HistogramError, ScanError};
