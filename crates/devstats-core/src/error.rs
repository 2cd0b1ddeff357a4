/// Error types for scanning and histogram construction.
///
/// Only conditions that reach the caller are modelled here. Restricted
/// directories are skipped inside the traversal and fatal traversal errors
/// travel in the completion message, so neither appears as a variant.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`crate::scanner::ScanEngine::start`] and ignore-file loading.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root was an empty path.
    #[error("no folder selected")]
    EmptyRoot,

    /// The scan root does not exist or is not a directory.
    #[error("invalid folder path: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// The `.gitignore` at the scan root exists but could not be read.
    #[error("failed to read ignore file {}: {source}", path.display())]
    IgnoreFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The background scanning thread could not be created.
    #[error("failed to spawn scanner thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Errors produced while building a size histogram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistogramError {
    /// A bucket label could not be parsed back into byte bounds.
    #[error("malformed size label '{0}'")]
    MalformedLabel(String),
}
