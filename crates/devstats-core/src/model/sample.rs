/// A file size observation paired with the file it came from.
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One (size, file) pair recorded during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeSample {
    /// File size in bytes.
    pub size: u64,
    /// Path of the file the size was read from.
    pub path: PathBuf,
}

impl SizeSample {
    pub fn new(size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            size,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
