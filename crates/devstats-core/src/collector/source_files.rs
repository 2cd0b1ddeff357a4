/// Size statistics for source files of one extension.
///
/// Records a [`SizeSample`] for every matching file and summarises them
/// into totals and a size histogram when the presentation is refreshed.
use crate::collector::{Collector, EntryKind};
use crate::histogram::{self, Bucket};
use crate::model::{format_count, format_size, SizeSample};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default number of histogram buckets.
pub const DEFAULT_BUCKET_BUDGET: usize = 10;

/// Published snapshot of a [`SourceFileCollector`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceFileReport {
    /// Tracked extension without the leading dot, lower-cased.
    pub extension: String,
    pub file_count: u64,
    pub total_bytes: u64,
    pub average_bytes: u64,
    pub largest: Option<SizeSample>,
    pub histogram: Vec<Bucket>,
}

/// Collector sampling the sizes of files with one extension.
#[derive(Debug)]
pub struct SourceFileCollector {
    name: String,
    extension: String,
    bucket_budget: usize,
    samples: Vec<SizeSample>,
    published: SourceFileReport,
}

impl SourceFileCollector {
    /// Track files whose extension equals `extension` (ASCII case-insensitive,
    /// leading dot optional).
    pub fn new(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        Self {
            name: format!("{} File Statistics", extension.to_ascii_uppercase()),
            published: SourceFileReport {
                extension: extension.clone(),
                ..SourceFileReport::default()
            },
            extension,
            bucket_budget: DEFAULT_BUCKET_BUDGET,
            samples: Vec::new(),
        }
    }

    /// Override the histogram bucket budget.
    pub fn with_bucket_budget(mut self, bucket_budget: usize) -> Self {
        self.bucket_budget = bucket_budget;
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Samples recorded since the last [`Collector::clear`].
    pub fn samples(&self) -> &[SizeSample] {
        &self.samples
    }

    /// The snapshot published by the last [`Collector::refresh_presentation`].
    pub fn report(&self) -> &SourceFileReport {
        &self.published
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&self.extension))
    }

    fn snapshot(&self) -> SourceFileReport {
        let file_count = self.samples.len() as u64;
        let total_bytes: u64 = self.samples.iter().map(|sample| sample.size).sum();
        let histogram = histogram::build(&self.samples, self.bucket_budget).unwrap_or_else(|err| {
            warn!("Failed to build size histogram for .{}: {err}", self.extension);
            Vec::new()
        });

        SourceFileReport {
            extension: self.extension.clone(),
            file_count,
            total_bytes,
            average_bytes: total_bytes.checked_div(file_count).unwrap_or(0),
            largest: self.samples.iter().max_by_key(|sample| sample.size).cloned(),
            histogram,
        }
    }
}

impl Collector for SourceFileCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_entry(&mut self, path: &Path, kind: EntryKind) {
        if kind.is_dir() || !self.matches(path) {
            return;
        }
        match fs::symlink_metadata(path) {
            Ok(meta) => self.samples.push(SizeSample::new(meta.len(), path)),
            Err(err) => warn!("Cannot read size of {}: {err}", path.display()),
        }
    }

    fn clear(&mut self) {
        self.samples.clear();
        self.published = SourceFileReport {
            extension: self.extension.clone(),
            ..SourceFileReport::default()
        };
    }

    fn refresh_presentation(&mut self) {
        self.published = self.snapshot();
    }

    fn export_summary(&self) -> String {
        let report = self.snapshot();
        let mut md = String::new();
        let _ = writeln!(md, "# {}", self.name);
        md.push('\n');

        if report.file_count == 0 {
            let _ = writeln!(md, "_No .{} files found._", report.extension);
            return md;
        }

        let _ = writeln!(md, "- **Files:** {}", format_count(report.file_count));
        let _ = writeln!(md, "- **Total size:** {}", format_size(report.total_bytes));
        let _ = writeln!(md, "- **Average size:** {}", format_size(report.average_bytes));
        if let Some(largest) = &report.largest {
            let _ = writeln!(
                md,
                "- **Largest file:** `{}` ({})",
                largest.path.display(),
                format_size(largest.size)
            );
        }

        md.push_str("\n## Size distribution\n\n");
        md.push_str("| Range | Count | Largest file |\n");
        md.push_str("|-------|-------|--------------|\n");
        for bucket in &report.histogram {
            let sample = bucket
                .representative
                .as_ref()
                .map(|sample| format!("`{}`", sample.path.display()))
                .unwrap_or_default();
            let _ = writeln!(md, "| {} | {} | {} |", bucket.label, bucket.count, sample);
        }
        md
    }
}
