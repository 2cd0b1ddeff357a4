/// File extension counts.
///
/// Counts folders, files and files per lower-cased extension, remembering
/// the first path seen for each extension so a frontend can reveal it.
use crate::collector::{Collector, EntryKind};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Per-extension count with a sample file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionStat {
    /// Lower-cased extension including the leading dot, e.g. `.rs`.
    pub extension: String,
    pub count: u64,
    pub sample_path: PathBuf,
}

/// Published snapshot of an [`ExtensionCollector`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionReport {
    pub folder_count: u64,
    pub file_count: u64,
    /// Sorted by descending count, then by extension.
    pub extensions: Vec<ExtensionStat>,
}

impl ExtensionReport {
    pub fn distinct_extensions(&self) -> usize {
        self.extensions.len()
    }
}

/// Collector counting files by extension.
#[derive(Debug, Default)]
pub struct ExtensionCollector {
    folder_count: u64,
    file_count: u64,
    stats: HashMap<String, (u64, PathBuf)>,
    published: ExtensionReport,
}

impl ExtensionCollector {
    pub const NAME: &'static str = "File Extensions";

    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot published by the last [`Collector::refresh_presentation`].
    pub fn report(&self) -> &ExtensionReport {
        &self.published
    }

    fn snapshot(&self) -> ExtensionReport {
        let mut extensions: Vec<ExtensionStat> = self
            .stats
            .iter()
            .map(|(extension, (count, sample))| ExtensionStat {
                extension: extension.clone(),
                count: *count,
                sample_path: sample.clone(),
            })
            .collect();
        extensions.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.extension.cmp(&b.extension))
        });

        ExtensionReport {
            folder_count: self.folder_count,
            file_count: self.file_count,
            extensions,
        }
    }
}

impl Collector for ExtensionCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process_entry(&mut self, path: &Path, kind: EntryKind) {
        if kind.is_dir() {
            self.folder_count += 1;
            return;
        }

        self.file_count += 1;
        let Some(ext) = path.extension() else {
            return;
        };
        let key = format!(".{}", ext.to_string_lossy().to_ascii_lowercase());
        self.stats
            .entry(key)
            .and_modify(|(count, _)| *count += 1)
            .or_insert_with(|| (1, path.to_path_buf()));
    }

    fn clear(&mut self) {
        self.folder_count = 0;
        self.file_count = 0;
        self.stats.clear();
        self.published = ExtensionReport::default();
    }

    fn refresh_presentation(&mut self) {
        self.published = self.snapshot();
    }

    fn export_summary(&self) -> String {
        let report = self.snapshot();
        let mut md = String::new();
        let _ = writeln!(md, "# {}", Self::NAME);
        md.push('\n');
        let _ = writeln!(md, "- **Folders scanned:** {}", report.folder_count);
        let _ = writeln!(md, "- **Files scanned:** {}", report.file_count);
        let _ = writeln!(
            md,
            "- **Different extensions:** {}",
            report.distinct_extensions()
        );
        md.push('\n');

        if report.extensions.is_empty() {
            md.push_str("_No file extensions found._\n");
        } else {
            md.push_str("| Extension | Count |\n");
            md.push_str("|-----------|-------|\n");
            for stat in &report.extensions {
                let _ = writeln!(md, "| `{}` | {} |", stat.extension, stat.count);
            }
        }
        md
    }
}
