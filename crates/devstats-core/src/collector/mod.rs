/// Collectors: statistics accumulators fed by the scan engine.
///
/// The engine hands every surviving file and directory to each registered
/// collector, inline on the scanning thread. Collectors are owned by the
/// caller and shared with the engine as [`SharedCollector`]; the caller
/// clears them before a scan and refreshes them after completion.
pub mod extensions;
pub mod source_files;

pub use extensions::{ExtensionCollector, ExtensionReport, ExtensionStat};
pub use source_files::{SourceFileCollector, SourceFileReport};

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Whether a visited entry is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// Capability set every statistics collector provides.
///
/// `process_entry` runs on the scanning thread and must stay cheap: a slow
/// collector stalls traversal and delays cancellation.
pub trait Collector: Send {
    /// Display name, used as the report heading.
    fn name(&self) -> &str;

    /// Record one visited file or directory.
    fn process_entry(&mut self, path: &Path, kind: EntryKind);

    /// Discard everything accumulated by a previous scan.
    fn clear(&mut self);

    /// Publish the accumulated data to the snapshot frontends read.
    fn refresh_presentation(&mut self);

    /// Markdown summary of the published data.
    fn export_summary(&self) -> String;
}

/// A collector shared between its owner and the scanning thread.
pub type SharedCollector = Arc<Mutex<dyn Collector>>;

/// Wrap a collector for registration with the engine.
///
/// The typed handle is returned alongside so the owner can still reach
/// collector-specific snapshots.
pub fn share<C: Collector + 'static>(collector: C) -> (Arc<Mutex<C>>, SharedCollector) {
    let typed = Arc::new(Mutex::new(collector));
    let shared: SharedCollector = typed.clone();
    (typed, shared)
}
