/// Depth-first directory traversal run on the scanner thread.
///
/// Built on a sorted [`WalkDir`]: collectors see each directory, then its
/// files, then its subdirectories, each group in name order. Hidden and
/// ignored directories are pruned with `skip_current_dir`. The cancel flag
/// is polled before every entry.
///
/// Permission errors skip only the entry (or directory listing) they
/// concern. Any other I/O error ends the traversal and fails the scan.
use crate::collector::{EntryKind, SharedCollector};
use crate::ignore::IgnoreSet;
use crate::scanner::progress::{ProgressChannel, ScanNotification};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// How a traversal that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkEnd {
    /// Every surviving entry was visited.
    Exhausted,
    /// The cancel flag was observed before the tree was exhausted.
    Cancelled,
}

pub(crate) struct Walker<'a> {
    pub root: &'a Path,
    pub ignore: &'a IgnoreSet,
    pub collectors: &'a [SharedCollector],
    pub progress: &'a ProgressChannel,
    pub cancel_flag: &'a AtomicBool,
    pub file_count: &'a AtomicU64,
}

impl Walker<'_> {
    /// Walk the whole tree under `root`.
    pub fn run(&self) -> io::Result<WalkEnd> {
        let mut entries = WalkDir::new(self.root)
            .follow_links(false)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter();

        while let Some(entry) = entries.next() {
            if self.cancel_flag.load(Ordering::Relaxed) {
                return Ok(WalkEnd::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_permission_denied(&err) => {
                    debug!("Skipping restricted entry: {err}");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            // The root may itself live in a dot-directory (temp dirs often do).
            if entry.depth() == 0 {
                self.dispatch(entry.path(), EntryKind::Directory);
                continue;
            }

            if entry.file_type().is_dir() {
                if is_hidden(&entry) || self.ignore.is_ignored(entry.path(), self.root) {
                    entries.skip_current_dir();
                    continue;
                }
                self.dispatch(entry.path(), EntryKind::Directory);
            } else {
                self.visit_file(&entry)?;
            }
        }
        Ok(WalkEnd::Exhausted)
    }

    fn visit_file(&self, entry: &DirEntry) -> io::Result<()> {
        let path = entry.path();
        if self.ignore.is_ignored(path, self.root) {
            return Ok(());
        }

        // Not following links, so this is the link's own metadata.
        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(err) if is_permission_denied(&err) => {
                debug!("Skipping restricted file: {err}");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let count = self.file_count.fetch_add(1, Ordering::Relaxed) + 1;
        let name = entry.file_name().to_string_lossy().into_owned();
        self.progress
            .notify_progress(ScanNotification::new(name, size, count));
        self.dispatch(path, EntryKind::File);
        Ok(())
    }

    fn dispatch(&self, path: &Path, kind: EntryKind) {
        for collector in self.collectors {
            collector.lock().process_entry(path, kind);
        }
    }
}

/// `true` for directories following the dot-folder convention (`.git`, `.vs`, ...).
fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::PermissionDenied)
}
