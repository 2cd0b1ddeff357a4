/// Scanner module: runs one cancellable directory scan at a time on a
/// dedicated background thread.
///
/// The [`ScanEngine`] owns the progress channel, the cancel flag and the
/// running file counter. Collectors are registered once and shared with
/// each scan thread; the ignore set is loaded fresh for every scan.
pub mod progress;
mod walker;

use crate::collector::SharedCollector;
use crate::error::ScanError;
use crate::ignore::IgnoreSet;
use progress::{ProgressChannel, ScanOutcome, ScanProgress, ScanSummary};
use walker::{WalkEnd, Walker};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{error, info};

/// Immutable settings for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Directory to scan.
    pub root: PathBuf,
    /// Read `.gitignore` at the root and skip what it matches.
    pub use_ignore_file: bool,
}

impl ScanConfig {
    /// Scan `root` with ignore-file filtering enabled.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            use_ignore_file: true,
        }
    }

    pub fn with_ignore_file(mut self, use_ignore_file: bool) -> Self {
        self.use_ignore_file = use_ignore_file;
        self
    }
}

/// Whether a scan is currently in flight.
///
/// The terminal states (finished, cancelled, failed) are reported through
/// [`ScanOutcome`] in the completion message and [`ScanEngine::last_outcome`];
/// the engine itself returns to `Idle` as soon as the traversal ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Result of a start request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    /// A new scan thread was spawned.
    Started,
    /// A scan was already running; the request was ignored.
    Busy,
}

#[derive(Debug)]
struct EngineStatus {
    state: ScanState,
    last_outcome: Option<ScanOutcome>,
}

/// Scan orchestrator. One instance serves any number of sequential scans.
pub struct ScanEngine {
    collectors: Vec<SharedCollector>,
    progress: Arc<ProgressChannel>,
    status: Arc<Mutex<EngineStatus>>,
    cancel_flag: Arc<AtomicBool>,
    file_count: Arc<AtomicU64>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanEngine {
    pub fn new() -> Self {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        Self {
            collectors: Vec::new(),
            progress: Arc::new(ProgressChannel::with_cancel_flag(Arc::clone(&cancel_flag))),
            status: Arc::new(Mutex::new(EngineStatus {
                state: ScanState::Idle,
                last_outcome: None,
            })),
            cancel_flag,
            file_count: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    /// Add collectors to be fed by every subsequent scan.
    pub fn register_collectors<I>(&mut self, collectors: I)
    where
        I: IntoIterator<Item = SharedCollector>,
    {
        self.collectors.extend(collectors);
    }

    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    /// Subscribe to progress and completion messages of all future scans.
    ///
    /// The engine reports `Idle` just before it sends the completion, so a
    /// scan started from another thread at that moment may deliver its first
    /// messages ahead of the previous scan's completion. Call [`wait`](Self::wait)
    /// before restarting when the order matters: once it returns, the
    /// previous completion is already queued.
    pub fn subscribe(&self) -> Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    pub fn state(&self) -> ScanState {
        self.status.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    /// Outcome of the most recently finished scan, if any.
    pub fn last_outcome(&self) -> Option<ScanOutcome> {
        self.status.lock().last_outcome.clone()
    }

    /// Files visited so far by the current (or last) scan.
    pub fn files_visited(&self) -> u64 {
        self.file_count.load(Ordering::Relaxed)
    }

    /// Start scanning `config.root` on a background thread.
    ///
    /// Returns immediately. A request while a scan is running is a no-op
    /// reported as [`StartResult::Busy`]. An empty or missing root, an
    /// unreadable ignore file or a failed thread spawn leave the engine idle.
    pub fn start(&self, config: ScanConfig) -> Result<StartResult, ScanError> {
        let mut status = self.status.lock();
        if status.state == ScanState::Scanning {
            return Ok(StartResult::Busy);
        }

        if config.root.as_os_str().is_empty() {
            return Err(ScanError::EmptyRoot);
        }
        if !config.root.is_dir() {
            return Err(ScanError::InvalidRoot(config.root));
        }

        let ignore = IgnoreSet::load(&config.root, config.use_ignore_file)?;
        self.file_count.store(0, Ordering::Relaxed);
        self.cancel_flag.store(false, Ordering::Relaxed);

        let root = config.root;
        let collectors = self.collectors.clone();
        let progress = Arc::clone(&self.progress);
        let status_handle = Arc::clone(&self.status);
        let cancel_flag = Arc::clone(&self.cancel_flag);
        let file_count = Arc::clone(&self.file_count);

        let spawned = thread::Builder::new()
            .name("devstats-scanner".into())
            .spawn(move || {
                let started = Instant::now();
                info!(
                    "Starting scan of {} ({} ignore pattern(s))",
                    root.display(),
                    ignore.len()
                );

                let walker = Walker {
                    root: &root,
                    ignore: &ignore,
                    collectors: &collectors,
                    progress: &progress,
                    cancel_flag: &cancel_flag,
                    file_count: &file_count,
                };
                let result = panic::catch_unwind(AssertUnwindSafe(|| walker.run()));
                let outcome = outcome_of(result);
                if let ScanOutcome::Failed(message) = &outcome {
                    error!("Scan of {} failed: {message}", root.display());
                }

                let summary = ScanSummary {
                    outcome: outcome.clone(),
                    files_visited: file_count.load(Ordering::Relaxed),
                    duration: started.elapsed(),
                };
                info!(
                    "Scan of {} ended ({:?}): {} file(s) in {:?}",
                    root.display(),
                    summary.outcome,
                    summary.files_visited,
                    summary.duration
                );

                // Go idle before announcing completion so observers can
                // restart straight from the completion handler.
                {
                    let mut status = status_handle.lock();
                    status.state = ScanState::Idle;
                    status.last_outcome = Some(outcome);
                }
                progress.notify_completed(summary);
            });

        match spawned {
            Ok(handle) => {
                status.state = ScanState::Scanning;
                status.last_outcome = None;
                *self.worker.lock() = Some(handle);
                Ok(StartResult::Started)
            }
            Err(err) => Err(ScanError::Spawn(err)),
        }
    }

    /// Ask the running scan to stop at its next check point.
    pub fn stop(&self) {
        if self.is_busy() {
            self.cancel_flag.store(true, Ordering::Relaxed);
        }
    }

    /// Block until the most recently started scan thread exits.
    ///
    /// A subscriber that stops draining holds the scan back while it runs.
    /// After [`stop`](Self::stop) full queues are skipped, so the thread exits
    /// even if some receiver is never read again.
    pub fn wait(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Scanner thread terminated abnormally");
            }
        }
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "collector panicked".to_string()
    }
}

/// Map the worker's result to an outcome using only what the walker itself
/// observed, so a late `stop()` cannot turn a finished scan into a cancelled one.
fn outcome_of(result: thread::Result<io::Result<WalkEnd>>) -> ScanOutcome {
    match result {
        Ok(Ok(WalkEnd::Exhausted)) => ScanOutcome::Finished,
        Ok(Ok(WalkEnd::Cancelled)) => ScanOutcome::Cancelled,
        Ok(Err(err)) => ScanOutcome::Failed(err.to_string()),
        Err(payload) => ScanOutcome::Failed(panic_message(payload.as_ref())),
    }
}
