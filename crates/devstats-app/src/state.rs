/// Application state management.
///
/// Centralises the state a frontend reads: the phase, the status line and
/// the live counters. The scan thread communicates via the engine's
/// progress channel; state updates happen in `process_scan_messages()`,
/// which a frontend calls from its own loop (once per frame in a GUI).
use crate::report;
use crossbeam_channel::Receiver;
use devstats_core::collector::{
    self, Collector, ExtensionCollector, ExtensionReport, SharedCollector, SourceFileCollector,
    SourceFileReport,
};
use devstats_core::model::format_count;
use devstats_core::scanner::progress::{ScanOutcome, ScanProgress, ScanSummary};
use devstats_core::scanner::{ScanConfig, ScanEngine, StartResult};
use devstats_core::ScanError;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The current phase of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    /// No scan in progress and no results yet.
    Idle,
    /// Scanning, live counters updating.
    Scanning,
    /// Scan ended (finished, cancelled or failed); collector snapshots are current.
    Results,
}

/// Status line shown while nothing has been scanned.
pub const STATUS_READY: &str = "Ready";

/// Maximum number of scan-progress messages drained from the channel per call.
///
/// Keeps one call short when the scanner has raced far ahead of the frontend.
pub const MAX_MESSAGES_PER_FRAME: usize = 300;

/// All application state.
pub struct AppState {
    // ── Scan ───────────────────────────────────────────
    pub phase: AppPhase,
    /// Human-readable one-line status.
    pub status_text: String,
    pub scan_root: Option<PathBuf>,
    pub scan_files_found: u64,
    /// Name of the most recently visited file.
    pub scan_current_file: String,
    pub scan_duration: Option<Duration>,
    /// True if the most recent scan was cancelled (partial results).
    pub scan_was_cancelled: bool,
    /// Failure message of the most recent scan, if it failed.
    pub scan_error: Option<String>,

    // ── Collectors ─────────────────────────────────────
    extensions: Arc<Mutex<ExtensionCollector>>,
    source_files: Arc<Mutex<SourceFileCollector>>,
    collectors: Vec<SharedCollector>,

    // ── Engine ─────────────────────────────────────────
    engine: ScanEngine,
    progress_rx: Receiver<ScanProgress>,
    /// A scan was started whose completion message has not been handled yet.
    awaiting_completion: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new("cs", collector::source_files::DEFAULT_BUCKET_BUDGET)
    }
}

impl AppState {
    /// Create initial application state with the built-in collectors.
    ///
    /// `source_extension` selects the files whose sizes are sampled into the
    /// histogram; `bucket_budget` is the histogram's maximum bucket count.
    pub fn new(source_extension: &str, bucket_budget: usize) -> Self {
        let (extensions, extensions_shared) = collector::share(ExtensionCollector::new());
        let (source_files, source_files_shared) = collector::share(
            SourceFileCollector::new(source_extension).with_bucket_budget(bucket_budget),
        );
        let collectors = vec![extensions_shared, source_files_shared];

        let mut engine = ScanEngine::new();
        engine.register_collectors(collectors.iter().cloned());
        let progress_rx = engine.subscribe();

        Self {
            phase: AppPhase::Idle,
            status_text: STATUS_READY.to_string(),
            scan_root: None,
            scan_files_found: 0,
            scan_current_file: String::new(),
            scan_duration: None,
            scan_was_cancelled: false,
            scan_error: None,
            extensions,
            source_files,
            collectors,
            engine,
            progress_rx,
            awaiting_completion: false,
        }
    }

    /// Start a scan described by `config`.
    ///
    /// A request while a scan is running changes nothing and returns
    /// [`StartResult::Busy`]. Validation errors leave the previous results
    /// in place and are echoed in the status line.
    pub fn start_scan(&mut self, config: ScanConfig) -> Result<StartResult, ScanError> {
        if self.engine.is_busy() {
            return Ok(StartResult::Busy);
        }
        // The previous worker is idle but may not have announced completion yet.
        self.drain_until_completed();

        for collector in &self.collectors {
            collector.lock().clear();
        }

        let root = config.root.clone();
        match self.engine.start(config) {
            Ok(StartResult::Started) => {
                self.phase = AppPhase::Scanning;
                self.scan_root = Some(root);
                self.scan_files_found = 0;
                self.scan_current_file.clear();
                self.scan_duration = None;
                self.scan_was_cancelled = false;
                self.scan_error = None;
                self.awaiting_completion = true;
                self.status_text = scanning_status(0);
                Ok(StartResult::Started)
            }
            Ok(StartResult::Busy) => Ok(StartResult::Busy),
            Err(err) => {
                warn!("Cannot start scan: {err}");
                self.status_text = format!("Cannot start scan: {err}");
                Err(err)
            }
        }
    }

    /// Ask any running scan to stop. Completion still arrives through
    /// [`process_scan_messages`](Self::process_scan_messages).
    pub fn cancel_scan(&mut self) {
        if self.phase == AppPhase::Scanning {
            self.engine.stop();
            self.status_text = "Cancelling...".to_string();
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.phase == AppPhase::Scanning
    }

    /// Process pending scan progress messages without blocking.
    ///
    /// Returns `true` if anything changed (new data arrived).
    pub fn process_scan_messages(&mut self) -> bool {
        let mut changed = false;
        let mut messages_this_frame = 0usize;
        while messages_this_frame < MAX_MESSAGES_PER_FRAME {
            let msg = match self.progress_rx.try_recv() {
                Ok(m) => m,
                Err(_) => break,
            };
            messages_this_frame += 1;
            changed = true;
            if self.handle_message(msg) {
                break;
            }
        }
        changed
    }

    /// Apply one message; returns `true` for the completion message.
    fn handle_message(&mut self, msg: ScanProgress) -> bool {
        match msg {
            ScanProgress::File(notification) => {
                self.scan_files_found = notification.file_count;
                self.scan_current_file = notification.file_name.to_string();
                if self.phase == AppPhase::Scanning {
                    self.status_text = scanning_status(notification.file_count);
                }
                false
            }
            ScanProgress::Completed(summary) => {
                self.complete_scan(summary);
                true
            }
        }
    }

    fn complete_scan(&mut self, summary: ScanSummary) {
        for collector in &self.collectors {
            collector.lock().refresh_presentation();
        }

        self.awaiting_completion = false;
        self.phase = AppPhase::Results;
        self.scan_files_found = summary.files_visited;
        self.scan_duration = Some(summary.duration);
        self.status_text = match &summary.outcome {
            ScanOutcome::Finished => format!(
                "Scan completed. Files found: {}",
                format_count(summary.files_visited)
            ),
            ScanOutcome::Cancelled => {
                self.scan_was_cancelled = true;
                format!(
                    "Scan cancelled. Files found: {}",
                    format_count(summary.files_visited)
                )
            }
            ScanOutcome::Failed(message) => {
                self.scan_error = Some(message.clone());
                format!("Scan failed: {message}")
            }
        };
        debug!("{}", self.status_text);
    }

    /// Block until the current scan ends, processing every message.
    pub fn wait_for_completion(&mut self) {
        self.drain_until_completed();
        self.engine.wait();
    }

    fn drain_until_completed(&mut self) {
        while self.awaiting_completion {
            match self.progress_rx.recv() {
                Ok(msg) => {
                    self.handle_message(msg);
                }
                Err(_) => self.awaiting_completion = false,
            }
        }
    }

    /// Snapshot published by the extension collector after the last scan.
    pub fn extension_report(&self) -> ExtensionReport {
        self.extensions.lock().report().clone()
    }

    /// Snapshot published by the source-file collector after the last scan.
    pub fn source_file_report(&self) -> SourceFileReport {
        self.source_files.lock().report().clone()
    }

    /// Display names of the registered collectors, in report order.
    pub fn collector_names(&self) -> Vec<String> {
        self.collectors
            .iter()
            .map(|collector| collector.lock().name().to_string())
            .collect()
    }

    /// Markdown report of every collector, headed by the scanned root.
    pub fn markdown_report(&self) -> String {
        report::markdown_report(
            self.scan_root.as_deref(),
            chrono::Local::now(),
            &self.collectors,
        )
    }
}

fn scanning_status(files_found: u64) -> String {
    format!("Scanning... Files found: {}", format_count(files_found))
}
