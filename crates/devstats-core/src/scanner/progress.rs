/// Scan progress reporting: messages pushed from the scan thread to any
/// number of subscribers over bounded crossbeam channels.
///
/// The channel does no thread marshalling. A subscriber that must touch
/// state owned by another thread (a UI, for instance) drains its receiver
/// on that thread.
use compact_str::CompactString;
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// Maximum number of messages that may queue up for one subscriber.
///
/// A subscriber that falls this far behind stalls the scanner until it
/// drains its queue or the scan is cancelled, bounding memory on trees
/// with millions of files.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Emitted once per visited (non-ignored) file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanNotification {
    /// File name only, not the full path.
    pub file_name: CompactString,
    /// File size in bytes.
    pub file_size: u64,
    /// Running count of files visited so far in this scan, starting at 1.
    pub file_count: u64,
}

impl ScanNotification {
    pub fn new(file_name: impl Into<CompactString>, file_size: u64, file_count: u64) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            file_count,
        }
    }
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The whole tree was traversed.
    Finished,
    /// `stop()` was honoured before the tree was exhausted.
    Cancelled,
    /// An unexpected error aborted the traversal.
    Failed(String),
}

/// Final statistics carried by the completion message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub outcome: ScanOutcome,
    pub files_visited: u64,
    pub duration: Duration,
}

/// Messages delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanProgress {
    /// A file was visited.
    File(ScanNotification),
    /// The scan ended. Sent exactly once per started scan, whatever the outcome.
    Completed(ScanSummary),
}

/// How long a blocked send waits before re-checking the cancel flag.
const SEND_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// After cancellation, how long the completion waits on subscribers whose
/// queue is full before giving up on them.
pub const CANCELLED_COMPLETION_GRACE: Duration = Duration::from_secs(1);

/// Fan-out of progress messages to every live subscriber.
///
/// Sends apply backpressure: a full queue blocks the scanner until that
/// subscriber catches up. Once the shared cancel flag is raised, full
/// queues no longer block; progress messages for them are dropped and the
/// completion is abandoned after [`CANCELLED_COMPLETION_GRACE`].
#[derive(Debug, Default)]
pub struct ProgressChannel {
    subscribers: Mutex<Vec<Sender<ScanProgress>>>,
    cancel_flag: Arc<AtomicBool>,
}

impl ProgressChannel {
    /// A channel with its own, never raised, cancel flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that stops blocking on full queues once `cancel_flag` is raised.
    pub fn with_cancel_flag(cancel_flag: Arc<AtomicBool>) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            cancel_flag,
        }
    }

    /// Register a new subscriber. Messages sent before this call are not replayed.
    pub fn subscribe(&self) -> Receiver<ScanProgress> {
        let (tx, rx) = crossbeam_channel::bounded(PROGRESS_CHANNEL_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Number of subscribers still connected as of the last send.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn notify_progress(&self, notification: ScanNotification) {
        let message = ScanProgress::File(notification);
        let mut gone = Vec::new();
        for tx in self.senders() {
            if !self.deliver(&tx, message.clone()) {
                gone.push(tx);
            }
        }
        self.prune(&gone);
    }

    /// Deliver the completion message to every subscriber, exactly once each.
    pub fn notify_completed(&self, summary: ScanSummary) {
        let message = ScanProgress::Completed(summary);
        let mut pending = self.senders();
        let mut gone = Vec::new();
        let mut cancelled_since: Option<Instant> = None;

        loop {
            pending.retain(|tx| match tx.try_send(message.clone()) {
                Ok(()) => false,
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => {
                    gone.push(tx.clone());
                    false
                }
            });
            if pending.is_empty() {
                break;
            }
            if self.is_cancelled() {
                let since = *cancelled_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= CANCELLED_COMPLETION_GRACE {
                    warn!(
                        "Dropping scan completion for {} stalled subscriber(s)",
                        pending.len()
                    );
                    break;
                }
            }
            thread::sleep(SEND_POLL_INTERVAL);
        }
        self.prune(&gone);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Copy of the subscriber list, so no send happens under the lock.
    fn senders(&self) -> Vec<Sender<ScanProgress>> {
        self.subscribers.lock().clone()
    }

    /// Send one progress message; `false` if the receiver is gone.
    fn deliver(&self, tx: &Sender<ScanProgress>, mut message: ScanProgress) -> bool {
        loop {
            if self.is_cancelled() {
                return !matches!(tx.try_send(message), Err(TrySendError::Disconnected(_)));
            }
            match tx.send_timeout(message, SEND_POLL_INTERVAL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(unsent)) => message = unsent,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    fn prune(&self, gone: &[Sender<ScanProgress>]) {
        if gone.is_empty() {
            return;
        }
        self.subscribers
            .lock()
            .retain(|tx| !gone.iter().any(|dead| dead.same_channel(tx)));
    }
}
