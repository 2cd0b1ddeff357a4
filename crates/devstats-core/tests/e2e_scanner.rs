/// End-to-end scan engine tests.
///
/// These run the real engine against temporary directory trees and observe
/// it only through its progress channel and the collectors it feeds, the
/// same way a frontend does.
use devstats_core::collector::{
    self, Collector, EntryKind, ExtensionCollector, SharedCollector, SourceFileCollector,
};
use devstats_core::scanner::progress::{
    ScanNotification, ScanOutcome, ScanProgress, ScanSummary, PROGRESS_CHANNEL_CAPACITY,
};
use devstats_core::scanner::{ScanConfig, ScanEngine, ScanState, StartResult};
use devstats_core::ScanError;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// ```text
/// root/
///   readme.md       (10 bytes)
///   src/
///     main.cs       (120 bytes)
///     util.cs       (80 bytes)
///     nested/
///       deep.cs     (40 bytes)
///   docs/
///     guide.txt     (5 bytes)
/// ```
fn build_test_tree(root: &Path) {
    fs::create_dir_all(root.join("src").join("nested")).unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    write_bytes(&root.join("readme.md"), 10);
    write_bytes(&root.join("src").join("main.cs"), 120);
    write_bytes(&root.join("src").join("util.cs"), 80);
    write_bytes(&root.join("src").join("nested").join("deep.cs"), 40);
    write_bytes(&root.join("docs").join("guide.txt"), 5);
}

fn write_bytes(path: &Path, n: usize) {
    fs::write(path, vec![b'x'; n]).unwrap();
}

/// Collect every message until the completion message arrives.
fn drain_to_completion(rx: &Receiver<ScanProgress>) -> (Vec<ScanNotification>, ScanSummary) {
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut files = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        assert!(!remaining.is_zero(), "scan did not complete within 30 seconds");
        match rx.recv_timeout(remaining) {
            Ok(ScanProgress::File(notification)) => files.push(notification),
            Ok(ScanProgress::Completed(summary)) => return (files, summary),
            Err(err) => panic!("progress channel failed before completion: {err}"),
        }
    }
}

fn names(files: &[ScanNotification]) -> BTreeSet<String> {
    files.iter().map(|n| n.file_name.to_string()).collect()
}

/// Sleeps on every entry so tests can act while a scan is still running.
struct SlowCollector;

impl Collector for SlowCollector {
    fn name(&self) -> &str {
        "slow"
    }
    fn process_entry(&mut self, _path: &Path, _kind: EntryKind) {
        std::thread::sleep(Duration::from_millis(2));
    }
    fn clear(&mut self) {}
    fn refresh_presentation(&mut self) {}
    fn export_summary(&self) -> String {
        String::new()
    }
}

struct PanickingCollector;

impl Collector for PanickingCollector {
    fn name(&self) -> &str {
        "panicking"
    }
    fn process_entry(&mut self, _path: &Path, kind: EntryKind) {
        if kind == EntryKind::File {
            panic!("collector blew up");
        }
    }
    fn clear(&mut self) {}
    fn refresh_presentation(&mut self) {}
    fn export_summary(&self) -> String {
        String::new()
    }
}

fn slow_collector() -> SharedCollector {
    Arc::new(Mutex::new(SlowCollector))
}

// ── Traversal ────────────────────────────────────────────────────────────────

/// Every file is visited exactly once and the running count ends at the
/// true file count.
#[test]
fn scan_visits_every_file_exactly_once() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    assert_eq!(
        engine.start(ScanConfig::new(tmp.path())).unwrap(),
        StartResult::Started
    );
    let (files, summary) = drain_to_completion(&rx);

    assert_eq!(summary.outcome, ScanOutcome::Finished);
    assert_eq!(summary.files_visited, 5);
    assert_eq!(files.len(), 5);
    let counts: Vec<u64> = files.iter().map(|n| n.file_count).collect();
    assert_eq!(counts, vec![1, 2, 3, 4, 5]);
    assert_eq!(
        names(&files),
        ["readme.md", "main.cs", "util.cs", "deep.cs", "guide.txt"]
            .into_iter()
            .map(String::from)
            .collect()
    );
}

/// Files of a directory come before its subdirectories, in name order.
#[test]
fn scan_order_is_files_then_subdirectories() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (files, _) = drain_to_completion(&rx);

    let order: Vec<&str> = files.iter().map(|n| n.file_name.as_str()).collect();
    assert_eq!(
        order,
        vec!["readme.md", "guide.txt", "main.cs", "util.cs", "deep.cs"]
    );
    let main = files.iter().find(|n| n.file_name == "main.cs").unwrap();
    assert_eq!(main.file_size, 120);
}

/// An empty directory yields no file notifications and one completion.
#[test]
fn scan_empty_directory() {
    let tmp = TempDir::new().unwrap();

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (files, summary) = drain_to_completion(&rx);
    engine.wait();

    assert!(files.is_empty());
    assert_eq!(summary.files_visited, 0);
    assert_eq!(summary.outcome, ScanOutcome::Finished);
    assert!(rx.try_recv().is_err(), "only one completion message expected");
    assert_eq!(engine.state(), ScanState::Idle);
}

/// Dot-directories are skipped entirely; dot-files are not.
#[test]
fn hidden_directories_are_skipped() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".git").join("objects")).unwrap();
    write_bytes(&tmp.path().join(".git").join("config"), 10);
    write_bytes(&tmp.path().join(".git").join("objects").join("ab"), 10);
    write_bytes(&tmp.path().join(".editorconfig"), 10);
    write_bytes(&tmp.path().join("main.cs"), 10);

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (files, _) = drain_to_completion(&rx);

    assert_eq!(
        names(&files),
        [".editorconfig", "main.cs"]
            .into_iter()
            .map(String::from)
            .collect()
    );
}

// ── Ignore file ──────────────────────────────────────────────────────────────

fn build_ignored_tree(root: &Path) {
    fs::create_dir_all(root.join("build").join("obj")).unwrap();
    fs::create_dir_all(root.join("a")).unwrap();
    fs::write(root.join(".gitignore"), "# generated\nbuild/\n/secret.txt\n*.LOG\n").unwrap();
    write_bytes(&root.join("build").join("out.o"), 10);
    write_bytes(&root.join("build").join("obj").join("x.o"), 10);
    write_bytes(&root.join("secret.txt"), 10);
    write_bytes(&root.join("a").join("secret.txt"), 10);
    write_bytes(&root.join("a").join("trace.log"), 10);
    write_bytes(&root.join("a").join("keep.cs"), 10);
}

#[test]
fn gitignore_patterns_filter_entries() {
    let tmp = TempDir::new().unwrap();
    build_ignored_tree(tmp.path());

    let (ext, shared) = collector::share(ExtensionCollector::new());
    let mut engine = ScanEngine::new();
    engine.register_collectors([shared]);
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (files, summary) = drain_to_completion(&rx);

    assert_eq!(summary.files_visited, 3);
    assert_eq!(
        names(&files),
        [".gitignore", "secret.txt", "keep.cs"]
            .into_iter()
            .map(String::from)
            .collect()
    );
    let mut collector = ext.lock();
    collector.refresh_presentation();
    // root + a; build/ is ignored before collectors see it.
    assert_eq!(collector.report().folder_count, 2);
    assert_eq!(collector.report().file_count, 3);
}

#[test]
fn gitignore_can_be_disabled() {
    let tmp = TempDir::new().unwrap();
    build_ignored_tree(tmp.path());

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    engine
        .start(ScanConfig::new(tmp.path()).with_ignore_file(false))
        .unwrap();
    let (files, _) = drain_to_completion(&rx);

    assert_eq!(files.len(), 7);
}

// ── Collectors ───────────────────────────────────────────────────────────────

#[test]
fn collectors_see_files_and_directories() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let (ext, ext_shared) = collector::share(ExtensionCollector::new());
    let (cs, cs_shared) = collector::share(SourceFileCollector::new("cs"));
    let mut engine = ScanEngine::new();
    engine.register_collectors([ext_shared, cs_shared]);
    assert_eq!(engine.collector_count(), 2);

    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    drain_to_completion(&rx);

    let mut ext = ext.lock();
    ext.refresh_presentation();
    assert_eq!(ext.report().folder_count, 4);
    assert_eq!(ext.report().file_count, 5);
    assert_eq!(ext.report().extensions[0].extension, ".cs");
    assert_eq!(ext.report().extensions[0].count, 3);

    let mut cs = cs.lock();
    cs.refresh_presentation();
    assert_eq!(cs.report().file_count, 3);
    assert_eq!(cs.report().total_bytes, 240);
    assert_eq!(cs.report().largest.as_ref().unwrap().size, 120);
}

/// A panicking collector fails the scan but still produces one completion.
#[test]
fn panicking_collector_fails_the_scan() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let mut engine = ScanEngine::new();
    engine.register_collectors([Arc::new(Mutex::new(PanickingCollector)) as SharedCollector]);
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (_, summary) = drain_to_completion(&rx);
    engine.wait();

    match summary.outcome {
        ScanOutcome::Failed(message) => assert!(message.contains("collector blew up")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(engine.last_outcome(), Some(ScanOutcome::Failed(_))));
    assert_eq!(engine.state(), ScanState::Idle);
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

#[test]
fn invalid_roots_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let engine = ScanEngine::new();

    let missing = tmp.path().join("does-not-exist");
    assert!(matches!(
        engine.start(ScanConfig::new(&missing)),
        Err(ScanError::InvalidRoot(path)) if path == missing
    ));
    assert!(matches!(
        engine.start(ScanConfig::new("")),
        Err(ScanError::EmptyRoot)
    ));

    let file = tmp.path().join("plain.txt");
    write_bytes(&file, 1);
    assert!(matches!(
        engine.start(ScanConfig::new(&file)),
        Err(ScanError::InvalidRoot(_))
    ));
    assert_eq!(engine.state(), ScanState::Idle);
}

#[test]
fn cancellation_stops_early_and_reports_cancelled() {
    let tmp = TempDir::new().unwrap();
    for i in 0..500 {
        write_bytes(&tmp.path().join(format!("file{i:04}.bin")), 16);
    }

    let mut engine = ScanEngine::new();
    engine.register_collectors([slow_collector()]);
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();

    // Wait for the first file, then cancel.
    match rx.recv_timeout(Duration::from_secs(30)).unwrap() {
        ScanProgress::File(_) => {}
        other => panic!("expected a file notification first, got {other:?}"),
    }
    engine.stop();

    let (files, summary) = drain_to_completion(&rx);
    assert_eq!(summary.outcome, ScanOutcome::Cancelled);
    assert!(summary.files_visited < 500);
    assert_eq!(files.len() as u64 + 1, summary.files_visited);
    assert_eq!(engine.last_outcome(), Some(ScanOutcome::Cancelled));
}

#[test]
fn start_while_scanning_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    for i in 0..200 {
        write_bytes(&tmp.path().join(format!("file{i:04}.bin")), 16);
    }

    let mut engine = ScanEngine::new();
    engine.register_collectors([slow_collector()]);
    let rx = engine.subscribe();
    assert_eq!(
        engine.start(ScanConfig::new(tmp.path())).unwrap(),
        StartResult::Started
    );
    assert!(engine.is_busy());
    assert_eq!(
        engine.start(ScanConfig::new(tmp.path())).unwrap(),
        StartResult::Busy
    );

    engine.stop();
    drain_to_completion(&rx);
    assert!(rx.try_recv().is_err(), "the ignored start must not emit anything");
}

/// The engine can be reused; the running count restarts from one.
#[test]
fn sequential_scans_reset_the_counter() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    for _ in 0..2 {
        engine.start(ScanConfig::new(tmp.path())).unwrap();
        let (files, summary) = drain_to_completion(&rx);
        assert_eq!(files[0].file_count, 1);
        assert_eq!(summary.files_visited, 5);
        engine.wait();
    }
    assert_eq!(engine.files_visited(), 5);
}

/// A receiver dropped mid-way does not disturb other subscribers.
#[test]
fn dropped_subscriber_does_not_block_others() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let engine = ScanEngine::new();
    drop(engine.subscribe());
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (files, _) = drain_to_completion(&rx);
    assert_eq!(files.len(), 5);
}

/// A subscriber that is never read must not keep `stop()` from ending the scan.
#[test]
fn stalled_subscriber_does_not_block_stop() {
    let tmp = TempDir::new().unwrap();
    for i in 0..5000 {
        write_bytes(&tmp.path().join(format!("f{i:05}.txt")), 1);
    }

    let engine = ScanEngine::new();
    let _idle = engine.subscribe();
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();

    // Once the idle queue is full the scanner waits on it.
    for _ in 0..PROGRESS_CHANNEL_CAPACITY {
        match rx.recv_timeout(Duration::from_secs(30)).unwrap() {
            ScanProgress::File(_) => {}
            other => panic!("expected a file notification, got {other:?}"),
        }
    }
    engine.stop();

    let (_, summary) = drain_to_completion(&rx);
    assert_eq!(summary.outcome, ScanOutcome::Cancelled);
    assert!(summary.files_visited < 5000);
    engine.wait();
    assert_eq!(engine.state(), ScanState::Idle);
}

/// Once `wait()` returns the completion is queued, so a restart cannot
/// interleave with it.
#[test]
fn completion_is_queued_before_wait_returns() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    engine.wait();
    assert_eq!(rx.len(), 6);

    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (first, summary) = drain_to_completion(&rx);
    assert_eq!(first.len(), 5);
    assert_eq!(summary.outcome, ScanOutcome::Finished);

    let (second, _) = drain_to_completion(&rx);
    assert_eq!(second.len(), 5);
    assert_eq!(second[0].file_count, 1);
    engine.wait();
    assert!(rx.try_recv().is_err());
}

// ── I/O errors ───────────────────────────────────────────────────────────────

/// An unreadable directory is skipped; its siblings are still scanned.
#[cfg(unix)]
#[test]
fn unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let locked = tmp.path().join("a_locked");
    fs::create_dir_all(&locked).unwrap();
    write_bytes(&locked.join("hidden.txt"), 1);
    fs::create_dir_all(tmp.path().join("b_open")).unwrap();
    write_bytes(&tmp.path().join("b_open").join("after.txt"), 1);
    write_bytes(&tmp.path().join("top.txt"), 1);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Running with privileges that bypass permission bits.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (files, summary) = drain_to_completion(&rx);
    engine.wait();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(summary.outcome, ScanOutcome::Finished);
    assert_eq!(
        names(&files),
        ["after.txt", "top.txt"]
            .into_iter()
            .map(String::from)
            .collect()
    );
}

/// Removes a directory the walker has listed but not yet entered.
struct DirectoryRemover {
    trigger: &'static str,
    target: PathBuf,
}

impl Collector for DirectoryRemover {
    fn name(&self) -> &str {
        "remover"
    }
    fn process_entry(&mut self, path: &Path, kind: EntryKind) {
        if kind == EntryKind::File && path.file_name().is_some_and(|n| n == self.trigger) {
            let _ = fs::remove_dir_all(&self.target);
        }
    }
    fn clear(&mut self) {}
    fn refresh_presentation(&mut self) {}
    fn export_summary(&self) -> String {
        String::new()
    }
}

/// Errors other than permission denials end the scan as failed, with
/// exactly one completion.
#[test]
fn vanished_directory_fails_the_scan() {
    let tmp = TempDir::new().unwrap();
    write_bytes(&tmp.path().join("a.txt"), 1);
    fs::create_dir_all(tmp.path().join("b_dir")).unwrap();
    write_bytes(&tmp.path().join("b_dir").join("inner.txt"), 1);

    let mut engine = ScanEngine::new();
    engine.register_collectors([Arc::new(Mutex::new(DirectoryRemover {
        trigger: "a.txt",
        target: tmp.path().join("b_dir"),
    })) as SharedCollector]);
    let rx = engine.subscribe();
    engine.start(ScanConfig::new(tmp.path())).unwrap();
    let (files, summary) = drain_to_completion(&rx);
    engine.wait();

    assert!(matches!(summary.outcome, ScanOutcome::Failed(_)));
    assert_eq!(names(&files), ["a.txt"].into_iter().map(String::from).collect());
    assert!(matches!(engine.last_outcome(), Some(ScanOutcome::Failed(_))));
    assert!(rx.try_recv().is_err(), "only one completion per scan");
}

/// A `.gitignore` with stray non-UTF-8 bytes still loads.
#[test]
fn ignore_file_with_invalid_utf8_is_accepted() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".gitignore"), b"bin/\n# caf\xe9\n*.log\n").unwrap();
    fs::create_dir_all(tmp.path().join("bin")).unwrap();
    write_bytes(&tmp.path().join("bin").join("out.dll"), 1);
    write_bytes(&tmp.path().join("build.log"), 1);
    write_bytes(&tmp.path().join("main.cs"), 1);

    let engine = ScanEngine::new();
    let rx = engine.subscribe();
    assert_eq!(
        engine.start(ScanConfig::new(tmp.path())).unwrap(),
        StartResult::Started
    );
    let (files, summary) = drain_to_completion(&rx);
    assert_eq!(summary.outcome, ScanOutcome::Finished);
    assert_eq!(
        names(&files),
        [".gitignore", "main.cs"]
            .into_iter()
            .map(String::from)
            .collect()
    );
}
