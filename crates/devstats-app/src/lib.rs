/// DevStats App — frontend state for the statistics scanner.
///
/// This crate owns the observer side of a scan: it drives the engine,
/// drains its progress channel and turns the collectors' snapshots into
/// reports. Business logic lives in `devstats-core`.
pub mod report;
pub mod state;

pub use state::{AppPhase, AppState};
