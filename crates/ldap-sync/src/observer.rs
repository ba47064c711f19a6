//! Hooks for hosts that want to follow a run as it happens.

use dirsync_core::models::sync::{PairReport, RunSummary};

/// Notified synchronously by [`crate::task::SyncTask`]. Both methods default
/// to doing nothing.
pub trait SyncObserver: Send + Sync {
    /// Called once per (configuration, context) pair, failed or not.
    fn pair_finished(&self, _report: &PairReport) {}

    /// Called once after the transaction was committed or rolled back.
    fn run_finished(&self, _summary: &RunSummary) {}
}
