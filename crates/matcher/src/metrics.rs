// Metrics hooks for the `matcher` crate.
//
// Callers install a global `ScanMetrics` implementation via [`set_scan_metrics`];
// every `Scanner::scan` then reports latency, candidate and failure counts and
// whether a match was found. This keeps instrumentation decoupled from any
// specific metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

/// Metrics observer for catalog scans.
pub trait ScanMetrics: Send + Sync {
    /// `candidates` counts the images that were scored, `failures` the ones
    /// among them that could not be loaded or decoded.
    fn record_scan(&self, candidates: usize, failures: usize, matched: bool, latency: Duration);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn ScanMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn ScanMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn ScanMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global scan metrics recorder.
pub fn set_scan_metrics(recorder: Option<Arc<dyn ScanMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
