// Metrics hooks for the detection engine.
//
// Callers install a global `DetectMetrics` implementation via
// [`set_detect_metrics`]; `DuplicateDetector` then reports per-request
// latency and outcome for each detect call. Instrumentation stays decoupled
// from any specific metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::types::MatchOutcome;

/// Metrics observer for detection requests.
pub trait DetectMetrics: Send + Sync {
    /// Record one completed detection: wall-clock latency and the outcome
    /// reported to the caller.
    fn record_detect(&self, latency: Duration, outcome: &MatchOutcome);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn DetectMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn DetectMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn DetectMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global detect metrics recorder.
///
/// Typically called once during startup so every detector instance shares
/// the same backend.
pub fn set_detect_metrics(recorder: Option<Arc<dyn DetectMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
