//! vdedup_match: duplicate detection over an indexed reference collection.
//!
//! A detection request flows exact-match shortcut → fingerprint
//! normalization → prefix prefilter → Hamming ranking → threshold
//! classification, producing one immutable [`MatchOutcome`] per request. The
//! engine holds no per-query state afterwards and performs no I/O; both the
//! reference index and the query fingerprint are inputs.

mod engine;
mod metrics;
mod types;

pub use engine::{classify, prefilter, rank, Detector, DuplicateDetector};
pub use metrics::{set_detect_metrics, DetectMetrics};
pub use types::{DetectRequest, MatchConfig, MatchError, MatchOutcome};
