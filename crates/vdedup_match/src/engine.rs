use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use vdedup_fingerprint::{normalize, Fingerprint, FINGERPRINT_BITS};
use vdedup_index::{RawReferenceRecord, ReferenceIndex, ReferenceItem};

use crate::metrics::metrics_recorder;
use crate::types::{DetectRequest, MatchConfig, MatchError, MatchOutcome};

/// Trait for a detection engine.
pub trait Detector: Send + Sync {
    /// Run a single detection request to a final verdict.
    fn detect(&self, req: &DetectRequest) -> Result<MatchOutcome, MatchError>;
}

/// Default detection engine over a shared, read-only reference index.
///
/// Detection itself is synchronous and allocation-light; any number of
/// requests may run concurrently against the same index. To apply live
/// updates to the reference collection, build a fresh [`ReferenceIndex`] and
/// construct a new detector around it (or swap the `Arc` handle at the
/// host's level); the engine never mutates indexed items.
pub struct DuplicateDetector {
    index: Arc<ReferenceIndex>,
}

impl DuplicateDetector {
    /// Construct a detector owning a fresh index.
    pub fn new(index: ReferenceIndex) -> Self {
        Self::with_index_arc(Arc::new(index))
    }

    /// Construct a detector from a shared index handle.
    pub fn with_index_arc(index: Arc<ReferenceIndex>) -> Self {
        Self { index }
    }

    /// Convenience helper: resolve raw store rows and build the detector in
    /// one step. Fails with [`MatchError::Index`] on an empty collection.
    pub fn from_records(records: Vec<RawReferenceRecord>) -> Result<Self, MatchError> {
        Ok(Self::new(ReferenceIndex::load(records)?))
    }

    /// The shared index handle.
    pub fn index(&self) -> &Arc<ReferenceIndex> {
        &self.index
    }

    /// Exact identifier/URL shortcut.
    ///
    /// An identical source identifier is a stronger and cheaper duplicate
    /// signal than any fingerprint comparison, so a hit here short-circuits
    /// with a perfect-match outcome and no fingerprint is ever computed.
    pub fn detect_exact(&self, query_id: &str, threshold: u32) -> Option<MatchOutcome> {
        self.index.find_exact(query_id).map(|item| {
            debug!(query_id, matched = %item.video_id, "exact identifier hit");
            MatchOutcome::exact(item.clone(), threshold)
        })
    }

    /// Fingerprint comparison path: prefilter, rank, classify.
    pub fn detect_fingerprint(&self, target: &Fingerprint, cfg: &MatchConfig) -> MatchOutcome {
        let candidates = prefilter(target, &self.index, cfg.prefix_length);
        let compared = candidates
            .iter()
            .filter(|item| item.fingerprint.is_some())
            .count();
        let (distance, best) = rank(target, candidates);
        let (is_duplicate, similarity) = classify(distance, cfg.threshold);
        debug!(
            distance,
            compared,
            is_duplicate,
            prefix_length = cfg.prefix_length,
            "ranked prefiltered candidates"
        );
        MatchOutcome {
            is_duplicate,
            hamming_distance: distance,
            similarity,
            closest_match: best.cloned(),
            threshold: cfg.threshold,
            total_candidates: compared,
        }
    }

    fn run(&self, req: &DetectRequest) -> Result<MatchOutcome, MatchError> {
        if let Some(query_id) = req.query_id.as_deref() {
            if let Some(outcome) = self.detect_exact(query_id, req.config.threshold) {
                return Ok(outcome);
            }
        }
        let raw = req
            .fingerprint
            .as_ref()
            .ok_or(MatchError::MissingFingerprint)?;
        let target = normalize(raw)?;
        Ok(self.detect_fingerprint(&target, &req.config))
    }
}

impl Detector for DuplicateDetector {
    fn detect(&self, req: &DetectRequest) -> Result<MatchOutcome, MatchError> {
        req.config.validate()?;
        let start = Instant::now();
        let outcome = self.run(req)?;
        if let Some(recorder) = metrics_recorder() {
            recorder.record_detect(start.elapsed(), &outcome);
        }
        Ok(outcome)
    }
}

/// Narrow the index down to items sharing the query's leading digits.
///
/// The query's prefix key is truncated to `prefix_length` and matched
/// against cached item keys. This is a deliberate precision/performance
/// trade-off, not a nearest-neighbor guarantee: the true closest item is
/// only found when its differing bits lie outside the shared prefix.
/// Lowering `prefix_length` widens the bucket (more recall, more scanning);
/// `0` disables the prefilter and returns the whole collection.
pub fn prefilter<'a>(
    target: &Fingerprint,
    index: &'a ReferenceIndex,
    prefix_length: usize,
) -> Vec<&'a ReferenceItem> {
    let key = target.prefix_key().truncated(prefix_length);
    index.candidates_by_prefix(&key)
}

/// Scan candidates for the minimum Hamming distance to `target`.
///
/// Ties keep the first-seen minimum, so the result is deterministic given
/// candidate order (index order, i.e. insertion order). Candidates without
/// a usable fingerprint are skipped. An empty or all-skipped input returns
/// the `(64, None)` sentinel: "certainly not a duplicate", not a measured
/// distance.
pub fn rank<'a, I>(target: &Fingerprint, candidates: I) -> (u32, Option<&'a ReferenceItem>)
where
    I: IntoIterator<Item = &'a ReferenceItem>,
{
    let mut min_distance = FINGERPRINT_BITS as u32;
    let mut best: Option<&ReferenceItem> = None;
    for item in candidates {
        let Some(fp) = item.fingerprint.as_ref() else {
            continue;
        };
        let distance = target.distance(fp);
        if best.is_none() || distance < min_distance {
            min_distance = distance;
            best = Some(item);
        }
    }
    if best.is_none() {
        min_distance = FINGERPRINT_BITS as u32;
    }
    (min_distance, best)
}

/// Apply the duplicate threshold to a ranked distance.
///
/// Returns the verdict and the similarity score `max(0, 64 - distance)`.
pub fn classify(min_distance: u32, threshold: u32) -> (bool, u32) {
    let is_duplicate = min_distance <= threshold;
    let similarity = (FINGERPRINT_BITS as u32).saturating_sub(min_distance);
    (is_duplicate, similarity)
}
