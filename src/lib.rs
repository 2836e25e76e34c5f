//! Workspace umbrella crate for vdedup.
//!
//! Stitches the fingerprint codec, the reference index, and the detection
//! engine together so callers can go from a persisted record collection and
//! a query locator to a duplicate verdict with a single API entry point. The
//! perceptual fingerprint producer itself is an external collaborator: this
//! crate only defines its seam ([`FingerprintProducer`]) and the
//! deterministic fallback applied when it is unavailable.

pub use vdedup_fingerprint::{
    fallback_fingerprint, fallback_for_id, hamming_distance, normalize, normalize_bits,
    normalize_prefix, normalize_prefix_int, Fingerprint, FingerprintError, PrefixKey,
    RawFingerprint, FINGERPRINT_BITS, PREFIX_BITS,
};
pub use vdedup_index::{
    IndexError, RawId, RawPrefix, RawReferenceRecord, RawTimestamp, ReferenceIndex, ReferenceItem,
};
pub use vdedup_match::{
    classify, prefilter, rank, set_detect_metrics, DetectMetrics, DetectRequest, Detector,
    DuplicateDetector, MatchConfig, MatchError, MatchOutcome,
};

pub mod config;

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

/// Errors that can occur while driving a detection request end-to-end.
#[derive(Debug)]
pub enum PipelineError {
    /// The record store file could not be read.
    StoreRead(std::io::Error),
    /// The record store file was not a JSON array of records.
    StoreDecode(serde_json::Error),
    /// The external fingerprint producer failed and no fallback applied.
    Producer(ProducerError),
    /// The detection engine rejected the request.
    Match(MatchError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::StoreRead(err) => write!(f, "record store read failure: {err}"),
            PipelineError::StoreDecode(err) => write!(f, "record store decode failure: {err}"),
            PipelineError::Producer(err) => write!(f, "fingerprint producer failure: {err}"),
            PipelineError::Match(err) => write!(f, "detection failure: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::StoreRead(err) => Some(err),
            PipelineError::StoreDecode(err) => Some(err),
            PipelineError::Producer(err) => Some(err),
            PipelineError::Match(err) => Some(err),
        }
    }
}

impl From<MatchError> for PipelineError {
    fn from(value: MatchError) -> Self {
        PipelineError::Match(value)
    }
}

impl From<ProducerError> for PipelineError {
    fn from(value: ProducerError) -> Self {
        PipelineError::Producer(value)
    }
}

/// Failure modes of the external fingerprint producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    /// The producer could not hash this source. The calling workflow
    /// substitutes a deterministic metadata fallback fingerprint.
    Unavailable(String),
}

impl fmt::Display for ProducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProducerError::Unavailable(reason) => {
                write!(f, "fingerprint producer unavailable: {reason}")
            }
        }
    }
}

impl Error for ProducerError {}

/// Seam for the external perceptual-hash computation.
///
/// Implementations hash actual video content (frame sampling, DCT, whatever
/// the deployment uses) and return normalizable binary-digit material. The
/// engine wraps no timeout around this call; a slow producer is the caller's
/// concern to bound.
pub trait FingerprintProducer {
    fn fingerprint(&self, locator: &str) -> Result<String, ProducerError>;
}

/// Producer stub for deployments without content hashing: always reports
/// [`ProducerError::Unavailable`], which routes every query through the
/// deterministic metadata fallback.
pub struct UnavailableProducer;

impl FingerprintProducer for UnavailableProducer {
    fn fingerprint(&self, _locator: &str) -> Result<String, ProducerError> {
        Err(ProducerError::Unavailable(
            "no fingerprint producer configured".into(),
        ))
    }
}

static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"/video/(\d+)", r"video/(\d+)", r"/(\d{19})"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Recover the stable video identifier from a share URL.
///
/// Tries the `/video/<digits>` path form first, then the bare 19-digit path
/// segment short links use.
pub fn extract_video_id(url: &str) -> Option<String> {
    for pattern in VIDEO_ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(url) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

fn resolve_query_id(locator: &str) -> Option<String> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return None;
    }
    extract_video_id(trimmed).or_else(|| {
        // A bare numeric locator is already an identifier.
        trimmed
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| trimmed.to_string())
    })
}

/// Load the persisted record collection wholesale from a JSON file.
pub fn load_reference_records<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<RawReferenceRecord>, PipelineError> {
    let content = fs::read_to_string(path.as_ref()).map_err(PipelineError::StoreRead)?;
    let records: Vec<RawReferenceRecord> =
        serde_json::from_str(&content).map_err(PipelineError::StoreDecode)?;
    info!(
        records = records.len(),
        path = %path.as_ref().display(),
        "loaded reference record store"
    );
    Ok(records)
}

/// Build a reference index from raw store rows.
pub fn build_index(records: Vec<RawReferenceRecord>) -> Result<ReferenceIndex, IndexError> {
    ReferenceIndex::load(records)
}

/// Run one detection with fingerprint material already in hand.
///
/// `locator_or_id` feeds the exact-match shortcut (a share URL or a bare
/// identifier); `fingerprint` is the producer's output or any persisted raw
/// representation.
pub fn detect(
    index: Arc<ReferenceIndex>,
    locator_or_id: Option<&str>,
    fingerprint: RawFingerprint,
    config: MatchConfig,
) -> Result<MatchOutcome, PipelineError> {
    let detector = DuplicateDetector::with_index_arc(index);
    let req = DetectRequest {
        query_id: locator_or_id.and_then(resolve_query_id),
        fingerprint: Some(fingerprint),
        config,
    };
    Ok(detector.detect(&req)?)
}

/// Run one detection, acquiring the fingerprint from `producer` only when
/// the exact-match shortcut misses.
///
/// On [`ProducerError::Unavailable`] the deterministic metadata fallback is
/// substituted (derived from the extracted identifier, or the whole locator
/// when no identifier could be recovered), so repeated checks of the same
/// source keep landing on the same fingerprint.
pub fn detect_with_producer(
    index: Arc<ReferenceIndex>,
    locator: &str,
    producer: &dyn FingerprintProducer,
    config: MatchConfig,
) -> Result<MatchOutcome, PipelineError> {
    config.validate().map_err(PipelineError::Match)?;
    let detector = DuplicateDetector::with_index_arc(index);
    let query_id = resolve_query_id(locator);

    if let Some(id) = query_id.as_deref() {
        if let Some(outcome) = detector.detect_exact(id, config.threshold) {
            return Ok(outcome);
        }
    }

    let raw = match producer.fingerprint(locator) {
        Ok(bits) => {
            debug!(locator, "using producer fingerprint");
            RawFingerprint::Bits(bits)
        }
        Err(ProducerError::Unavailable(reason)) => {
            let stable = query_id.as_deref().unwrap_or(locator);
            warn!(
                locator,
                reason = %reason,
                "producer unavailable, substituting metadata fallback fingerprint"
            );
            RawFingerprint::Bits(fallback_for_id(stable).as_bits().to_string())
        }
    };

    let req = DetectRequest {
        // The shortcut already missed; don't rescan identifiers.
        query_id: None,
        fingerprint: Some(raw),
        config,
    };
    Ok(detector.detect(&req)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(value: serde_json::Value) -> RawReferenceRecord {
        serde_json::from_value(value).expect("record deserializes")
    }

    fn seeded_index(rows: Vec<serde_json::Value>) -> Arc<ReferenceIndex> {
        Arc::new(build_index(rows.into_iter().map(record).collect()).expect("index builds"))
    }

    #[test]
    fn extracts_id_from_share_url_forms() {
        assert_eq!(
            extract_video_id("https://www.tiktok.com/@user/video/7324491091954037038"),
            Some("7324491091954037038".to_string())
        );
        assert_eq!(
            extract_video_id("https://example.com/7324491091954037038?share=1"),
            Some("7324491091954037038".to_string())
        );
        assert_eq!(extract_video_id("https://example.com/about"), None);
    }

    #[test]
    fn bare_numeric_locator_is_an_identifier() {
        assert_eq!(
            resolve_query_id("7324491091954037038"),
            Some("7324491091954037038".to_string())
        );
        assert_eq!(resolve_query_id("not-a-url"), None);
        assert_eq!(resolve_query_id("   "), None);
    }

    #[test]
    fn store_roundtrip_through_a_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        let store = json!([
            { "aweme_id": "1", "hash": "0b101" },
            { "video_id": 2, "phash_bits": "1" },
        ]);
        file.write_all(store.to_string().as_bytes()).expect("write");

        let records = load_reference_records(file.path()).expect("store loads");
        assert_eq!(records.len(), 2);
        let index = build_index(records).expect("index builds");
        assert_eq!(index.items()[1].video_id, "2");
    }

    #[test]
    fn store_decode_failure_is_surfaced() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"{\"not\": \"an array\"}").expect("write");
        let err = load_reference_records(file.path()).expect_err("decode fails");
        assert!(matches!(err, PipelineError::StoreDecode(_)));
    }

    #[test]
    fn detect_runs_exact_shortcut_from_url() {
        let index = seeded_index(vec![json!({
            "video_id": "7324491091954037038",
            "phash_bits": "1".repeat(64),
        })]);
        let outcome = detect(
            index,
            Some("https://www.tiktok.com/@user/video/7324491091954037038"),
            RawFingerprint::Bits("0".repeat(64)),
            MatchConfig::default(),
        )
        .expect("detect succeeds");
        assert!(outcome.is_duplicate);
        assert_eq!(outcome.hamming_distance, 0);
    }

    struct FixedProducer(String);

    impl FingerprintProducer for FixedProducer {
        fn fingerprint(&self, _locator: &str) -> Result<String, ProducerError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn producer_fingerprint_feeds_the_engine() {
        let index = seeded_index(vec![json!({
            "video_id": "ref",
            "phash_bits": "0".repeat(64),
        })]);
        let producer = FixedProducer(format!("{}1", "0".repeat(63)));
        let outcome = detect_with_producer(
            index,
            "https://example.com/video/1",
            &producer,
            MatchConfig::default(),
        )
        .expect("detect succeeds");
        assert!(outcome.is_duplicate);
        assert_eq!(outcome.hamming_distance, 1);
    }

    #[test]
    fn unavailable_producer_falls_back_deterministically() {
        let index = seeded_index(vec![json!({
            "video_id": "ref",
            "phash_bits": "0".repeat(64),
        })]);
        let locator = "https://example.com/video/555";
        // Full scan so the verdict reflects the fallback bits, not bucketing.
        let cfg = MatchConfig {
            prefix_length: 0,
            ..MatchConfig::default()
        };

        let first = detect_with_producer(index.clone(), locator, &UnavailableProducer, cfg)
            .expect("detect succeeds");
        let second = detect_with_producer(index, locator, &UnavailableProducer, cfg)
            .expect("detect succeeds");

        // Same source, same fallback, same verdict on every run.
        assert_eq!(first, second);
        assert_eq!(
            first.hamming_distance,
            fallback_for_id("555").distance(&normalize_bits(&"0".repeat(64)).expect("bits"))
        );
    }
}
