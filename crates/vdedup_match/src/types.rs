use serde::{Deserialize, Serialize};
use thiserror::Error;
use vdedup_fingerprint::{FingerprintError, RawFingerprint, FINGERPRINT_BITS, PREFIX_BITS};
use vdedup_index::{IndexError, ReferenceItem};

/// Configuration for a single detection request.
///
/// Cheap to clone and serde-friendly so it can be embedded in higher-level
/// configs or passed across process boundaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    /// Maximum Hamming distance still classified as a duplicate. Always
    /// caller-supplied; the engine never infers a threshold from data. The
    /// serde default of 12 exists for config files, not as engine policy.
    #[serde(default = "MatchConfig::default_threshold")]
    pub threshold: u32,
    /// Number of leading fingerprint digits used to prefilter candidates.
    ///
    /// Shorter prefixes raise recall and scan cost; `0` disables the
    /// prefilter and ranks the whole collection. The prefilter can miss a
    /// true near-duplicate whose differing bits fall inside the shared
    /// prefix; that trade-off is inherent, not a defect to tune away here.
    #[serde(default = "MatchConfig::default_prefix_length")]
    pub prefix_length: usize,
}

impl MatchConfig {
    pub(crate) fn default_threshold() -> u32 {
        12
    }

    pub(crate) fn default_prefix_length() -> usize {
        PREFIX_BITS
    }

    /// Validate the configuration for a single request.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.threshold as usize > FINGERPRINT_BITS {
            return Err(MatchError::InvalidConfig(format!(
                "threshold must be <= {FINGERPRINT_BITS}"
            )));
        }
        if self.prefix_length > PREFIX_BITS {
            return Err(MatchError::InvalidConfig(format!(
                "prefix_length must be <= {PREFIX_BITS}"
            )));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            prefix_length: Self::default_prefix_length(),
        }
    }
}

/// A single detection request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectRequest {
    /// External identifier of the query source, when one could be recovered.
    /// Drives the exact-match shortcut; fingerprint comparison only runs
    /// when this misses.
    #[serde(default)]
    pub query_id: Option<String>,
    /// Fingerprint material for the query, as produced upstream. May be
    /// omitted for identifier-only probes; detection then fails with
    /// [`MatchError::MissingFingerprint`] if the shortcut misses.
    #[serde(default)]
    pub fingerprint: Option<RawFingerprint>,
    /// Per-request knobs.
    #[serde(default)]
    pub config: MatchConfig,
}

/// Outcome of one detection request. Immutable after construction and never
/// persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchOutcome {
    pub is_duplicate: bool,
    /// Minimum Hamming distance observed, 0–64. When no candidate could be
    /// compared this is 64: a "no information" sentinel, not a measurement.
    pub hamming_distance: u32,
    /// `64 - hamming_distance`, floored at 0.
    pub similarity: u32,
    /// The closest reference item, when any candidate was compared.
    pub closest_match: Option<ReferenceItem>,
    /// Threshold the verdict was computed against.
    pub threshold: u32,
    /// Number of candidates actually compared bit-by-bit.
    pub total_candidates: usize,
}

impl MatchOutcome {
    /// Outcome for an exact identifier/URL hit: a perfect match that
    /// bypasses fingerprint comparison entirely.
    pub fn exact(item: ReferenceItem, threshold: u32) -> Self {
        Self {
            is_duplicate: true,
            hamming_distance: 0,
            similarity: FINGERPRINT_BITS as u32,
            closest_match: Some(item),
            threshold,
            total_candidates: 1,
        }
    }
}

/// Errors produced by the detection engine.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Invalid per-request configuration.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The exact shortcut missed and the request carried no fingerprint.
    #[error("no fingerprint supplied and exact match missed")]
    MissingFingerprint,
    /// Query fingerprint material failed normalization.
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
    /// Index construction failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = MatchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.threshold, 12);
        assert_eq!(cfg.prefix_length, PREFIX_BITS);
    }

    #[test]
    fn oversized_threshold_rejected() {
        let cfg = MatchConfig {
            threshold: 65,
            ..MatchConfig::default()
        };
        let err = cfg.validate().expect_err("config should be invalid");
        match err {
            MatchError::InvalidConfig(msg) => assert!(msg.contains("threshold")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn oversized_prefix_length_rejected() {
        let cfg = MatchConfig {
            prefix_length: 17,
            ..MatchConfig::default()
        };
        let err = cfg.validate().expect_err("config should be invalid");
        match err {
            MatchError::InvalidConfig(msg) => assert!(msg.contains("prefix_length")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_prefix_length_is_a_legal_degradation() {
        let cfg = MatchConfig {
            prefix_length: 0,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
