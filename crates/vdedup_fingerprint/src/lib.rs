//! vdedup_fingerprint: canonical fingerprint codec for video dedup.
//!
//! Reference stores accumulate perceptual hashes in several shapes: bare
//! binary digit strings, `0b`-decorated strings, and raw integers. This crate
//! collapses all of them into one canonical [`Fingerprint`] value type so the
//! rest of the pipeline never touches an undecoded representation. It also
//! owns the prefix-key derivation used for coarse candidate bucketing and the
//! deterministic metadata fallback hash used when no content hash can be
//! produced for a source.

mod codec;
mod fallback;

pub use codec::{
    hamming_distance, normalize, normalize_bits, normalize_prefix, normalize_prefix_int,
    Fingerprint, FingerprintError, PrefixKey, RawFingerprint, FINGERPRINT_BITS, PREFIX_BITS,
};
pub use fallback::{fallback_fingerprint, fallback_for_id};
