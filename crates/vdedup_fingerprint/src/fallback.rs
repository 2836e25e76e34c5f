//! Deterministic metadata fallback fingerprints.
//!
//! When the perceptual producer cannot hash the actual content, the calling
//! workflow substitutes a fingerprint derived from stable descriptive fields.
//! The inputs must never include run-varying data (timestamps of the check,
//! counters that move between runs): repeated calls for the same source have
//! to yield the same fingerprint, otherwise the same video would land in a
//! different bucket on every lookup.

use sha2::{Digest, Sha256};

use crate::codec::Fingerprint;

/// Derive a fingerprint from stable descriptive fields.
///
/// The fields are joined with `|`, digested with SHA-256, and the leading
/// 64 bits of the digest become the fingerprint.
pub fn fallback_fingerprint(stable_parts: &[&str]) -> Fingerprint {
    let joined = stable_parts.join("|");
    let digest = Sha256::digest(joined.as_bytes());
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    Fingerprint::from_u64(u64::from_be_bytes(word))
}

/// Fallback for the common case of a single stable identifier.
pub fn fallback_for_id(id: &str) -> Fingerprint {
    fallback_fingerprint(&[id])
}
