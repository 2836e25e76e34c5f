//! Fingerprint normalization and bit-level comparison.
//!
//! Everything downstream of this module assumes the [`Fingerprint`] invariant:
//! exactly [`FINGERPRINT_BITS`] binary digits, left-padded with zeros, no sign
//! and no `0b` marker. The only ways to obtain a `Fingerprint` are the
//! normalization functions here, [`Fingerprint::from_u64`], and the fallback
//! producer in [`crate::fallback`]; serde deserialization is routed through
//! [`normalize_bits`] so persisted values cannot bypass validation either.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Width of a canonical fingerprint, in binary digits.
pub const FINGERPRINT_BITS: usize = 64;

/// Width of a stored prefix key, in binary digits.
pub const PREFIX_BITS: usize = 16;

/// Errors produced while normalizing fingerprint material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// Input contained a character outside `{0, 1}` after prefix stripping.
    /// The codec never hex-decodes; decorated hex digests must be converted
    /// by their producer before they reach this layer.
    #[error("malformed fingerprint: {found:?} at digit {position} (expected '0' or '1')")]
    Malformed { position: usize, found: char },
    /// Input was empty after trimming and prefix stripping. An empty field in
    /// a store row means "no fingerprint recorded", not an all-zero hash.
    #[error("empty fingerprint input")]
    Empty,
}

/// A fingerprint as it appears in persisted records or producer output,
/// before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawFingerprint {
    /// Integer-valued hash field.
    Int(u64),
    /// Binary digit string, optionally `0b`-prefixed.
    Bits(String),
}

/// Canonical fixed-width fingerprint.
///
/// Holds exactly [`FINGERPRINT_BITS`] ASCII binary digits. Construct through
/// [`normalize`] / [`normalize_bits`] / [`Fingerprint::from_u64`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The canonical digit string.
    pub fn as_bits(&self) -> &str {
        &self.0
    }

    /// Build a fingerprint from a 64-bit word.
    pub fn from_u64(value: u64) -> Self {
        Fingerprint(format!("{value:064b}"))
    }

    /// First [`PREFIX_BITS`] digits, used as the coarse bucketing key.
    pub fn prefix_key(&self) -> PrefixKey {
        PrefixKey(self.0[..PREFIX_BITS].to_string())
    }

    /// Hamming distance to another canonical fingerprint.
    ///
    /// Both operands carry the fixed-width invariant, so this cannot fail;
    /// use [`hamming_distance`] for material of unverified length.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        self.0
            .bytes()
            .zip(other.0.bytes())
            .filter(|(a, b)| a != b)
            .count() as u32
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        normalize_bits(&raw).map_err(serde::de::Error::custom)
    }
}

/// Leading slice of a fingerprint used for candidate bucketing.
///
/// Keys derived from a fingerprint are exactly [`PREFIX_BITS`] digits long;
/// shorter keys only arise through [`PrefixKey::truncated`] when a caller
/// deliberately widens recall. A prefix key is a bucketing label, not a
/// distance-comparable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PrefixKey(String);

impl PrefixKey {
    /// The key digits.
    pub fn as_bits(&self) -> &str {
        &self.0
    }

    /// Number of digits in the key.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length key, which buckets everything.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shorten the key to at most `len` digits. Shorter keys match more
    /// buckets: recall goes up, and so does the candidate scan cost.
    pub fn truncated(&self, len: usize) -> PrefixKey {
        PrefixKey(self.0[..len.min(self.0.len())].to_string())
    }
}

impl fmt::Display for PrefixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PrefixKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        normalize_prefix(&raw).map_err(serde::de::Error::custom)
    }
}

/// Normalize any raw fingerprint representation into canonical form.
pub fn normalize(raw: &RawFingerprint) -> Result<Fingerprint, FingerprintError> {
    match raw {
        RawFingerprint::Int(value) => Ok(Fingerprint::from_u64(*value)),
        RawFingerprint::Bits(bits) => normalize_bits(bits),
    }
}

/// Normalize a binary digit string into canonical form.
///
/// Strips a leading `0b`, rejects anything outside `{0, 1}`, then left-pads
/// with zeros or keeps the leading [`FINGERPRINT_BITS`] digits. Padding and
/// truncation are the only coercions applied; bad digits are never guessed
/// past.
pub fn normalize_bits(raw: &str) -> Result<Fingerprint, FingerprintError> {
    let bits = strip_marker(raw);
    if bits.is_empty() {
        return Err(FingerprintError::Empty);
    }
    validate_digits(bits)?;
    Ok(Fingerprint(pad_or_truncate(bits, FINGERPRINT_BITS)))
}

/// Normalize a cached prefix field stored as a digit string.
pub fn normalize_prefix(raw: &str) -> Result<PrefixKey, FingerprintError> {
    let bits = strip_marker(raw);
    if bits.is_empty() {
        return Err(FingerprintError::Empty);
    }
    validate_digits(bits)?;
    Ok(PrefixKey(pad_or_truncate(bits, PREFIX_BITS)))
}

/// Normalize a cached prefix field stored as an integer.
///
/// Values wider than [`PREFIX_BITS`] keep their leading digits, matching the
/// string path.
pub fn normalize_prefix_int(value: u64) -> PrefixKey {
    PrefixKey(pad_or_truncate(&format!("{value:b}"), PREFIX_BITS))
}

/// Count differing positions between two equal-length digit strings.
///
/// Returns `None` when the operands differ in length. Canonical fingerprints
/// cannot hit that branch, but material that bypassed normalization can, and
/// a length mismatch must surface as "no measurement" rather than a number.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count() as u32)
}

fn strip_marker(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix("0b").unwrap_or(trimmed)
}

fn validate_digits(bits: &str) -> Result<(), FingerprintError> {
    for (position, found) in bits.char_indices() {
        if found != '0' && found != '1' {
            return Err(FingerprintError::Malformed { position, found });
        }
    }
    Ok(())
}

fn pad_or_truncate(bits: &str, width: usize) -> String {
    if bits.len() >= width {
        bits[..width].to_string()
    } else {
        let mut out = "0".repeat(width - bits.len());
        out.push_str(bits);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_pads_short_input_on_the_left() {
        let fp = normalize_bits("101").expect("valid bits");
        assert_eq!(fp.as_bits().len(), FINGERPRINT_BITS);
        assert!(fp.as_bits().starts_with(&"0".repeat(61)));
        assert!(fp.as_bits().ends_with("101"));
    }

    #[test]
    fn normalize_strips_marker_and_whitespace() {
        let decorated = format!("  0b{}  ", "1".repeat(64));
        let fp = normalize_bits(&decorated).expect("valid bits");
        assert_eq!(fp.as_bits(), "1".repeat(64));
    }

    #[test]
    fn normalize_keeps_leading_digits_of_overlong_input() {
        let long = format!("1{}", "0".repeat(70));
        let fp = normalize_bits(&long).expect("valid bits");
        assert_eq!(fp.as_bits(), &long[..64]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_bits("0b1101").expect("valid bits");
        let twice = normalize_bits(once.as_bits()).expect("canonical form re-normalizes");
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_rejects_non_binary_digits() {
        let err = normalize_bits("0b10a1").expect_err("bad digit");
        assert_eq!(
            err,
            FingerprintError::Malformed {
                position: 2,
                found: 'a'
            }
        );
    }

    #[test]
    fn normalize_rejects_empty_input() {
        assert_eq!(normalize_bits(""), Err(FingerprintError::Empty));
        assert_eq!(normalize_bits("0b"), Err(FingerprintError::Empty));
        assert_eq!(normalize_bits("   "), Err(FingerprintError::Empty));
    }

    #[test]
    fn normalize_accepts_integer_representation() {
        let fp = normalize(&RawFingerprint::Int(5)).expect("integer form");
        assert!(fp.as_bits().ends_with("101"));
        assert_eq!(fp, Fingerprint::from_u64(5));
    }

    #[test]
    fn prefix_key_is_the_leading_sixteen_digits() {
        let fp = normalize_bits(&format!("1010{}", "0".repeat(60))).expect("valid bits");
        let key = fp.prefix_key();
        assert_eq!(key.len(), PREFIX_BITS);
        assert_eq!(key.as_bits(), &fp.as_bits()[..PREFIX_BITS]);
    }

    #[test]
    fn prefix_key_truncation_shortens_only() {
        let key = normalize_prefix("1111000011110000").expect("valid prefix");
        assert_eq!(key.truncated(4).as_bits(), "1111");
        assert_eq!(key.truncated(99).as_bits(), key.as_bits());
        assert!(key.truncated(0).is_empty());
    }

    #[test]
    fn integer_prefix_keeps_leading_digits() {
        // 17 significant digits; the low-order digit falls off.
        let key = normalize_prefix_int(0b1_0000_0000_0000_0001);
        assert_eq!(key.as_bits(), "1000000000000000");
        assert_eq!(normalize_prefix_int(3).as_bits(), "0000000000000011");
    }

    #[test]
    fn hamming_distance_of_identical_inputs_is_zero() {
        let fp = Fingerprint::from_u64(0xDEAD_BEEF_DEAD_BEEF);
        assert_eq!(fp.distance(&fp), 0);
    }

    #[test]
    fn hamming_distance_is_symmetric() {
        let a = Fingerprint::from_u64(0b1010);
        let b = Fingerprint::from_u64(0b0110);
        assert_eq!(a.distance(&b), b.distance(&a));
        assert_eq!(a.distance(&b), 2);
    }

    #[test]
    fn hamming_distance_counts_exact_flips() {
        let a = Fingerprint::from_u64(0);
        for k in [1usize, 7, 32, 64] {
            let flipped: String = (0..64).map(|i| if i < k { '1' } else { '0' }).collect();
            let b = normalize_bits(&flipped).expect("valid bits");
            assert_eq!(a.distance(&b), k as u32);
        }
    }

    #[test]
    fn hamming_distance_refuses_length_mismatch() {
        assert_eq!(hamming_distance("101", "10"), None);
        assert_eq!(hamming_distance("101", "100"), Some(1));
    }

    #[test]
    fn fingerprint_serde_roundtrip_stays_canonical() {
        let fp = Fingerprint::from_u64(42);
        let json = serde_json::to_string(&fp).expect("serialize");
        let back: Fingerprint = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(fp, back);

        // Decorated persisted values normalize on the way in.
        let decorated: Fingerprint = serde_json::from_str("\"0b101010\"").expect("deserialize");
        assert_eq!(decorated, fp);
    }

    #[test]
    fn fingerprint_deserialize_rejects_garbage() {
        let result: Result<Fingerprint, _> = serde_json::from_str("\"0xFF\"");
        assert!(result.is_err());
    }
}
