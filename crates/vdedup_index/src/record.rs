//! Store-row and resolved reference item types.
//!
//! The persisted collection grew across several dataset generations, so the
//! same logical field shows up under different names and different JSON
//! types: ids as strings or numbers, hashes as bare bits, `0b`-decorated
//! strings or integers, prefixes as bits or integers. [`RawReferenceRecord`]
//! mirrors that mess verbatim; [`RawReferenceRecord::resolve`] interprets it
//! exactly once, at load time, into a typed [`ReferenceItem`] that the rest
//! of the engine can trust.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vdedup_fingerprint::{
    normalize, normalize_prefix, normalize_prefix_int, Fingerprint, PrefixKey, RawFingerprint,
};

/// Identifier field as persisted: string or number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawId {
    Int(u64),
    Text(String),
}

/// Cached prefix field as persisted: digit string or integer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawPrefix {
    Int(u64),
    Bits(String),
}

/// Timestamp field as persisted: unix seconds or RFC 3339 text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawTimestamp {
    Unix(i64),
    Text(String),
}

/// One row of the persisted reference collection, exactly as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawReferenceRecord {
    /// Stable source identifier.
    #[serde(alias = "aweme_id")]
    pub video_id: Option<RawId>,
    /// Recorded source URL, when the row kept one.
    #[serde(alias = "url")]
    pub video_url: Option<String>,
    /// Content hash as bare binary digits (enriched rows).
    pub phash_bits: Option<RawFingerprint>,
    /// Content hash in `0b`-decorated form (enriched rows).
    pub phash: Option<RawFingerprint>,
    /// Metadata-derived hash (older rows).
    pub hash: Option<RawFingerprint>,
    /// Cached prefix key, when precomputed at enrichment time.
    #[serde(alias = "prefix16")]
    pub hash_prefix16: Option<RawPrefix>,
    /// Publication timestamp.
    pub create_time: Option<RawTimestamp>,
    /// Region code the row was collected from.
    pub region: Option<String>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    /// Anything else the collector kept; passed through untouched.
    pub attributes: Option<serde_json::Value>,
}

/// A reference item after one-time resolution of its store row.
///
/// Items are immutable once indexed. An item may lack a usable fingerprint
/// (`fingerprint: None`); it then still participates in exact identifier/URL
/// matching but is invisible to the prefilter and skipped during ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceItem {
    pub video_id: String,
    pub video_url: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub prefix: Option<PrefixKey>,
    pub created_at: Option<DateTime<Utc>>,
    pub region: Option<String>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<serde_json::Value>,
}

impl RawReferenceRecord {
    /// Interpret the row into a typed item.
    ///
    /// Fingerprint resolution prefers the content hash over the metadata
    /// hash: `phash_bits`, then `phash`, then `hash`; the first field that
    /// normalizes wins. The prefix key prefers the cached field and falls
    /// back to derivation from the resolved fingerprint. A malformed field is
    /// a data-quality signal, not a load failure: it is logged and the next
    /// source in the chain is tried.
    pub fn resolve(self) -> ReferenceItem {
        let video_id = match self.video_id {
            Some(RawId::Int(value)) => value.to_string(),
            Some(RawId::Text(text)) => text.trim().to_string(),
            None => String::new(),
        };

        let fingerprint = resolve_fingerprint(
            &video_id,
            [
                ("phash_bits", self.phash_bits.as_ref()),
                ("phash", self.phash.as_ref()),
                ("hash", self.hash.as_ref()),
            ],
        );

        let prefix = self
            .hash_prefix16
            .as_ref()
            .and_then(|raw| resolve_cached_prefix(&video_id, raw))
            .or_else(|| fingerprint.as_ref().map(Fingerprint::prefix_key));

        ReferenceItem {
            video_id,
            video_url: self.video_url,
            fingerprint,
            prefix,
            created_at: self.create_time.as_ref().and_then(resolve_timestamp),
            region: self.region,
            views: self.views,
            likes: self.likes,
            comments: self.comments,
            attributes: self.attributes,
        }
    }
}

fn resolve_fingerprint(
    video_id: &str,
    sources: [(&'static str, Option<&RawFingerprint>); 3],
) -> Option<Fingerprint> {
    for (field, raw) in sources {
        let Some(raw) = raw else { continue };
        match normalize(raw) {
            Ok(fp) => return Some(fp),
            Err(err) => {
                debug!(video_id, field, %err, "unusable fingerprint field, trying next source");
            }
        }
    }
    None
}

fn resolve_cached_prefix(video_id: &str, raw: &RawPrefix) -> Option<PrefixKey> {
    match raw {
        RawPrefix::Int(value) => Some(normalize_prefix_int(*value)),
        RawPrefix::Bits(bits) => match normalize_prefix(bits) {
            Ok(key) => Some(key),
            Err(err) => {
                debug!(video_id, %err, "discarding malformed cached prefix");
                None
            }
        },
    }
}

fn resolve_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Unix(seconds) => DateTime::from_timestamp(*seconds, 0),
        RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}
