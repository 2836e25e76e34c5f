//! Lookup methods over the reference index.

use vdedup_fingerprint::PrefixKey;

use crate::{ReferenceIndex, ReferenceItem};

impl ReferenceIndex {
    /// Find an item by exact identifier or by URL containment.
    ///
    /// The dual mode is intentional: some rows only carry their source id
    /// embedded in the recorded URL, so a bare identifier must also match a
    /// URL that contains it. Linear scan in insertion order; ties resolve to
    /// the earliest-loaded item.
    pub fn find_exact(&self, identifier: &str) -> Option<&ReferenceItem> {
        let needle = identifier.trim();
        if needle.is_empty() {
            return None;
        }
        self.items().iter().find(|item| {
            (!item.video_id.is_empty() && item.video_id == needle)
                || item
                    .video_url
                    .as_deref()
                    .is_some_and(|url| url.contains(needle))
        })
    }

    /// Every item whose prefix key starts with `key`, in index order.
    ///
    /// This is a prefix match, not equality: callers may pass a key shorter
    /// than the stored width to widen the bucket. An empty key matches the
    /// whole collection (the full-scan degradation); items without a prefix
    /// key never match a non-empty one.
    pub fn candidates_by_prefix(&self, key: &PrefixKey) -> Vec<&ReferenceItem> {
        if key.is_empty() {
            return self.items().iter().collect();
        }
        self.items()
            .iter()
            .filter(|item| {
                item.prefix
                    .as_ref()
                    .is_some_and(|p| p.as_bits().starts_with(key.as_bits()))
            })
            .collect()
    }
}
