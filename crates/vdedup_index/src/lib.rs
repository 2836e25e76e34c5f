//! vdedup_index: the reference collection of previously seen videos.
//!
//! The index owns its items and is read-only after [`ReferenceIndex::load`];
//! any number of detection requests may share it concurrently. Live updates
//! to the reference collection are expressed as build-new-and-swap (load a
//! fresh index, replace the shared handle), never as in-place edits visible
//! to an in-flight scan.

mod query;
mod record;

pub use record::{RawId, RawPrefix, RawReferenceRecord, RawTimestamp, ReferenceItem};

use thiserror::Error;
use tracing::debug;

/// Errors surfaced while building an index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The record collection held zero rows. Surfaced rather than silently
    /// producing an index that classifies everything as novel; the caller
    /// decides whether to abort or proceed with an empty reference set.
    #[error("reference collection is empty")]
    EmptyIndex,
}

/// In-memory index over the reference collection, in insertion order.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    items: Vec<ReferenceItem>,
}

impl ReferenceIndex {
    /// Resolve every store row once and build the index.
    ///
    /// Rows with unusable fingerprint material are kept (they remain
    /// exact-matchable) and counted as a data-quality signal.
    pub fn load(records: Vec<RawReferenceRecord>) -> Result<Self, IndexError> {
        if records.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        let items: Vec<ReferenceItem> = records
            .into_iter()
            .map(RawReferenceRecord::resolve)
            .collect();
        let without_fingerprint = items.iter().filter(|i| i.fingerprint.is_none()).count();
        if without_fingerprint > 0 {
            debug!(
                without_fingerprint,
                total = items.len(),
                "indexed rows without a usable fingerprint; exact matching only for those"
            );
        }
        Ok(Self { items })
    }

    /// Build an index from already-resolved items. Used by callers that
    /// assemble items programmatically rather than from a store.
    pub fn from_items(items: Vec<ReferenceItem>) -> Result<Self, IndexError> {
        if items.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        Ok(Self { items })
    }

    /// An index over zero items, for callers that caught
    /// [`IndexError::EmptyIndex`] and chose to proceed anyway. Every
    /// detection against it reports "no candidates".
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// All items, in insertion order.
    pub fn items(&self) -> &[ReferenceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
