//! Term offset directory
//!
//! Maps each present term id to the byte offset where its posting list
//! starts. A list ends where the next *present* term starts, or at end of
//! file for the last term. Term ids may be non-contiguous.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::TermId;

/// Directory entry: term id and start offset in the postings blob
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub term_id: TermId,
    pub offset: u64,
}

/// Sorted term directory with O(1) lookup of a term's slot
#[derive(Clone, Debug, Default)]
pub struct TermDirectory {
    /// Entries in ascending term id order
    entries: Vec<DirectoryEntry>,
    /// term id -> index into `entries`
    slots: HashMap<TermId, usize>,
}

impl PartialEq for TermDirectory {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl TermDirectory {
    /// Build a directory from entries in any order
    pub fn from_entries(mut entries: Vec<DirectoryEntry>) -> Self {
        entries.sort_by_key(|e| e.term_id);
        entries.dedup_by_key(|e| e.term_id);
        let slots = entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| (entry.term_id, slot))
            .collect();
        Self { entries, slots }
    }

    pub fn get(&self, term_id: TermId) -> Option<u64> {
        self.slots.get(&term_id).map(|&slot| self.entries[slot].offset)
    }

    pub fn contains(&self, term_id: TermId) -> bool {
        self.slots.contains_key(&term_id)
    }

    /// Byte span `[start, end)` of a term's list in a blob of `blob_len` bytes
    pub fn span(&self, term_id: TermId, blob_len: u64) -> Option<(u64, u64)> {
        let slot = *self.slots.get(&term_id)?;
        let start = self.entries[slot].offset;
        let end = self
            .entries
            .get(slot + 1)
            .map(|next| next.offset)
            .unwrap_or(blob_len);
        Some((start, end))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Serialize to bincode
    pub fn to_bincode(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(&self.entries)
    }

    /// Deserialize from bincode, rebuilding the slot map
    pub fn from_bincode(data: &[u8]) -> bincode::Result<Self> {
        let entries: Vec<DirectoryEntry> = bincode::deserialize(data)?;
        Ok(Self::from_entries(entries))
    }
}
