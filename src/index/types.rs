//! Core types for the inverted index

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense term identifier, assigned in first-seen order across the document stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TermId(pub u32);

impl TermId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "term_{}", self.0)
    }
}

/// Zero-based position of a document in the indexed collection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(n: u32) -> Self {
        Self(n)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One term's occurrence count in one document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Posting {
    pub term_id: TermId,
    pub doc_id: DocId,
    pub term_frequency: u32,
}

impl Posting {
    pub fn new(term_id: TermId, doc_id: DocId, term_frequency: u32) -> Self {
        Self {
            term_id,
            doc_id,
            term_frequency,
        }
    }
}

/// Encoded size of one posting: three 4-byte words
pub const POSTING_SIZE: usize = 12;
