//! Boolean AND query evaluation over sorted doc id lists

use std::collections::HashSet;

use super::store::PostingStore;
use super::types::{DocId, Posting};
use crate::tokenizer::Tokenizer;
use crate::Result;

/// Merge-intersect two ascending lists
pub fn intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            result.push(a[i]);
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}

/// Intersect any number of ascending lists, shortest first
///
/// No lists yields an empty result; any empty list collapses the result.
pub fn intersect_many(mut lists: Vec<Vec<DocId>>) -> Vec<DocId> {
    if lists.is_empty() {
        return Vec::new();
    }
    lists.sort_by_key(Vec::len);

    let mut iter = lists.into_iter();
    let mut result = iter.next().unwrap_or_default();
    for list in iter {
        if result.is_empty() {
            break;
        }
        result = intersect(&result, &list);
    }
    result
}

/// Merge two ascending lists into their ascending, de-duplicated union
pub fn union(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut result = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            result.push(a[i]);
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            result.push(a[i]);
            i += 1;
        } else {
            result.push(b[j]);
            j += 1;
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);
    result.dedup();
    result
}

/// Project a posting list to its doc id column
pub fn doc_ids(postings: &[Posting]) -> Vec<DocId> {
    postings.iter().map(|p| p.doc_id).collect()
}

/// Evaluates queries against one posting store
pub struct QueryEngine<'a> {
    store: &'a PostingStore,
    tokenizer: &'a Tokenizer,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a PostingStore, tokenizer: &'a Tokenizer) -> Self {
        Self { store, tokenizer }
    }

    /// Posting list for every query token, in query order
    pub fn postings_for_query(&self, query: &str) -> Result<Vec<Vec<Posting>>> {
        self.tokenizer
            .tokenize(query)
            .iter()
            .map(|term| self.store.lookup_by_text(term))
            .collect()
    }

    /// Doc ids containing every query term, ascending
    pub fn search(&self, query: &str) -> Result<Vec<DocId>> {
        let mut seen = HashSet::new();
        let mut lists = Vec::new();

        for term in self.tokenizer.tokenize(query) {
            if !seen.insert(term.clone()) {
                continue;
            }
            let Some(term_id) = self.store.vocabulary().get(&term) else {
                return Ok(Vec::new());
            };
            let postings = self.store.lookup(term_id)?;
            if postings.is_empty() {
                return Ok(Vec::new());
            }
            lists.push(doc_ids(&postings));
        }

        Ok(intersect_many(lists))
    }
}
