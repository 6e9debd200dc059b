use std::fmt;
use std::path::Path;

use tracing::info;

use super::layout::PostingLayout;
use super::query::QueryEngine;
use super::store::PostingStore;
use super::types::{DocId, Posting, TermId};
use super::vocabulary::{build_vocabulary, Frequencies, Vocabulary};
use crate::config::IndexSettings;
use crate::tokenizer::Tokenizer;
use crate::Result;

/// A built or reopened inverted index: a posting store plus the tokenizer
/// it was built with.
#[derive(Debug)]
pub struct InvertedIndex {
    store: PostingStore,
    tokenizer: Tokenizer,
}

impl InvertedIndex {
    /// Index `documents` (doc id = position) into `path`
    pub fn build<P, I, S>(path: P, documents: I, settings: &IndexSettings) -> Result<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokenizer = Tokenizer::new(&settings.tokenizer);
        let output = build_vocabulary(documents, &tokenizer);
        let layout = PostingLayout::from_sorted(&output.postings);

        let store = PostingStore::build(
            path,
            &layout,
            output.vocabulary,
            output.frequencies,
            output.doc_count,
            settings,
        )?;
        info!(
            path = %store.path().display(),
            docs = output.doc_count,
            "inverted index built"
        );

        Ok(Self { store, tokenizer })
    }

    /// Reopen an index; fails with `NotFound` if the directory is absent or incomplete
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = PostingStore::open(path)?;
        let tokenizer = Tokenizer::new(&store.manifest().settings.tokenizer);
        Ok(Self { store, tokenizer })
    }

    /// Postings of `term` after normalizing it with the index tokenizer.
    ///
    /// Text that does not reduce to exactly one token has no postings.
    pub fn lookup(&self, term: &str) -> Result<Vec<Posting>> {
        match self.tokenizer.tokenize(term).as_slice() {
            [token] => self.store.lookup_by_text(token),
            _ => Ok(Vec::new()),
        }
    }

    pub fn lookup_id(&self, term_id: TermId) -> Result<Vec<Posting>> {
        self.store.lookup(term_id)
    }

    /// Per-token posting lists for a query, in query order
    pub fn postings_for_query(&self, query: &str) -> Result<Vec<Vec<Posting>>> {
        QueryEngine::new(&self.store, &self.tokenizer).postings_for_query(query)
    }

    /// Doc ids matching every term of `query`, ascending
    pub fn search(&self, query: &str) -> Result<Vec<DocId>> {
        QueryEngine::new(&self.store, &self.tokenizer).search(query)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.store.vocabulary()
    }

    pub fn frequencies(&self) -> &Frequencies {
        self.store.frequencies()
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn store(&self) -> &PostingStore {
        &self.store
    }

    pub fn doc_count(&self) -> u32 {
        self.store.manifest().doc_count
    }

    pub fn vocabulary_len(&self) -> usize {
        self.store.vocabulary().len()
    }
}

impl fmt::Display for InvertedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvertedIndex(n_vocab={}, n_docs={})",
            self.vocabulary_len(),
            self.doc_count()
        )
    }
}
