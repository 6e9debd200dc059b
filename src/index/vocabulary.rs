//! Vocabulary and frequency builder
//!
//! Walks the documents in order, assigns dense term ids on first sight and
//! emits one posting per distinct term per document. Postings come out
//! stable-sorted by term id, so each term's run is already doc-id ascending.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::types::{DocId, Posting, TermId};
use crate::tokenizer::Tokenizer;

/// Term to id map
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: HashMap<String, TermId>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `term`, assigning the next dense id if the term is new
    pub fn get_or_insert(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.terms.get(term) {
            return id;
        }
        let id = TermId(self.terms.len() as u32);
        self.terms.insert(term.to_string(), id);
        id
    }

    pub fn get(&self, term: &str) -> Option<TermId> {
        self.terms.get(term).copied()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TermId)> {
        self.terms.iter()
    }
}

/// Per-term document and collection frequencies, keyed by term id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frequencies {
    /// Number of distinct documents containing the term
    pub doc_freq: BTreeMap<TermId, u32>,
    /// Total occurrences of the term across the collection
    pub word_freq: BTreeMap<TermId, u64>,
}

impl Frequencies {
    pub fn doc_frequency(&self, term_id: TermId) -> u32 {
        self.doc_freq.get(&term_id).copied().unwrap_or(0)
    }

    pub fn word_frequency(&self, term_id: TermId) -> u64 {
        self.word_freq.get(&term_id).copied().unwrap_or(0)
    }
}

/// Everything the builder produces from one pass over the documents
#[derive(Clone, Debug, Default)]
pub struct VocabularyOutput {
    pub vocabulary: Vocabulary,
    pub frequencies: Frequencies,
    /// Postings sorted by term id, doc id ascending within a term
    pub postings: Vec<Posting>,
    pub doc_count: u32,
}

/// Builds the vocabulary, postings and frequency tables for a collection
pub struct VocabularyBuilder<'a> {
    tokenizer: &'a Tokenizer,
    output: VocabularyOutput,
}

impl<'a> VocabularyBuilder<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self {
            tokenizer,
            output: VocabularyOutput::default(),
        }
    }

    /// Add the next document; its doc id is its position in the stream
    pub fn add_document(&mut self, text: &str) -> DocId {
        let doc_id = DocId(self.output.doc_count);
        self.output.doc_count += 1;

        for (term, count) in self.tokenizer.counted_terms(text) {
            let term_id = self.output.vocabulary.get_or_insert(&term);
            *self.output.frequencies.doc_freq.entry(term_id).or_insert(0) += 1;
            *self.output.frequencies.word_freq.entry(term_id).or_insert(0) += count as u64;
            self.output
                .postings
                .push(Posting::new(term_id, doc_id, count));
        }

        doc_id
    }

    pub fn finish(mut self) -> VocabularyOutput {
        // Stable: equal term ids keep document visitation order.
        self.output.postings.sort_by_key(|p| p.term_id);
        self.output
    }
}

/// Run the builder over an ordered document sequence
pub fn build_vocabulary<I, S>(documents: I, tokenizer: &Tokenizer) -> VocabularyOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = VocabularyBuilder::new(tokenizer);
    for doc in documents {
        builder.add_document(doc.as_ref());
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_term_ids() {
        let tokenizer = Tokenizer::default();
        let out = build_vocabulary(["the cat", "the dog"], &tokenizer);

        assert_eq!(out.vocabulary.get("the"), Some(TermId(0)));
        assert_eq!(out.vocabulary.get("cat"), Some(TermId(1)));
        assert_eq!(out.vocabulary.get("dog"), Some(TermId(2)));
        assert_eq!(out.vocabulary.len(), 3);
        assert_eq!(out.doc_count, 2);
    }

    #[test]
    fn test_postings_and_frequencies() {
        let tokenizer = Tokenizer::default();
        let out = build_vocabulary(["the cat sat", "the dog barked the end"], &tokenizer);
        let the = out.vocabulary.get("the").unwrap();
        let cat = out.vocabulary.get("cat").unwrap();

        assert!(out.postings.contains(&Posting::new(the, DocId(0), 1)));
        assert!(out.postings.contains(&Posting::new(the, DocId(1), 2)));
        assert_eq!(out.frequencies.doc_frequency(the), 2);
        assert_eq!(out.frequencies.word_frequency(the), 3);
        assert_eq!(out.frequencies.word_frequency(cat), 1);
    }

    #[test]
    fn test_postings_sorted_by_term_then_doc() {
        let tokenizer = Tokenizer::default();
        let out = build_vocabulary(["b a", "a c", "c b a"], &tokenizer);

        for pair in out.postings.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            assert!(prev.term_id <= next.term_id);
            if prev.term_id == next.term_id {
                assert!(prev.doc_id < next.doc_id);
            }
        }
        assert_eq!(out.postings.len(), 7);
    }

    #[test]
    fn test_empty_collection() {
        let tokenizer = Tokenizer::default();
        let out = build_vocabulary(Vec::<String>::new(), &tokenizer);
        assert!(out.vocabulary.is_empty());
        assert!(out.postings.is_empty());
        assert_eq!(out.doc_count, 0);
    }

    #[test]
    fn test_empty_document_still_takes_a_doc_id() {
        let tokenizer = Tokenizer::default();
        let out = build_vocabulary(["", "word"], &tokenizer);
        assert_eq!(out.doc_count, 2);
        assert_eq!(out.postings, vec![Posting::new(TermId(0), DocId(1), 1)]);
    }
}
