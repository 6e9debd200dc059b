//! Fixed-width posting records
//!
//! Each posting is three little-endian 32-bit words:
//! term id, doc id, term frequency. Lists are concatenated with no delimiters.

use super::types::{DocId, Posting, TermId, POSTING_SIZE};
use crate::error::LsearchError;
use crate::Result;

/// Append one encoded posting to `output`
pub fn encode_posting(posting: &Posting, output: &mut Vec<u8>) {
    output.extend_from_slice(&posting.term_id.0.to_le_bytes());
    output.extend_from_slice(&posting.doc_id.0.to_le_bytes());
    output.extend_from_slice(&posting.term_frequency.to_le_bytes());
}

/// Encode a whole posting list
pub fn encode_postings(postings: &[Posting]) -> Vec<u8> {
    let mut output = Vec::with_capacity(postings.len() * POSTING_SIZE);
    for posting in postings {
        encode_posting(posting, &mut output);
    }
    output
}

fn read_word(record: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&record[at..at + 4]);
    u32::from_le_bytes(bytes)
}

/// Decode a span holding a whole number of postings
pub fn decode_postings(span: &[u8]) -> Result<Vec<Posting>> {
    if span.len() % POSTING_SIZE != 0 {
        return Err(LsearchError::Corrupt(format!(
            "posting span of {} bytes is not a multiple of {}",
            span.len(),
            POSTING_SIZE
        )));
    }

    Ok(span
        .chunks_exact(POSTING_SIZE)
        .map(|record| {
            Posting::new(
                TermId(read_word(record, 0)),
                DocId(read_word(record, 4)),
                read_word(record, 8),
            )
        })
        .collect())
}
