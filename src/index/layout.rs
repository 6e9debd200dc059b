//! Postings layout: group sorted postings into per-term lists

use std::collections::BTreeMap;

use super::types::{Posting, TermId};

/// Postings grouped by term, plus the ascending list of terms present
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostingLayout {
    groups: BTreeMap<TermId, Vec<Posting>>,
}

impl PostingLayout {
    /// Group postings by term id without reordering within a group
    pub fn from_sorted(postings: &[Posting]) -> Self {
        let mut groups: BTreeMap<TermId, Vec<Posting>> = BTreeMap::new();
        for posting in postings {
            groups.entry(posting.term_id).or_default().push(*posting);
        }
        Self { groups }
    }

    /// Distinct term ids, ascending
    pub fn term_ids(&self) -> Vec<TermId> {
        self.groups.keys().copied().collect()
    }

    pub fn get(&self, term_id: TermId) -> Option<&[Posting]> {
        self.groups.get(&term_id).map(Vec::as_slice)
    }

    /// Drop a term's list; the resulting directory has a gap in term ids
    pub fn remove(&mut self, term_id: TermId) -> Option<Vec<Posting>> {
        self.groups.remove(&term_id)
    }

    /// Iterate groups in ascending term order
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &[Posting])> {
        self.groups.iter().map(|(id, list)| (*id, list.as_slice()))
    }

    pub fn term_count(&self) -> usize {
        self.groups.len()
    }

    pub fn posting_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::DocId;

    fn p(t: u32, d: u32, f: u32) -> Posting {
        Posting::new(TermId(t), DocId(d), f)
    }

    #[test]
    fn test_group_sorted_postings() {
        let layout = PostingLayout::from_sorted(&[p(0, 0, 1), p(0, 1, 2), p(1, 1, 3)]);
        assert_eq!(layout.term_ids(), vec![TermId(0), TermId(1)]);
        assert_eq!(layout.get(TermId(0)).unwrap(), &[p(0, 0, 1), p(0, 1, 2)]);
        assert_eq!(layout.get(TermId(1)).unwrap(), &[p(1, 1, 3)]);
        assert_eq!(layout.posting_count(), 3);
    }

    #[test]
    fn test_grouping_keeps_input_order_within_term() {
        let layout = PostingLayout::from_sorted(&[p(0, 0, 1), p(1, 0, 2), p(0, 1, 3)]);
        assert_eq!(layout.get(TermId(0)).unwrap(), &[p(0, 0, 1), p(0, 1, 3)]);
        assert_eq!(layout.get(TermId(1)).unwrap(), &[p(1, 0, 2)]);
    }

    #[test]
    fn test_remove_leaves_gap() {
        let mut layout = PostingLayout::from_sorted(&[p(0, 0, 1), p(1, 0, 1), p(2, 0, 1)]);
        layout.remove(TermId(1));
        assert_eq!(layout.term_ids(), vec![TermId(0), TermId(2)]);
        assert_eq!(layout.term_count(), 2);
    }
}
