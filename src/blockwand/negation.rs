//! Negated-term filtering: does a candidate document appear in any of the
//! query's negated postings lists?

use crate::wrapper::{ListSet, ListWrapper};

/// Tests whether `candidate` appears in any negated list, mutating negated
/// cursors via `skip_to_id` as it goes.
///
/// Re-sorts `negated` by current docid first (cheap: negated lists are
/// usually few), then walks left to right while `docid() <= candidate`,
/// skipping each to `candidate` in turn. A negated list whose cursor lands
/// exactly on `candidate` proves the document is excluded; the walk stops at
/// the first list whose (pre-skip) docid already exceeds `candidate`, since
/// the sort guarantees nothing further left could reach it either.
pub fn is_negated(negated: &mut ListSet, arena: &mut [ListWrapper<'_>], candidate: u64) -> bool {
    negated.resort(arena);
    let mut i = 0;
    while i < negated.len() && negated.docid_at(i, arena) <= candidate {
        let idx = negated.arena_index(i);
        arena[idx].skip_to_id(candidate);
        if !arena[idx].is_end() && arena[idx].docid() == candidate {
            return true;
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postings::PostingsList;

    fn list(docids: &[u64]) -> PostingsList {
        let postings: Vec<(u64, u32)> = docids.iter().map(|&d| (d, 1)).collect();
        PostingsList::build(&postings, 1.0, |_, _| 1.0)
    }

    #[test]
    fn finds_a_candidate_present_in_a_negated_list() {
        let a = list(&[1, 5, 9]);
        let b = list(&[2, 4, 7]);
        let mut arena = vec![ListWrapper::new(&a), ListWrapper::new(&b)];
        let mut set = ListSet::new(&arena);
        assert!(is_negated(&mut set, &mut arena, 5));
        assert!(!is_negated(&mut set, &mut arena, 6));
    }

    #[test]
    fn returns_false_when_no_negated_list_reaches_the_candidate() {
        let a = list(&[100, 200]);
        let mut arena = vec![ListWrapper::new(&a)];
        let mut set = ListSet::new(&arena);
        assert!(!is_negated(&mut set, &mut arena, 3));
    }

    #[test]
    fn handles_an_empty_negated_set() {
        let mut arena: Vec<ListWrapper<'_>> = vec![];
        let mut set = ListSet::new(&arena);
        assert!(!is_negated(&mut set, &mut arena, 42));
    }
}
