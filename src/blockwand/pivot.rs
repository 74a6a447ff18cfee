//! Pivot selection, forwarding, the block-max candidate test, and pivot
//! evaluation: the core of every dynamic-pruning main loop in
//! [`crate::processor`].

use crate::heap::MinHeap;
use crate::scorer::Scorer;
use crate::wrapper::{ListSet, ListWrapper};

/// Sum of every list's upper bound, computed once per query for conjunctive
/// pivot selection (only documents present in every list can survive, so the
/// "pivot" is always the whole set, at the largest current docid).
pub fn conjunctive_max(arena: &[ListWrapper<'_>]) -> f32 {
    arena.iter().map(|w| w.list_max_score()).sum()
}

/// Disjunctive pivot selection: scans the list set left to right
/// accumulating list upper bounds until the running sum exceeds `theta * f`,
/// then extends the pivot forward through any immediately following lists
/// sharing the same docid. Returns `None` (no pivot -- the query can
/// terminate) if no prefix ever exceeds the threshold.
pub fn select_pivot_disjunctive(
    set: &ListSet,
    arena: &[ListWrapper<'_>],
    theta: f32,
    f: f32,
) -> (Option<usize>, f32) {
    let theta_prime = theta * f;
    let mut sum = 0.0f32;
    let mut frontier = None;
    for i in 0..set.len() {
        sum += arena[set.arena_index(i)].list_max_score();
        if sum > theta_prime {
            frontier = Some(i);
            break;
        }
    }
    let Some(mut pivot) = frontier else {
        return (None, sum);
    };
    let pivot_docid = set.docid_at(pivot, arena);
    while pivot + 1 < set.len() && set.docid_at(pivot + 1, arena) == pivot_docid {
        pivot += 1;
        sum += arena[set.arena_index(pivot)].list_max_score();
    }
    (Some(pivot), sum)
}

/// Conjunctive pivot selection: always the last (largest-docid) list, paired
/// with the pre-computed [`conjunctive_max`]. `None` only when the set is
/// empty.
pub fn select_pivot_conjunctive(set: &ListSet, conjunctive_max: f32) -> (Option<usize>, f32) {
    if set.is_empty() {
        (None, conjunctive_max)
    } else {
        (Some(set.len() - 1), conjunctive_max)
    }
}

/// WAND forwarding: advances the shortest list before `pivot_pos` (positions
/// `[0, pivot_pos)`) whose docid isn't already `target`, to `target`, then
/// restores set ordering around the one entry that moved.
pub fn forward_wand(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    pivot_pos: usize,
    target: u64,
) {
    let Some(idx) = set.shortest_excluding(pivot_pos, target, arena) else {
        return;
    };
    arena[idx].skip_to_id(target);
    if arena[idx].is_end() {
        set.resort(arena);
    } else {
        set.bubble_right(idx, arena);
    }
}

/// BMW shallow forwarding: used when the block-max candidate test rejects
/// the current pivot. Picks a skip target past the current unfruitful block
/// configuration -- the smallest "one past the last docid of the block
/// containing `docid`" across lists `[0, pivot_pos]`, plus the next list's
/// docid if one follows the pivot -- and advances the shortest list among
/// `[0, pivot_pos]` to it.
pub fn forward_bmw(set: &mut ListSet, arena: &mut [ListWrapper<'_>], pivot_pos: usize, docid: u64) {
    let mut candidate = u64::MAX;
    for i in 0..=pivot_pos {
        let idx = set.arena_index(i);
        let bid = arena[idx].block_containing_id(docid);
        candidate = candidate.min(arena[idx].block_rep(bid) + 1);
    }
    if pivot_pos + 1 < set.len() {
        candidate = candidate.min(set.docid_at(pivot_pos + 1, arena));
    }
    if candidate < docid {
        candidate = docid + 1;
    }
    let Some(idx) = set.shortest_excluding(pivot_pos + 1, docid, arena) else {
        return;
    };
    arena[idx].skip_to_id(candidate);
    if arena[idx].is_end() {
        set.resort(arena);
    } else {
        set.bubble_right(idx, arena);
    }
}

/// Block-max candidate test: the pivot list's current block-max plus, for
/// each list before the pivot, the block-max of the block containing `d`.
/// Viable (the `bool`) if the sum exceeds `theta`; the sum is returned
/// either way as the refined upper-bound estimate.
pub fn block_max_test(
    set: &ListSet,
    arena: &[ListWrapper<'_>],
    pivot_pos: usize,
    theta: f32,
    d: u64,
) -> (bool, f32) {
    let pivot_idx = set.arena_index(pivot_pos);
    let pivot_block = arena[pivot_idx].block_containing_id(d);
    let mut sum = arena[pivot_idx].block_max(pivot_block);
    for i in 0..pivot_pos {
        let idx = set.arena_index(i);
        let bid = arena[idx].block_containing_id(d);
        sum += arena[idx].block_max(bid);
    }
    (sum > theta, sum)
}

/// Outcome of scoring one pivot document: the refreshed threshold (the
/// caller's new θ for the next iteration) plus the bits [`crate::processor`]
/// folds into its per-query [`crate::processor::Profile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotEvaluation {
    /// `heap.top().score` if the heap is full after this document, else 0.0
    /// (the new threshold for the next pivot-selection call).
    pub threshold: f32,
    /// Number of postings actually summed into this document's score (the
    /// aligned lists walked before either running out or short-circuiting on
    /// `potential_score < theta`).
    pub postings_evaluated: usize,
    /// Whether this document was accepted into the heap (pushed, or beat the
    /// current minimum).
    pub added_to_heap: bool,
}

/// Shared pivot-evaluation walk for the WAND and BMW flavors, differing only
/// in how each aligned list's contribution to `potential_score` is unwound
/// once it has been counted exactly (list-level upper bound for WAND,
/// current block-max for BMW).
fn evaluate_pivot_impl(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    mut potential_score: f32,
    theta: f32,
    k: usize,
    refine: impl Fn(&ListWrapper<'_>, u64) -> f32,
) -> PivotEvaluation {
    // `heap` already enforces capacity k internally; k is accepted here only
    // to keep this signature aligned with the rest of the pivot-evaluation
    // API (callers pass the same k they built the heap with).
    debug_assert!(heap.len() <= k);
    let doc_id = set.docid_at(0, arena);
    let mut doc_score = 0.0f32;
    let mut postings_evaluated = 0usize;
    let mut i = 0;
    while i < set.len() {
        let idx = set.arena_index(i);
        if arena[idx].docid() != doc_id {
            break;
        }
        let contrib = scorer.calculate_docscore(arena[idx].freq(), arena[idx].f_t(), doc_id);
        doc_score += contrib;
        potential_score += contrib;
        potential_score -= refine(&arena[idx], doc_id);
        postings_evaluated += 1;
        arena[idx].advance();
        if potential_score < theta {
            i += 1;
            while i < set.len() {
                let idx2 = set.arena_index(i);
                if arena[idx2].is_end() || arena[idx2].docid() != doc_id {
                    break;
                }
                arena[idx2].advance();
                i += 1;
            }
            break;
        }
        i += 1;
    }

    let added_to_heap = heap.offer(doc_id, doc_score);

    set.resort(arena);
    PivotEvaluation {
        threshold: if heap.is_full() { heap.top().score } else { 0.0 },
        postings_evaluated,
        added_to_heap,
    }
}

/// Pivot evaluation, WAND flavor: the incremental refinement unwinds each
/// aligned list's full (pessimistic) upper bound.
pub fn evaluate_pivot_wand(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    potential_score: f32,
    theta: f32,
    k: usize,
) -> PivotEvaluation {
    evaluate_pivot_impl(set, arena, heap, scorer, potential_score, theta, k, |w, _d| {
        w.list_max_score()
    })
}

/// Pivot evaluation, BMW flavor: the incremental refinement unwinds each
/// aligned list's current block-max instead of its list-wide bound, a
/// tighter (and so more effective) estimate.
pub fn evaluate_pivot_bmw(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    potential_score: f32,
    theta: f32,
    k: usize,
) -> PivotEvaluation {
    evaluate_pivot_impl(set, arena, heap, scorer, potential_score, theta, k, |w, d| {
        let bid = w.block_containing_id(d);
        w.block_max(bid)
    })
}
