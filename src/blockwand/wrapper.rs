//! List wrappers and the list set they live in.
//!
//! The original algorithm holds raw pointers into two contiguous wrapper
//! arrays and re-sorts that array of pointers in place as cursors move. A
//! safe translation keeps the wrappers in one stable arena (a `Vec` they are
//! never removed from mid-query) and has the list set hold indices into that
//! arena instead of references, per the design note on avoiding aliasing
//! references during re-sort (see the crate's design notes).

use smallvec::SmallVec;

use crate::postings::{Cursor, PostingsList};

/// A cursor plus the per-list metadata the pivot engine and scorer need,
/// without re-deriving it from the postings list on every access.
pub struct ListWrapper<'a> {
    cursor: Cursor<'a>,
    list_max_score: f32,
    f_t: u32,
}

impl<'a> ListWrapper<'a> {
    /// Wraps a fresh cursor over `list`.
    pub fn new(list: &'a PostingsList) -> Self {
        ListWrapper {
            cursor: list.cursor(),
            list_max_score: list.list_max_score(),
            f_t: list.doc_count(),
        }
    }

    /// Current docid. Meaningless once `is_end()`.
    pub fn docid(&self) -> u64 {
        self.cursor.docid()
    }

    /// Frequency (or impact value) at the current position.
    pub fn freq(&self) -> u32 {
        self.cursor.freq()
    }

    /// True once the underlying cursor has advanced past its last posting.
    pub fn is_end(&self) -> bool {
        self.cursor.is_end()
    }

    /// Collection frequency of this list's term.
    pub fn f_t(&self) -> u32 {
        self.f_t
    }

    /// Upper bound on any single posting's contribution from this list.
    pub fn list_max_score(&self) -> f32 {
        self.list_max_score
    }

    /// Number of postings from the current position (inclusive) to the end.
    pub fn remaining(&self) -> u64 {
        self.cursor.remaining()
    }

    /// Advances the cursor one step.
    pub fn advance(&mut self) {
        self.cursor.advance();
    }

    /// Positions the cursor at the smallest docid `>= target`, or at end.
    pub fn skip_to_id(&mut self, target: u64) {
        self.cursor.skip_to_id(target);
    }

    /// Index of the block containing (or first reaching) `id`.
    pub fn block_containing_id(&self, id: u64) -> usize {
        self.cursor.block_containing_id(id)
    }

    /// Maximum single-posting score contribution within block `block_id`.
    pub fn block_max(&self, block_id: usize) -> f32 {
        self.cursor.block_max(block_id)
    }

    /// Last docid of block `block_id`.
    pub fn block_rep(&self, block_id: usize) -> u64 {
        self.cursor.block_rep(block_id)
    }
}

/// An ordered view over a subset of an arena of [`ListWrapper`]s, kept
/// sorted ascending by current docid with end-exhausted entries dropped.
///
/// Holds stable arena indices rather than references, so the arena can be
/// borrowed mutably through the set without the aliasing that raw pointers
/// into a re-sorted array would require.
pub struct ListSet {
    order: SmallVec<[usize; 8]>,
}

impl ListSet {
    /// Builds a list set over every wrapper in `arena`, sorted by docid,
    /// with end-exhausted wrappers dropped immediately (an already-empty
    /// postings list never participates in pivot selection).
    pub fn new(arena: &[ListWrapper<'_>]) -> Self {
        let mut order: SmallVec<[usize; 8]> =
            (0..arena.len()).filter(|&i| !arena[i].is_end()).collect();
        order.sort_by(|&a, &b| arena[a].docid().cmp(&arena[b].docid()));
        ListSet { order }
    }

    /// Number of live (non-exhausted) lists currently in the set.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no lists remain.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Arena index at set position `i`.
    pub fn arena_index(&self, i: usize) -> usize {
        self.order[i]
    }

    /// Current docid of the list at set position `i`.
    pub fn docid_at(&self, i: usize, arena: &[ListWrapper<'_>]) -> u64 {
        arena[self.order[i]].docid()
    }

    /// Re-sorts the set by current docid and drops any entries that have
    /// reached end, returning the new length. Conjunctive loops compare this
    /// return value against the initial list count to detect exhaustion as
    /// an explicit signal rather than re-querying `len()` after the fact.
    pub fn resort(&mut self, arena: &[ListWrapper<'_>]) -> usize {
        self.order.retain(|&i| !arena[i].is_end());
        self.order.sort_by(|&a, &b| arena[a].docid().cmp(&arena[b].docid()));
        self.order.len()
    }

    /// Restores order after exactly one entry (`moved`, by arena index) has
    /// advanced forward. Cheaper than a full [`resort`](Self::resort): the
    /// moved entry can only have grown its docid, so it is bubbled rightward
    /// past neighbors it now exceeds, or dropped if it hit end.
    pub fn bubble_right(&mut self, moved: usize, arena: &[ListWrapper<'_>]) {
        let Some(pos) = self.order.iter().position(|&i| i == moved) else {
            return;
        };
        if arena[moved].is_end() {
            self.order.remove(pos);
            return;
        }
        let docid = arena[moved].docid();
        let mut j = pos;
        while j + 1 < self.order.len() && arena[self.order[j + 1]].docid() < docid {
            self.order.swap(j, j + 1);
            j += 1;
        }
    }

    /// Shortest-remaining-postings list among set positions `[0, end)` whose
    /// current docid differs from `exclude_docid`. Leftmost minimum wins.
    pub fn shortest_excluding(
        &self,
        end: usize,
        exclude_docid: u64,
        arena: &[ListWrapper<'_>],
    ) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for i in 0..end {
            let idx = self.order[i];
            if arena[idx].docid() == exclude_docid {
                continue;
            }
            let remaining = arena[idx].remaining();
            if best.is_none_or(|(_, r)| remaining < r) {
                best = Some((idx, remaining));
            }
        }
        best.map(|(idx, _)| idx)
    }
}
