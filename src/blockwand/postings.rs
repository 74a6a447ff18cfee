//! Block-compressed postings lists and the forward-only cursor over them.
//!
//! Each postings list is a sequence of `(docid, freq)` pairs, docids strictly
//! increasing, split into blocks of up to [`BLOCK_SIZE`] postings. Within a
//! block, docids are delta-encoded against the previous docid *in that
//! block* (reset to 0 at each block boundary) and varint-packed alongside
//! their frequency, using a plain byte-buffer codec with an explicit running
//! position (see [`crate::codec`]).
//!
//! A block also carries its own last docid (`block_rep`) and its own maximum
//! score contribution (`max_block_score`), so [`Cursor::skip_to_id`] and the
//! block-max candidate test can both work one block at a time without
//! decoding postings they don't need.

use crate::codec::{read_varint, write_varint};

/// Maximum number of postings packed into a single block.
pub const BLOCK_SIZE: usize = 128;

/// One block of a postings list: up to [`BLOCK_SIZE`] postings, delta+varint
/// encoded, plus the precomputed bounds that let a cursor skip past it
/// without decoding.
#[derive(Debug, Clone)]
pub struct Block {
    /// Docid of the last posting in this block (`block_rep`).
    pub(crate) max_docid: u64,
    /// Largest single-posting score contribution within this block.
    pub(crate) max_block_score: f32,
    /// Number of postings packed into this block.
    pub(crate) posting_count: u16,
    /// Delta-docid + varint-freq encoded postings, in order.
    pub(crate) bytes: Vec<u8>,
}

/// An immutable, block-compressed postings list for one term.
#[derive(Debug, Clone)]
pub struct PostingsList {
    /// Collection frequency of the term (`f_t`): number of documents it
    /// appears in, i.e. the number of postings in this list.
    pub(crate) doc_count: u32,
    /// Upper bound on any single posting's score contribution from this list.
    pub(crate) list_max_score: f32,
    pub(crate) blocks: Vec<Block>,
}

impl PostingsList {
    /// Builds a postings list from sorted, deduplicated `(docid, freq)`
    /// pairs. `list_max_score` is the caller-supplied, scorer-dependent upper
    /// bound (BM25: `idf(f_t) * (K1 + 1)`; Impact: the true maximum impact
    /// value in `postings`, since for impact scores the exact maximum is both
    /// available and tighter than any derived bound). `contribution` computes
    /// a single posting's score contribution, used only to find each block's
    /// `max_block_score`.
    pub fn build(
        postings: &[(u64, u32)],
        list_max_score: f32,
        contribution: impl Fn(u32, u64) -> f32,
    ) -> Self {
        debug_assert!(
            postings.windows(2).all(|w| w[0].0 < w[1].0),
            "postings must be sorted by strictly increasing docid"
        );
        let blocks = postings
            .chunks(BLOCK_SIZE)
            .map(|chunk| {
                let mut bytes = Vec::new();
                let mut prev_docid = 0u64;
                let mut max_block_score = 0f32;
                for &(docid, freq) in chunk {
                    write_varint(docid - prev_docid, &mut bytes);
                    write_varint(freq as u64, &mut bytes);
                    prev_docid = docid;
                    let score = contribution(freq, docid);
                    if score > max_block_score {
                        max_block_score = score;
                    }
                }
                Block {
                    max_docid: chunk.last().unwrap().0,
                    max_block_score,
                    posting_count: chunk.len() as u16,
                    bytes,
                }
            })
            .collect();
        PostingsList {
            doc_count: postings.len() as u32,
            list_max_score,
            blocks,
        }
    }

    /// Collection frequency `f_t`: number of documents this term appears in.
    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Upper bound on any single posting's score contribution from this list.
    pub fn list_max_score(&self) -> f32 {
        self.list_max_score
    }

    /// Number of blocks in this list.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// A fresh cursor positioned at the first posting, or at end if the list
    /// is empty.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self)
    }

    /// Rebuilds a postings list from its already-encoded blocks, as read
    /// back from the on-disk format by [`crate::index::Index::load`].
    pub(crate) fn from_raw(doc_count: u32, list_max_score: f32, blocks: Vec<Block>) -> Self {
        PostingsList {
            doc_count,
            list_max_score,
            blocks,
        }
    }

    /// Exposes this list's blocks for serialization by
    /// [`crate::index::Index::save`].
    pub(crate) fn blocks_for_serialization(&self) -> &[Block] {
        &self.blocks
    }
}

/// A forward-only, mutable position over one [`PostingsList`].
///
/// Invariants: the docid at the current position is non-decreasing under any
/// `advance`/`skip_to_id` call; `remaining()` decreases monotonically; once
/// `is_end()` is true, the cursor carries no further postings.
pub struct Cursor<'a> {
    list: &'a PostingsList,
    block_idx: usize,
    decode_pos: usize,
    prev_docid_in_block: u64,
    consumed: u64,
    decoded_docid: u64,
    decoded_freq: u32,
    at_end: bool,
}

impl<'a> Cursor<'a> {
    fn new(list: &'a PostingsList) -> Self {
        let mut cursor = Cursor {
            list,
            block_idx: 0,
            decode_pos: 0,
            prev_docid_in_block: 0,
            consumed: 0,
            decoded_docid: 0,
            decoded_freq: 0,
            at_end: list.doc_count == 0,
        };
        if !cursor.at_end {
            cursor.decode_next();
        }
        cursor
    }

    /// Decodes the posting following whatever `decode_pos`/`block_idx`
    /// currently point at, crossing into the next block first if the
    /// current one is exhausted. Does not touch `consumed` or `at_end`:
    /// callers decide whether there is a "next" posting to decode before
    /// calling this.
    fn decode_next(&mut self) {
        let mut block = &self.list.blocks[self.block_idx];
        if self.decode_pos >= block.bytes.len() {
            self.block_idx += 1;
            self.decode_pos = 0;
            self.prev_docid_in_block = 0;
            block = &self.list.blocks[self.block_idx];
        }
        let delta = read_varint(&block.bytes, &mut self.decode_pos);
        let freq = read_varint(&block.bytes, &mut self.decode_pos) as u32;
        self.prev_docid_in_block += delta;
        self.decoded_docid = self.prev_docid_in_block;
        self.decoded_freq = freq;
    }

    /// Docid at the current position. Meaningless once `is_end()`.
    pub fn docid(&self) -> u64 {
        self.decoded_docid
    }

    /// Frequency (or impact value) at the current position.
    pub fn freq(&self) -> u32 {
        self.decoded_freq
    }

    /// True once the cursor has advanced past the last posting.
    pub fn is_end(&self) -> bool {
        self.at_end
    }

    /// Number of postings from the current position (inclusive) to the end.
    pub fn remaining(&self) -> u64 {
        self.list.doc_count as u64 - self.consumed
    }

    /// Moves to the next posting. No-op once `is_end()`.
    pub fn advance(&mut self) {
        if self.at_end {
            return;
        }
        self.consumed += 1;
        if self.consumed >= self.list.doc_count as u64 {
            self.at_end = true;
            return;
        }
        self.decode_next();
    }

    /// Index of the block that contains (or would first reach) `id`, without
    /// moving the cursor. Searches only blocks from the current position
    /// onward, since callers only ever probe ids at or ahead of the current
    /// docid. If `id` is beyond every remaining block, the last block's
    /// index is returned (its `block_rep` is then `< id`, a correctly loose
    /// but safe answer -- the cursor simply hasn't discovered yet that it
    /// cannot reach `id`).
    pub fn block_containing_id(&self, id: u64) -> usize {
        let blocks = &self.list.blocks[self.block_idx..];
        let offset = blocks.partition_point(|b| b.max_docid < id);
        (self.block_idx + offset).min(self.list.blocks.len() - 1)
    }

    /// Maximum single-posting score contribution within block `block_id`.
    pub fn block_max(&self, block_id: usize) -> f32 {
        self.list.blocks[block_id].max_block_score
    }

    /// Last docid (`block_rep`) of block `block_id`.
    pub fn block_rep(&self, block_id: usize) -> u64 {
        self.list.blocks[block_id].max_docid
    }

    /// Positions the cursor at the smallest docid `>= target`, or at end if
    /// none exists. Whole blocks that cannot contain `target` are skipped by
    /// their `posting_count` without decoding; only the block that can
    /// contain `target` is linearly decoded.
    pub fn skip_to_id(&mut self, target: u64) {
        if self.at_end || self.decoded_docid >= target {
            return;
        }
        let blocks = &self.list.blocks;
        let offset = blocks[self.block_idx..].partition_point(|b| b.max_docid < target);
        let target_block = self.block_idx + offset;
        if target_block >= blocks.len() {
            self.consumed = self.list.doc_count as u64;
            self.at_end = true;
            return;
        }
        if target_block != self.block_idx {
            let skipped: u64 = blocks[self.block_idx..target_block]
                .iter()
                .map(|b| b.posting_count as u64)
                .sum();
            self.consumed += skipped;
            self.block_idx = target_block;
            self.decode_pos = 0;
            self.prev_docid_in_block = 0;
            self.decode_next();
        }
        while self.decoded_docid < target {
            self.consumed += 1;
            if self.consumed >= self.list.doc_count as u64 {
                self.at_end = true;
                return;
            }
            self.decode_next();
        }
    }
}
