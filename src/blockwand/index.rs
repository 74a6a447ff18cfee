//! The index container: owns every term's postings list, the document
//! length table, and the collection-wide counts a scorer needs. `save`/
//! `load` use an explicit, hand-specified binary layout rather than a
//! serialization framework, since this is a small, fixed, hot-path format.

use std::path::Path;

use crate::codec::{
    read_f32_ref, read_u16_ref, read_u32_ref, read_u64_ref, write_f32_ref, write_u16_ref,
    write_u32_ref, write_u64_ref,
};
use crate::error::{io_err, Error};
use crate::postings::{Block, PostingsList};
use crate::scorer::{Bm25Scorer, Scorer};

/// Which kind of score a postings list's stored values represent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostingsForm {
    /// Raw term frequencies, scored with BM25 and document length.
    Frequency,
    /// Pre-quantized impact scores; length is ignored.
    Quantized,
}

impl PostingsForm {
    fn tag(self) -> u8 {
        match self {
            PostingsForm::Frequency => 0,
            PostingsForm::Quantized => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, Error> {
        match tag {
            0 => Ok(PostingsForm::Frequency),
            1 => Ok(PostingsForm::Quantized),
            _ => Err(Error::Corrupt("unknown postings_form tag")),
        }
    }
}

/// Owns every term's postings list plus the collection-wide metadata a
/// scorer needs. Read-only after construction, so it can be shared freely
/// across query threads.
pub struct Index {
    postings_form: PostingsForm,
    indexed_doc_count: u64,
    doc_len: Vec<u32>,
    lists: Vec<PostingsList>,
    scorer: Scorer,
}

impl Index {
    /// Builds an index directly from in-memory postings, for tests: one
    /// `(docid, freq)` vector per term, plus the document-length table and
    /// postings form. Term ids are assigned by position in `lists`.
    pub fn from_postings(
        lists: Vec<Vec<(u64, u32)>>,
        doc_len: Vec<u32>,
        postings_form: PostingsForm,
    ) -> Self {
        let indexed_doc_count = doc_len.len() as u64;
        let scorer = match postings_form {
            PostingsForm::Frequency => Scorer::Bm25(Bm25Scorer::new(&doc_len, indexed_doc_count)),
            PostingsForm::Quantized => Scorer::Impact,
        };
        let built = lists
            .into_iter()
            .map(|postings| build_list(&postings, &scorer))
            .collect();
        Index {
            postings_form,
            indexed_doc_count,
            doc_len,
            lists: built,
            scorer,
        }
    }

    /// The scorer selected by this index's postings form.
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Document length, used by BM25 normalization (`Impact` ignores it).
    pub fn doc_length(&self, doc_id: u64) -> u32 {
        self.doc_len.get(doc_id as usize).copied().unwrap_or(0)
    }

    /// Total number of indexed documents.
    pub fn indexed_doc_count(&self) -> u64 {
        self.indexed_doc_count
    }

    /// The postings list for `term_id`, if the term is known to this index.
    pub fn postings_list(&self, term_id: u64) -> Option<&PostingsList> {
        self.lists.get(term_id as usize)
    }

    /// Number of distinct terms in this index.
    pub fn term_count(&self) -> usize {
        self.lists.len()
    }

    /// Which kind of score this index's postings store.
    pub fn postings_form(&self) -> PostingsForm {
        self.postings_form
    }

    /// Serializes this index to the on-disk format described in the crate's
    /// design notes: a `postings_form` tag, `indexed_doc_count`, the
    /// doc-length table, a list count, then each postings list.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut buf = Vec::new();
        buf.push(self.postings_form.tag());
        write_u64_ref(self.indexed_doc_count, &mut buf);
        write_u32_ref(self.doc_len.len() as u32, &mut buf);
        for &len in &self.doc_len {
            write_u32_ref(len, &mut buf);
        }
        write_u32_ref(self.lists.len() as u32, &mut buf);
        for list in &self.lists {
            write_u32_ref(list.doc_count(), &mut buf);
            write_f32_ref(list.list_max_score(), &mut buf);
            write_u32_ref(list.block_count() as u32, &mut buf);
            for block in list.blocks_for_serialization() {
                write_u64_ref(block.max_docid, &mut buf);
                write_f32_ref(block.max_block_score, &mut buf);
                write_u16_ref(block.posting_count, &mut buf);
                write_u32_ref(block.bytes.len() as u32, &mut buf);
                buf.extend_from_slice(&block.bytes);
            }
        }
        std::fs::write(path, &buf).map_err(|e| io_err(path, e))
    }

    /// Loads an index previously written by [`Index::save`].
    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
        let mut pos = 0usize;
        if bytes.is_empty() {
            return Err(Error::Corrupt("empty index file"));
        }
        let postings_form = PostingsForm::from_tag(bytes[pos])?;
        pos += 1;
        let indexed_doc_count = read_u64_ref(&bytes, &mut pos);
        let doc_len_count = read_u32_ref(&bytes, &mut pos) as usize;
        let mut doc_len = Vec::with_capacity(doc_len_count);
        for _ in 0..doc_len_count {
            doc_len.push(read_u32_ref(&bytes, &mut pos));
        }
        let scorer = match postings_form {
            PostingsForm::Frequency => Scorer::Bm25(Bm25Scorer::new(&doc_len, indexed_doc_count)),
            PostingsForm::Quantized => Scorer::Impact,
        };
        let list_count = read_u32_ref(&bytes, &mut pos) as usize;
        let mut lists = Vec::with_capacity(list_count);
        for _ in 0..list_count {
            let doc_count = read_u32_ref(&bytes, &mut pos);
            let list_max_score = read_f32_ref(&bytes, &mut pos);
            let block_count = read_u32_ref(&bytes, &mut pos) as usize;
            let mut blocks = Vec::with_capacity(block_count);
            for _ in 0..block_count {
                let max_docid = read_u64_ref(&bytes, &mut pos);
                let max_block_score = read_f32_ref(&bytes, &mut pos);
                let posting_count = read_u16_ref(&bytes, &mut pos);
                let byte_len = read_u32_ref(&bytes, &mut pos) as usize;
                let block_bytes = bytes[pos..pos + byte_len].to_vec();
                pos += byte_len;
                blocks.push(Block {
                    max_docid,
                    max_block_score,
                    posting_count,
                    bytes: block_bytes,
                });
            }
            lists.push(PostingsList::from_raw(doc_count, list_max_score, blocks));
        }
        Ok(Index {
            postings_form,
            indexed_doc_count,
            doc_len,
            lists,
            scorer,
        })
    }
}

fn build_list(postings: &[(u64, u32)], scorer: &Scorer) -> PostingsList {
    let f_t = postings.len() as u32;
    let list_max_score = match scorer {
        Scorer::Bm25(bm25) => bm25.list_max_score(f_t),
        Scorer::Impact => postings.iter().map(|&(_, freq)| freq as f32).fold(0.0, f32::max),
    };
    PostingsList::build(postings, list_max_score, |freq, doc_id| {
        scorer.calculate_docscore(freq, f_t, doc_id)
    })
}

/// Reads a postings list's varint stream back into `(docid, freq)` pairs,
/// used only by round-trip tests that want to inspect a loaded index.
#[cfg(test)]
pub(crate) fn decode_postings(list: &PostingsList) -> Vec<(u64, u32)> {
    let mut out = Vec::new();
    let mut cursor = list.cursor();
    while !cursor.is_end() {
        out.push((cursor.docid(), cursor.freq()));
        cursor.advance();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> Index {
        Index::from_postings(
            vec![vec![(1, 2), (3, 1)], vec![(2, 1), (3, 4)]],
            vec![10, 20, 15, 8],
            PostingsForm::Frequency,
        )
    }

    #[test]
    fn from_postings_builds_queryable_lists() {
        let index = sample_index();
        assert_eq!(index.term_count(), 2);
        let list = index.postings_list(0).unwrap();
        assert_eq!(list.doc_count(), 2);
        assert_eq!(decode_postings(list), vec![(1, 2), (3, 1)]);
    }

    #[test]
    fn save_then_load_round_trips_exactly() {
        let index = sample_index();
        let dir = std::env::temp_dir().join(format!(
            "blockwand-index-test-{:?}",
            std::thread::current().id()
        ));
        index.save(&dir).unwrap();
        let loaded = Index::load(&dir).unwrap();
        let _ = std::fs::remove_file(&dir);

        assert_eq!(loaded.term_count(), index.term_count());
        assert_eq!(loaded.indexed_doc_count(), index.indexed_doc_count());
        for term_id in 0..index.term_count() as u64 {
            let a = decode_postings(index.postings_list(term_id).unwrap());
            let b = decode_postings(loaded.postings_list(term_id).unwrap());
            assert_eq!(a, b);
        }
    }
}
