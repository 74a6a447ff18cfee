//! Document scoring: BM25 (length-normalized) or quantized impact.
//!
//! Expressed as a tagged enum with one scoring method per variant rather than
//! a trait object hierarchy, per the design note that two scorer variants
//! don't warrant dynamic dispatch.

/// BM25 free parameters.
pub const BM25_K1: f32 = 1.2;
/// BM25 length-normalization weight.
pub const BM25_B: f32 = 0.75;

/// A tagged scorer. `Bm25` normalizes by document length; `Impact` treats the
/// stored posting frequency as an already-final, pre-quantized score
/// contribution and ignores length entirely.
pub enum Scorer {
    /// Length-normalized probabilistic scoring (BM25).
    Bm25(Bm25Scorer),
    /// Pre-quantized impact scores: `calculate_docscore` returns `freq` as-is.
    Impact,
}

/// BM25 scoring state: collection size and a per-document length-normalization
/// cache, precomputed once at index-load time.
///
/// Document length is stored exactly (one `u32` per document, see
/// [`crate::index::Index`]), so the cache here is keyed directly by document
/// id: precompute the length-normalization factor once per document, then
/// look it up on the hot path instead of dividing, with no lossy rounding --
/// which keeps the safe-to-k invariant exact.
pub struct Bm25Scorer {
    /// Total number of indexed documents (`N`), used for idf.
    pub indexed_doc_count: u64,
    component_cache: Vec<f32>,
}

impl Bm25Scorer {
    /// Builds the per-document normalization cache from document lengths.
    pub fn new(doc_len: &[u32], indexed_doc_count: u64) -> Self {
        let avg_doc_len = if doc_len.is_empty() {
            1.0
        } else {
            doc_len.iter().map(|&l| l as f64).sum::<f64>() as f32 / doc_len.len() as f32
        };
        let component_cache = doc_len
            .iter()
            .map(|&len| BM25_K1 * (1.0 - BM25_B + BM25_B * (len as f32 / avg_doc_len)))
            .collect();
        Bm25Scorer {
            indexed_doc_count,
            component_cache,
        }
    }

    /// Inverse document frequency for a term seen in `f_t` documents.
    pub fn idf(&self, f_t: u32) -> f32 {
        let n = self.indexed_doc_count as f32;
        (((n - f_t as f32 + 0.5) / (f_t as f32 + 0.5)) + 1.0).ln().max(0.0)
    }

    /// Upper bound on the contribution of a single posting from a term with
    /// collection frequency `f_t`: the tf-saturation term `freq*(K1+1)/(freq+c)`
    /// is strictly increasing in `freq` and bounded above by `K1+1` as
    /// `freq -> infinity`, for any length-normalization component `c >= 0`.
    pub fn list_max_score(&self, f_t: u32) -> f32 {
        self.idf(f_t) * (BM25_K1 + 1.0)
    }

    fn calculate_docscore(&self, freq: u32, f_t: u32, doc_id: u64) -> f32 {
        let component = self
            .component_cache
            .get(doc_id as usize)
            .copied()
            .unwrap_or(BM25_K1);
        let tf = freq as f32;
        self.idf(f_t) * (tf * (BM25_K1 + 1.0) / (tf + component))
    }
}

impl Scorer {
    /// Score contribution of a single posting: term frequency `freq`,
    /// collection frequency `f_t`, document `doc_id` (used for length
    /// normalization by the BM25 variant only).
    pub fn calculate_docscore(&self, freq: u32, f_t: u32, doc_id: u64) -> f32 {
        match self {
            Scorer::Bm25(bm25) => bm25.calculate_docscore(freq, f_t, doc_id),
            Scorer::Impact => freq as f32,
        }
    }

}
