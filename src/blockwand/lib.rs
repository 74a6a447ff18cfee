#![crate_type = "lib"]
#![crate_name = "blockwand"]

//! # `blockwand`
//! A top-k document retrieval engine built around dynamic pruning: WAND and
//! Block-Max WAND, each in disjunctive (any queried term) and conjunctive
//! (every queried term) traversal, with safe-to-k negated-term exclusion.
//! ### Add use declarations
//! ```
//! use blockwand::index::{Index, PostingsForm};
//! use blockwand::processor::{run_query, Config};
//! use blockwand::query::{Query, QueryToken};
//! ```
//! ### build an index
//! ```rust
//! use blockwand::index::{Index, PostingsForm};
//!
//! let lists = vec![
//!     vec![(1, 2), (3, 1)],
//!     vec![(2, 1), (3, 4)],
//! ];
//! let doc_len = vec![10, 20, 15, 8];
//! let index = Index::from_postings(lists, doc_len, PostingsForm::Frequency);
//! ```
//! ### run a query
//! ```rust
//! use blockwand::index::{Index, PostingsForm};
//! use blockwand::processor::{run_query, Config};
//! use blockwand::query::{Query, QueryToken};
//!
//! let index = Index::from_postings(
//!     vec![vec![(1, 2), (3, 1)], vec![(2, 1), (3, 4)]],
//!     vec![10, 20, 15, 8],
//!     PostingsForm::Frequency,
//! );
//! let query = Query {
//!     qry_id: 1,
//!     tokens: vec![
//!         QueryToken { term_id: 0, count: 1, negated: false },
//!         QueryToken { term_id: 1, count: 1, negated: false },
//!     ],
//! };
//! let result = run_query(&index, &query, &Config::default());
//! ```

pub(crate) mod codec;
/// Error type returned by dictionary, query, and index I/O.
pub mod error;
pub(crate) mod heap;
/// The index container: postings lists, document-length table, and scorer
/// selection. `create`/`load`/`save` the way a caller manages a search index.
pub mod index;
pub(crate) mod negation;
pub(crate) mod pivot;
pub(crate) mod postings;
/// The six dynamic-pruning main loops, selected by [`processor::Config`] and
/// driven by [`processor::run_query`].
pub mod processor;
/// Term dictionary and query-file parsing.
pub mod query;
/// BM25 and pre-quantized impact scoring.
pub mod scorer;
pub(crate) mod wrapper;
