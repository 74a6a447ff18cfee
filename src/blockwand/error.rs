//! Error types returned while loading an index/dictionary/query file or
//! configuring a search.
//!
//! The core pruning loops themselves never fail once their inputs are valid
//! (see the crate-level docs); every fallible entry point in this crate sits
//! at the I/O or parsing boundary, so a single flat enum is enough here --
//! no hierarchy of error types per module.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Everything that can go wrong outside the pruning core: opening files,
/// parsing the dictionary/query text formats, or resolving a run-type string
/// passed in from the command line.
#[derive(Debug)]
pub enum Error {
    /// Could not open or read a file (postings index, dictionary, or query file).
    Io {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A query repeats a term with conflicting negation (e.g. `a -a`).
    ConflictingNegation {
        /// Query id the conflict was found in.
        qry_id: u64,
        /// Term id that conflicts.
        term_id: u64,
    },
    /// `index_form`/`traversal` did not resolve to a known run-type.
    InvalidRunType(String),
    /// A malformed line in a dictionary or query file.
    Parse {
        /// What was being parsed when the line failed.
        context: &'static str,
        /// The offending line.
        line: String,
    },
    /// The on-disk index file has a format this build cannot read (wrong
    /// magic, truncated, or corrupted).
    Corrupt(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, source } => {
                write!(f, "could not open '{}': {}", path.display(), source)
            }
            Error::ConflictingNegation { qry_id, term_id } => write!(
                f,
                "query {qry_id} has broken semantics: term {term_id} appears both negated and not"
            ),
            Error::InvalidRunType(s) => {
                write!(f, "invalid run-type '{s}': must be wand or bmw")
            }
            Error::Parse { context, line } => {
                write!(f, "could not parse {context}: '{line}'")
            }
            Error::Corrupt(why) => write!(f, "corrupt index file: {why}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub(crate) fn io_err(path: &std::path::Path, source: io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}
