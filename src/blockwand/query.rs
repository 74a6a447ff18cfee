//! Term dictionary and query-file parsing.
//!
//! A flat `term id` dictionary file, and a query file of `qry_id;tok1
//! tok2...` lines where a leading `-` on a token marks it negated. Term
//! merging preserves first-seen order in the query line (a `Vec` plus a
//! lookup map) rather than handing the merged terms back in whatever order
//! an unordered map iterates them in, so that parsing the same line twice
//! always produces the same `Query`.

use std::path::Path;

use ahash::AHashMap;

use crate::error::{io_err, Error};

/// `term -> id` and `id -> term` maps loaded from a dictionary file.
pub struct Dictionary {
    to_id: AHashMap<String, u64>,
    to_term: AHashMap<u64, String>,
}

impl Dictionary {
    /// Loads a dictionary from a text file of `term id` lines (first space
    /// separates the two fields; the term itself may not contain a space).
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let mut to_id = AHashMap::new();
        let mut to_term = AHashMap::new();
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            let (term, id_str) = line.split_once(' ').ok_or_else(|| Error::Parse {
                context: "dictionary line",
                line: line.to_string(),
            })?;
            let id: u64 = id_str.trim().parse().map_err(|_| Error::Parse {
                context: "dictionary id",
                line: line.to_string(),
            })?;
            to_id.insert(term.to_string(), id);
            to_term.insert(id, term.to_string());
        }
        Ok(Dictionary { to_id, to_term })
    }

    /// Term id for `term`, if present.
    pub fn id_of(&self, term: &str) -> Option<u64> {
        self.to_id.get(term).copied()
    }

    /// The term spelled by `id`, if present.
    pub fn term_of(&self, id: u64) -> Option<&str> {
        self.to_term.get(&id).map(String::as_str)
    }

    /// Number of terms in the dictionary.
    pub fn len(&self) -> usize {
        self.to_id.len()
    }

    /// True if the dictionary has no terms.
    pub fn is_empty(&self) -> bool {
        self.to_id.is_empty()
    }
}

/// One deduplicated term in a parsed query: a term id, the number of times
/// it appeared in the query (query-term frequency, currently unused by
/// scoring but preserved), and whether it was negated.
#[derive(Clone, Copy, Debug)]
pub struct QueryToken {
    /// Term id.
    pub term_id: u64,
    /// Number of times this term appeared in the query line.
    pub count: u64,
    /// True if this term was marked with a leading `-` (mandatory-absent).
    pub negated: bool,
}

/// A parsed, deduplicated query.
#[derive(Clone, Debug)]
pub struct Query {
    /// Query id, taken from before the `;` in the query line.
    pub qry_id: u64,
    /// Deduplicated, first-seen-ordered terms.
    pub tokens: Vec<QueryToken>,
}

impl Query {
    /// Non-negated terms, in first-seen order.
    pub fn positive_terms(&self) -> impl Iterator<Item = &QueryToken> {
        self.tokens.iter().filter(|t| !t.negated)
    }

    /// Negated terms, in first-seen order.
    pub fn negated_terms(&self) -> impl Iterator<Item = &QueryToken> {
        self.tokens.iter().filter(|t| t.negated)
    }
}

/// Parses one `qry_id;tok1 tok2 ...` line.
///
/// `strict` mirrors the original's `only_complete`: when a named token isn't
/// in the dictionary, `strict` drops the whole query (`Ok(None)`) instead of
/// just that token. `integers` treats every token as a bare term id with no
/// negation support, skipping dictionary lookup entirely.
///
/// Returns `Err(Error::ConflictingNegation)` if the same term id appears
/// both negated and not within the line -- this is always a hard error,
/// `strict` does not relax it.
pub fn parse_query_line(
    dict: &Dictionary,
    line: &str,
    strict: bool,
    integers: bool,
) -> Result<Option<Query>, Error> {
    let (id_part, body) = line.split_once(';').ok_or_else(|| Error::Parse {
        context: "query line (missing ';')",
        line: line.to_string(),
    })?;
    let qry_id: u64 = id_part.trim().parse().map_err(|_| Error::Parse {
        context: "query id",
        line: line.to_string(),
    })?;

    let mut tokens: Vec<QueryToken> = Vec::new();
    let mut position: AHashMap<u64, usize> = AHashMap::new();

    for raw in body.split(' ') {
        if raw.is_empty() {
            continue;
        }
        let (term_id, negated) = if integers {
            let id: u64 = raw.parse().map_err(|_| Error::Parse {
                context: "integer query token",
                line: line.to_string(),
            })?;
            (id, false)
        } else {
            let negated = raw.starts_with('-');
            let term = if negated { &raw[1..] } else { raw };
            if negated {
                eprintln!("query {qry_id} has negated term: {term}");
            }
            match dict.id_of(term) {
                Some(id) => (id, negated),
                None => {
                    eprintln!("ERROR: could not find '{term}' in the dictionary.");
                    if strict {
                        return Ok(None);
                    }
                    continue;
                }
            }
        };

        match position.get(&term_id) {
            Some(&i) => {
                if tokens[i].negated != negated {
                    return Err(Error::ConflictingNegation { qry_id, term_id });
                }
                tokens[i].count += 1;
            }
            None => {
                position.insert(term_id, tokens.len());
                tokens.push(QueryToken {
                    term_id,
                    count: 1,
                    negated,
                });
            }
        }
    }

    Ok(Some(Query { qry_id, tokens }))
}

/// Parses every non-empty line of a query file, dropping lines that
/// `parse_query_line` rejects under `strict` but propagating a conflicting
/// negation as a hard error, matching the original's "bad queries still
/// run" / "contradictory queries do not" split.
pub fn parse_queries(
    dict: &Dictionary,
    path: &Path,
    strict: bool,
    integers: bool,
) -> Result<Vec<Query>, Error> {
    let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let mut queries = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if let Some(query) = parse_query_line(dict, line, strict, integers)? {
            queries.push(query);
        }
    }
    Ok(queries)
}
