//! The top-level query processor: picks one of six dynamic-pruning main
//! loops from a [`Config`], drives it to exhaustion over a [`Query`], and
//! drains the resulting heap into a descending-score result list alongside a
//! per-query [`Profile`].
//!
//! Each loop follows the shared skeleton from the crate's design notes:
//! sort, select a pivot, test/forward/evaluate, repeat until no pivot
//! remains (or, for conjunctive traversal, until any list runs dry). The six
//! variants differ only in pivot mode, whether a block-max candidate test
//! gates evaluation, and whether/when a negation check runs -- see the table
//! in the module-level walkthrough below.

use crate::heap::MinHeap;
use crate::negation::is_negated;
use crate::pivot::{
    block_max_test, conjunctive_max, evaluate_pivot_bmw, evaluate_pivot_wand, forward_bmw,
    forward_wand, select_pivot_conjunctive, select_pivot_disjunctive, PivotEvaluation,
};
use crate::query::Query;
use crate::scorer::Scorer;
use crate::index::Index;
use crate::wrapper::{ListSet, ListWrapper};

/// Which pruning strategy to run: list-level bounds only, or list-level
/// bounds refined by per-block bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexForm {
    /// WAND: pivot selection and forwarding driven by list-level upper bounds.
    Wand,
    /// Block-Max WAND: adds the block-max candidate test and shallow
    /// block-aware forwarding on top of WAND.
    Bmw,
}

/// Disjunctive ("OR": a document may appear in any queried positive list) or
/// conjunctive ("AND": a document must appear in every queried positive
/// list) traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// Disjunctive pivot selection; any positive list may exhaust without
    /// ending the query.
    Or,
    /// Conjunctive pivot selection; the query ends the moment any positive
    /// list exhausts.
    And,
}

/// Per-query configuration selecting one of the six main loops.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Number of top-scoring documents to return.
    pub k: usize,
    /// WAND or BMW.
    pub index_form: IndexForm,
    /// OR or AND.
    pub traversal: Traversal,
    /// For BMW-OR with negated terms, selects whether the negation check
    /// runs before (`true`) or after (`false`) the block-max candidate test.
    /// Ignored by every other combination.
    pub version_two: bool,
    /// Theta-push multiplier applied during disjunctive pivot selection.
    /// `1.0` preserves safe-to-k; values above `1.0` trade safety for more
    /// aggressive pruning (see the crate's design notes).
    pub f: f32,
}

impl Default for Config {
    /// `k=10`, BMW, OR, v1 negation ordering, `f=1.0` (safe-to-k).
    fn default() -> Self {
        Config {
            k: 10,
            index_form: IndexForm::Bmw,
            traversal: Traversal::Or,
            version_two: false,
            f: 1.0,
        }
    }
}

/// Per-query counters, built fresh per call and returned alongside each
/// query's result so it composes safely across concurrently-run queries
/// rather than relying on any shared mutable state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Profile {
    /// Total postings summed into some document's score across the query.
    pub postings_evaluated: usize,
    /// Number of documents that reached full pivot evaluation (aligned with
    /// the pivot list and scored), whether or not they made the heap.
    pub docs_evaluated: usize,
    /// Number of documents accepted into the heap (pushed, or evicted the
    /// prior minimum).
    pub docs_added_to_heap: usize,
    /// `heap.top().score` after the final loop iteration, or `0.0` if the
    /// heap never filled.
    pub final_threshold: f32,
    /// Number of candidate docids the negation filter rejected (found in a
    /// negated list).
    pub negation_failed: usize,
    /// Number of candidate docids the negation filter passed (not found in
    /// any negated list).
    pub negation_passed: usize,
    /// Number of distinct pivot docids the loop selected and acted on.
    pub unique_pivots: usize,
}

/// One query's result: the scored documents (descending by score, ascending
/// docid on ties, length <= `k`) and the profiling counters gathered while
/// producing them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    /// Scored documents, descending by score.
    pub results: Vec<(u64, f32)>,
    /// Profiling counters for this query.
    pub profile: Profile,
}

/// Builds a positive-term or negated-term wrapper arena from a query's
/// tokens, skipping any term id the index has no postings list for (an
/// unknown-to-the-index term behaves exactly like dropping it from the
/// query: it contributes nothing and excludes nothing).
fn build_arena<'a>(
    index: &'a Index,
    terms: impl Iterator<Item = u64>,
) -> Vec<ListWrapper<'a>> {
    terms
        .filter_map(|term_id| index.postings_list(term_id))
        .map(ListWrapper::new)
        .collect()
}

/// Runs `query` against `index` under `config`, returning the top-k result
/// and a profile of the run. Dispatches to one of six main loops based on
/// `(config.index_form, config.traversal, whether the query has negated
/// terms, config.version_two)`.
pub fn run_query(index: &Index, query: &Query, config: &Config) -> QueryResult {
    let mut arena = build_arena(index, query.positive_terms().map(|t| t.term_id));
    let mut negated_arena = build_arena(index, query.negated_terms().map(|t| t.term_id));

    let mut set = ListSet::new(&arena);
    let mut negated_set = ListSet::new(&negated_arena);
    let mut heap = MinHeap::new(config.k.max(1));
    let mut profile = Profile::default();
    let scorer = index.scorer();
    let has_negation = !negated_arena.is_empty();

    match (config.index_form, config.traversal) {
        (IndexForm::Wand, Traversal::Or) => run_wand_or(
            &mut set,
            &mut arena,
            &mut negated_set,
            &mut negated_arena,
            has_negation,
            &mut heap,
            scorer,
            config,
            &mut profile,
        ),
        (IndexForm::Wand, Traversal::And) => {
            run_wand_and(&mut set, &mut arena, &mut heap, scorer, config, &mut profile)
        }
        (IndexForm::Bmw, Traversal::Or) if !has_negation => {
            run_bmw_or(&mut set, &mut arena, &mut heap, scorer, config, &mut profile)
        }
        (IndexForm::Bmw, Traversal::Or) if config.version_two => run_bmw_or_v2(
            &mut set,
            &mut arena,
            &mut negated_set,
            &mut negated_arena,
            &mut heap,
            scorer,
            config,
            &mut profile,
        ),
        (IndexForm::Bmw, Traversal::Or) => run_bmw_or_v1(
            &mut set,
            &mut arena,
            &mut negated_set,
            &mut negated_arena,
            &mut heap,
            scorer,
            config,
            &mut profile,
        ),
        (IndexForm::Bmw, Traversal::And) => {
            run_bmw_and(&mut set, &mut arena, &mut heap, scorer, config, &mut profile)
        }
    }

    profile.final_threshold = if heap.is_full() { heap.top().score } else { 0.0 };
    let drained = heap.drain_descending();
    QueryResult {
        results: drained.into_iter().map(|d| (d.doc_id, d.score)).collect(),
        profile,
    }
}

fn record_evaluation(profile: &mut Profile, outcome: PivotEvaluation) -> f32 {
    profile.docs_evaluated += 1;
    profile.postings_evaluated += outcome.postings_evaluated;
    if outcome.added_to_heap {
        profile.docs_added_to_heap += 1;
    }
    outcome.threshold
}

/// WAND, disjunctive, with optional negation tested before scoring.
#[allow(clippy::too_many_arguments)]
fn run_wand_or(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    negated_set: &mut ListSet,
    negated_arena: &mut [ListWrapper<'_>],
    has_negation: bool,
    heap: &mut MinHeap,
    scorer: &Scorer,
    config: &Config,
    profile: &mut Profile,
) {
    let mut theta = 0.0f32;
    loop {
        let (pivot, potential) = select_pivot_disjunctive(set, arena, theta, config.f);
        let Some(pivot_pos) = pivot else { break };
        profile.unique_pivots += 1;
        let d = set.docid_at(pivot_pos, arena);

        let negated = has_negation && {
            let hit = is_negated(negated_set, negated_arena, d);
            if hit {
                profile.negation_failed += 1;
            } else {
                profile.negation_passed += 1;
            }
            hit
        };

        if negated {
            forward_wand(set, arena, pivot_pos + 1, d + 1);
        } else if set.docid_at(0, arena) == d {
            let outcome =
                evaluate_pivot_wand(set, arena, heap, scorer, potential, theta, config.k.max(1));
            theta = record_evaluation(profile, outcome);
        } else {
            forward_wand(set, arena, pivot_pos, d);
        }
    }
}

/// WAND, conjunctive: no negation, terminates the moment any positive list
/// exhausts.
fn run_wand_and(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    config: &Config,
    profile: &mut Profile,
) {
    let cm = conjunctive_max(arena);
    let initial_len = set.len();
    let mut theta = 0.0f32;
    loop {
        let (pivot, potential) = select_pivot_conjunctive(set, cm);
        let Some(pivot_pos) = pivot else { break };
        profile.unique_pivots += 1;
        let d = set.docid_at(pivot_pos, arena);

        if set.docid_at(0, arena) == d {
            let outcome =
                evaluate_pivot_wand(set, arena, heap, scorer, potential, theta, config.k.max(1));
            theta = record_evaluation(profile, outcome);
        } else {
            forward_wand(set, arena, pivot_pos, d);
        }

        if set.len() != initial_len {
            break;
        }
    }
}

/// BMW, disjunctive, no negation.
fn run_bmw_or(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    config: &Config,
    profile: &mut Profile,
) {
    let mut theta = 0.0f32;
    loop {
        let (pivot, _) = select_pivot_disjunctive(set, arena, theta, config.f);
        let Some(pivot_pos) = pivot else { break };
        let d = set.docid_at(pivot_pos, arena);

        let (viable, refined) = block_max_test(set, arena, pivot_pos, theta, d);
        if !viable {
            forward_bmw(set, arena, pivot_pos, d);
            continue;
        }
        profile.unique_pivots += 1;

        if set.docid_at(0, arena) == d {
            let outcome =
                evaluate_pivot_bmw(set, arena, heap, scorer, refined, theta, config.k.max(1));
            theta = record_evaluation(profile, outcome);
        } else {
            forward_wand(set, arena, pivot_pos, d);
        }
    }
}

/// BMW, disjunctive, negation tested after the block-max candidate test.
#[allow(clippy::too_many_arguments)]
fn run_bmw_or_v1(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    negated_set: &mut ListSet,
    negated_arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    config: &Config,
    profile: &mut Profile,
) {
    let mut theta = 0.0f32;
    loop {
        let (pivot, _) = select_pivot_disjunctive(set, arena, theta, config.f);
        let Some(pivot_pos) = pivot else { break };
        let d = set.docid_at(pivot_pos, arena);

        let (viable, refined) = block_max_test(set, arena, pivot_pos, theta, d);
        if !viable {
            forward_bmw(set, arena, pivot_pos, d);
            continue;
        }
        profile.unique_pivots += 1;

        let negated = is_negated(negated_set, negated_arena, d);
        if negated {
            profile.negation_failed += 1;
        } else {
            profile.negation_passed += 1;
        }

        if negated {
            forward_wand(set, arena, pivot_pos + 1, d + 1);
        } else if set.docid_at(0, arena) == d {
            let outcome =
                evaluate_pivot_bmw(set, arena, heap, scorer, refined, theta, config.k.max(1));
            theta = record_evaluation(profile, outcome);
        } else {
            forward_wand(set, arena, pivot_pos, d);
        }
    }
}

/// BMW, disjunctive, negation tested before the block-max candidate test.
#[allow(clippy::too_many_arguments)]
fn run_bmw_or_v2(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    negated_set: &mut ListSet,
    negated_arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    config: &Config,
    profile: &mut Profile,
) {
    let mut theta = 0.0f32;
    loop {
        let (pivot, _) = select_pivot_disjunctive(set, arena, theta, config.f);
        let Some(pivot_pos) = pivot else { break };
        let d = set.docid_at(pivot_pos, arena);

        let negated = is_negated(negated_set, negated_arena, d);
        if negated {
            profile.negation_failed += 1;
            forward_wand(set, arena, pivot_pos + 1, d + 1);
            continue;
        }
        profile.negation_passed += 1;

        let (viable, refined) = block_max_test(set, arena, pivot_pos, theta, d);
        if !viable {
            forward_bmw(set, arena, pivot_pos, d);
            continue;
        }
        profile.unique_pivots += 1;

        if set.docid_at(0, arena) == d {
            let outcome =
                evaluate_pivot_bmw(set, arena, heap, scorer, refined, theta, config.k.max(1));
            theta = record_evaluation(profile, outcome);
        } else {
            forward_wand(set, arena, pivot_pos, d);
        }
    }
}

/// BMW, conjunctive: no negation, terminates the moment any positive list
/// exhausts.
fn run_bmw_and(
    set: &mut ListSet,
    arena: &mut [ListWrapper<'_>],
    heap: &mut MinHeap,
    scorer: &Scorer,
    config: &Config,
    profile: &mut Profile,
) {
    let cm = conjunctive_max(arena);
    let initial_len = set.len();
    let mut theta = 0.0f32;
    loop {
        let (pivot, _) = select_pivot_conjunctive(set, cm);
        let Some(pivot_pos) = pivot else { break };
        let d = set.docid_at(pivot_pos, arena);

        let (viable, refined) = block_max_test(set, arena, pivot_pos, theta, d);
        if !viable {
            forward_bmw(set, arena, pivot_pos, d);
            if set.len() != initial_len {
                break;
            }
            continue;
        }
        profile.unique_pivots += 1;

        if set.docid_at(0, arena) == d {
            let outcome =
                evaluate_pivot_bmw(set, arena, heap, scorer, refined, theta, config.k.max(1));
            theta = record_evaluation(profile, outcome);
        } else {
            forward_wand(set, arena, pivot_pos, d);
        }

        if set.len() != initial_len {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PostingsForm;

    /// The toy three-list index from the crate's worked examples: list A at
    /// docids 1,3,5,7; list B at 2,3,6; list C at 3,4,5; uniform freq=1.
    fn toy_index() -> Index {
        Index::from_postings(
            vec![
                vec![(1, 1), (3, 1), (5, 1), (7, 1)],
                vec![(2, 1), (3, 1), (6, 1)],
                vec![(3, 1), (4, 1), (5, 1)],
            ],
            vec![1; 8],
            PostingsForm::Quantized,
        )
    }

    fn query(terms: &[(u64, bool)]) -> Query {
        Query {
            qry_id: 1,
            tokens: terms
                .iter()
                .map(|&(term_id, negated)| crate::query::QueryToken {
                    term_id,
                    count: 1,
                    negated,
                })
                .collect(),
        }
    }

    #[test]
    fn wand_or_matches_the_worked_example() {
        let index = toy_index();
        let q = query(&[(0, false), (1, false), (2, false)]);
        let config = Config {
            k: 3,
            index_form: IndexForm::Wand,
            traversal: Traversal::Or,
            version_two: false,
            f: 1.0,
        };
        let result = run_query(&index, &q, &config);
        // docs 1, 2, 4, 6, 7 all score 1.0 under this index; which one
        // survives the tie at rank 3 depends on evaluation order, not just
        // final score, since pruning never visits every tied candidate.
        assert_eq!(result.results[0], (3, 3.0));
        assert_eq!(result.results[1], (5, 2.0));
        assert_eq!(result.results[2].1, 1.0);
    }

    #[test]
    fn wand_and_matches_the_worked_example() {
        let index = toy_index();
        let q = query(&[(0, false), (1, false), (2, false)]);
        let config = Config {
            k: 3,
            index_form: IndexForm::Wand,
            traversal: Traversal::And,
            version_two: false,
            f: 1.0,
        };
        let result = run_query(&index, &q, &config);
        assert_eq!(result.results, vec![(3, 3.0)]);
    }

    #[test]
    fn bmw_or_matches_the_worked_example() {
        let index = toy_index();
        let q = query(&[(0, false), (1, false)]);
        let config = Config {
            k: 2,
            index_form: IndexForm::Bmw,
            traversal: Traversal::Or,
            version_two: false,
            f: 1.0,
        };
        let result = run_query(&index, &q, &config);
        assert_eq!(result.results[0], (3, 2.0));
        assert_eq!(result.results[1].1, 1.0);
    }

    #[test]
    fn wand_or_with_negation_excludes_the_negated_docid() {
        let index = toy_index();
        let q = query(&[(0, false), (1, true)]);
        let config = Config {
            k: 4,
            index_form: IndexForm::Wand,
            traversal: Traversal::Or,
            version_two: false,
            f: 1.0,
        };
        let result = run_query(&index, &q, &config);
        let mut docids: Vec<u64> = result.results.iter().map(|&(d, _)| d).collect();
        docids.sort();
        assert_eq!(docids, vec![1, 5, 7]);
    }

    #[test]
    fn wand_or_and_bmw_or_agree_under_f_equal_one() {
        let index = toy_index();
        let q = query(&[(0, false), (1, false), (2, false)]);
        let wand_cfg = Config {
            k: 3,
            index_form: IndexForm::Wand,
            traversal: Traversal::Or,
            version_two: false,
            f: 1.0,
        };
        let bmw_cfg = Config {
            index_form: IndexForm::Bmw,
            ..wand_cfg
        };
        let wand_result = run_query(&index, &q, &wand_cfg);
        let bmw_result = run_query(&index, &q, &bmw_cfg);
        assert_eq!(wand_result.results, bmw_result.results);
    }

    #[test]
    fn bmw_or_v1_and_v2_agree_under_negation() {
        let index = toy_index();
        let q = query(&[(0, false), (2, false), (1, true)]);
        let v1_cfg = Config {
            k: 4,
            index_form: IndexForm::Bmw,
            traversal: Traversal::Or,
            version_two: false,
            f: 1.0,
        };
        let v2_cfg = Config {
            version_two: true,
            ..v1_cfg
        };
        let v1_result = run_query(&index, &q, &v1_cfg);
        let v2_result = run_query(&index, &q, &v2_cfg);
        assert_eq!(v1_result.results, v2_result.results);
    }

    #[test]
    fn k_larger_than_union_returns_the_entire_union_scored() {
        let index = toy_index();
        let q = query(&[(0, false), (1, false), (2, false)]);
        let config = Config {
            k: 100,
            index_form: IndexForm::Bmw,
            traversal: Traversal::Or,
            version_two: false,
            f: 1.0,
        };
        let result = run_query(&index, &q, &config);
        // union of {1,3,5,7} u {2,3,6} u {3,4,5} has 6 distinct docids
        assert_eq!(result.results.len(), 6);
    }

    #[test]
    fn conjunctive_traversal_only_returns_docids_in_every_list() {
        let index = toy_index();
        let q = query(&[(0, false), (1, false), (2, false)]);
        let config = Config {
            k: 10,
            index_form: IndexForm::Bmw,
            traversal: Traversal::And,
            version_two: false,
            f: 1.0,
        };
        let result = run_query(&index, &q, &config);
        assert_eq!(result.results, vec![(3, 3.0)]);
    }

    #[test]
    fn empty_positive_term_set_returns_no_results() {
        let index = toy_index();
        let q = Query {
            qry_id: 1,
            tokens: vec![],
        };
        let config = Config::default();
        let result = run_query(&index, &q, &config);
        assert!(result.results.is_empty());
    }

    #[test]
    fn profile_counts_at_least_one_evaluated_document() {
        let index = toy_index();
        let q = query(&[(0, false), (1, false), (2, false)]);
        let config = Config {
            k: 3,
            ..Config::default()
        };
        let result = run_query(&index, &q, &config);
        assert!(result.profile.docs_evaluated >= 3);
        assert!(result.profile.docs_added_to_heap >= 3);
        assert_eq!(result.profile.final_threshold, 1.0);
    }
}
