//! End-to-end tests over the public surface: dictionary/query parsing,
//! index serialization, and all six main loops. The pure algorithmic
//! modules (pivot selection, heap, cursor) carry their own fast
//! `#[cfg(test)]` unit tests next to the code; this file is reserved for
//! the I/O-bound and whole-pipeline scenarios.
//! Use: cargo test

use std::fs;
use std::path::PathBuf;

use blockwand::index::{Index, PostingsForm};
use blockwand::processor::{run_query, Config, IndexForm, Traversal};
use blockwand::query::{parse_queries, Dictionary, Query, QueryToken};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "blockwand-test-{name}-{:?}",
        std::thread::current().id()
    ))
}

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
            .map(|&(term_id, negated)| QueryToken {
                term_id,
                count: 1,
                negated,
            })
            .collect(),
    }
}

#[test]
/// saving and loading an index preserves every list's postings exactly
fn test_01_save_and_load_index_round_trips() {
    let index = Index::from_postings(
        vec![vec![(1, 2), (3, 1), (4, 5)], vec![(2, 1), (3, 4)]],
        vec![10, 20, 15, 8, 12],
        PostingsForm::Frequency,
    );
    let path = scratch_path("round-trip");
    index.save(&path).unwrap();
    let loaded = Index::load(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(loaded.term_count(), index.term_count());
    assert_eq!(loaded.indexed_doc_count(), index.indexed_doc_count());
    assert_eq!(loaded.postings_form(), index.postings_form());
}

#[test]
/// running the same query against an index before and after a save/load
/// cycle returns byte-identical results
fn test_02_round_trip_preserves_query_results() {
    let index = toy_index();
    let path = scratch_path("query-round-trip");
    index.save(&path).unwrap();
    let loaded = Index::load(&path).unwrap();
    let _ = fs::remove_file(&path);

    let q = query(&[(0, false), (1, false), (2, false)]);
    let config = Config::default();
    let before = run_query(&index, &q, &config);
    let after = run_query(&loaded, &q, &config);
    assert_eq!(before.results, after.results);
}

#[test]
/// a dictionary file and a query file parse into the expected tokens,
/// with unknown terms dropped under lenient mode and negation preserved
fn test_03_dictionary_and_query_file_parsing() {
    let dict_path = scratch_path("dictionary");
    fs::write(&dict_path, "cat 0\ndog 1\nfish 2\n").unwrap();
    let queries_path = scratch_path("queries");
    fs::write(&queries_path, "7;cat -dog\n8;cat bird fish\n").unwrap();

    let dictionary = Dictionary::load(&dict_path).unwrap();
    let queries = parse_queries(&dictionary, &queries_path, false, false).unwrap();
    let _ = fs::remove_file(&dict_path);
    let _ = fs::remove_file(&queries_path);

    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].qry_id, 7);
    assert_eq!(queries[0].positive_terms().count(), 1);
    assert_eq!(queries[0].negated_terms().count(), 1);
    assert_eq!(queries[1].tokens.len(), 2); // "bird" is unknown and dropped
}

#[test]
/// strict mode drops an entire query when any of its terms is unknown
fn test_04_strict_mode_drops_whole_query_on_unknown_term() {
    let dict_path = scratch_path("dictionary-strict");
    fs::write(&dict_path, "cat 0\ndog 1\n").unwrap();
    let queries_path = scratch_path("queries-strict");
    fs::write(&queries_path, "1;cat bird\n2;cat dog\n").unwrap();

    let dictionary = Dictionary::load(&dict_path).unwrap();
    let queries = parse_queries(&dictionary, &queries_path, true, false).unwrap();
    let _ = fs::remove_file(&dict_path);
    let _ = fs::remove_file(&queries_path);

    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].qry_id, 2);
}

#[test]
/// conflicting negation on the same term within one query line is a
/// hard parse error regardless of strict mode
fn test_05_conflicting_negation_is_a_hard_error() {
    let dict_path = scratch_path("dictionary-conflict");
    fs::write(&dict_path, "cat 0\n").unwrap();
    let queries_path = scratch_path("queries-conflict");
    fs::write(&queries_path, "1;cat -cat\n").unwrap();

    let dictionary = Dictionary::load(&dict_path).unwrap();
    let err = parse_queries(&dictionary, &queries_path, false, false).unwrap_err();
    let _ = fs::remove_file(&dict_path);
    let _ = fs::remove_file(&queries_path);

    assert!(matches!(
        err,
        blockwand::error::Error::ConflictingNegation { qry_id: 1, term_id: 0 }
    ));
}

#[test]
/// all six main loops agree with each other wherever their guarantees
/// overlap: WAND-OR and BMW-OR are byte-identical under F=1, and the two
/// BMW-OR negation orderings are byte-identical under any negation pattern
fn test_06_wand_and_bmw_agree_across_index_forms_and_negation_orderings() {
    let index = toy_index();

    let q_all = query(&[(0, false), (1, false), (2, false)]);
    let wand_or = Config {
        k: 3,
        index_form: IndexForm::Wand,
        traversal: Traversal::Or,
        version_two: false,
        f: 1.0,
    };
    let bmw_or = Config {
        index_form: IndexForm::Bmw,
        ..wand_or
    };
    assert_eq!(
        run_query(&index, &q_all, &wand_or).results,
        run_query(&index, &q_all, &bmw_or).results
    );

    let q_negated = query(&[(0, false), (2, false), (1, true)]);
    let v1 = Config {
        k: 4,
        index_form: IndexForm::Bmw,
        traversal: Traversal::Or,
        version_two: false,
        f: 1.0,
    };
    let v2 = Config {
        version_two: true,
        ..v1
    };
    assert_eq!(
        run_query(&index, &q_negated, &v1).results,
        run_query(&index, &q_negated, &v2).results
    );
}

#[test]
/// conjunctive traversal returns only docids present in every queried
/// positive list, and terminates as soon as a list is exhausted
fn test_07_conjunctive_traversal_only_returns_intersection_members() {
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
/// a conjunctive query over lists with no common docid returns no results
fn test_08_conjunctive_traversal_with_empty_intersection_returns_nothing() {
    let index = Index::from_postings(
        vec![vec![(1, 1), (2, 1)], vec![(3, 1), (4, 1)]],
        vec![1; 5],
        PostingsForm::Quantized,
    );
    let q = query(&[(0, false), (1, false)]);
    let config = Config {
        index_form: IndexForm::Wand,
        traversal: Traversal::And,
        ..Config::default()
    };
    let result = run_query(&index, &q, &config);
    assert!(result.results.is_empty());
}

#[test]
/// negation excludes every docid present in the negated list, leaving
/// only the positive list's remaining docids in the result
fn test_09_negation_excludes_negated_docids_end_to_end() {
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
/// a BM25-scored index (not just the quantized-impact toy index) returns
/// a sensibly ordered top-k: the doc hit by every term outranks docs hit
/// by only one
fn test_10_bm25_scored_index_orders_by_relevance() {
    let index = Index::from_postings(
        vec![vec![(0, 3), (1, 1)], vec![(0, 2), (2, 4)]],
        vec![50, 40, 60],
        PostingsForm::Frequency,
    );
    let q = query(&[(0, false), (1, false)]);
    let config = Config::default();
    let result = run_query(&index, &q, &config);
    assert_eq!(result.results[0].0, 0);
    assert_eq!(result.results.len(), 3);
}

#[test]
/// k larger than the union of all positive lists returns the whole union,
/// fully scored, still capped by the heap's declared capacity
fn test_11_k_larger_than_union_returns_the_whole_union() {
    let index = toy_index();
    let q = query(&[(0, false), (1, false), (2, false)]);
    let config = Config {
        k: 100,
        ..Config::default()
    };
    let result = run_query(&index, &q, &config);
    assert_eq!(result.results.len(), 6);
}

#[test]
/// the profile returned alongside a query's results reports a final
/// threshold matching the heap's lowest kept score once the heap is full
fn test_12_profile_final_threshold_matches_lowest_kept_score() {
    let index = toy_index();
    let q = query(&[(0, false), (1, false), (2, false)]);
    let config = Config {
        k: 3,
        ..Config::default()
    };
    let result = run_query(&index, &q, &config);
    let lowest_kept = result
        .results
        .iter()
        .map(|&(_, score)| score)
        .fold(f32::INFINITY, f32::min);
    assert_eq!(result.profile.final_threshold, lowest_kept);
    assert!(result.profile.docs_evaluated > 0);
}

#[test]
/// an empty query (no positive terms) returns no results without
/// touching any postings list
fn test_13_empty_query_returns_no_results() {
    let index = toy_index();
    let q = Query {
        qry_id: 1,
        tokens: vec![],
    };
    let result = run_query(&index, &q, &Config::default());
    assert!(result.results.is_empty());
    assert_eq!(result.profile.docs_evaluated, 0);
}
