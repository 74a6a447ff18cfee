#![crate_name = "blockwand_cli"]

//! # `blockwand_cli`
//! A batch query runner over a [`blockwand`] index.
//! ### Command line parameters
//! ```text
//! dictionary=<path>   term dictionary (required)
//! index=<path>        serialized index (required)
//! queries=<path>      query file (required)
//! k=10                top-k cutoff
//! form=bmw            bmw | wand
//! traversal=or        or | and
//! f=1.0               theta-push multiplier
//! v2=false            BMW-OR negation ordering (v1 if false)
//! strict=false        drop a query if any token is unknown
//! int=false           treat every token as a bare integer term id
//! profile=false       print per-query profiling counters to stderr
//! ./blockwand_cli dictionary=dict.txt index=index.bin queries=queries.txt k=10
//! ```

use std::env;
use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;
use rayon::prelude::*;

use blockwand::error::Error;
use blockwand::index::Index;
use blockwand::processor::{run_query, Config, IndexForm, QueryResult, Traversal};
use blockwand::query::{parse_queries, Dictionary};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut params = HashMap::new();
    for arg in &args[1..] {
        if let Some((key, value)) = arg.split_once('=') {
            params.insert(key.trim().to_owned(), value.trim().to_owned());
        }
    }

    match run(&params) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "blockwand_cli error:".bright_red(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(params: &HashMap<String, String>) -> Result<(), Error> {
    let dictionary_path = require_path(params, "dictionary")?;
    let index_path = require_path(params, "index")?;
    let queries_path = require_path(params, "queries")?;

    let strict = flag(params, "strict");
    let int_mode = flag(params, "int");
    let profile = flag(params, "profile");
    let config = parse_config(params)?;

    println!("{} {}", "loading dictionary".yellow(), dictionary_path.display());
    let dictionary = Dictionary::load(&dictionary_path)?;
    println!("{} {}", "loading index".yellow(), index_path.display());
    let index = Index::load(&index_path)?;
    println!(
        "{} {} terms, {} documents",
        "index ready:".green(),
        index.term_count(),
        index.indexed_doc_count()
    );

    let queries = parse_queries(&dictionary, &queries_path, strict, int_mode)?;
    println!("{} {} queries", "running".green(), queries.len());

    let results: Vec<(u64, QueryResult)> = queries
        .par_iter()
        .map(|query| (query.qry_id, run_query(&index, query, &config)))
        .collect();

    for (qry_id, result) in &results {
        print_result(*qry_id, result);
        if profile {
            eprintln!("{qry_id}: {:?}", result.profile);
        }
    }

    Ok(())
}

fn print_result(qry_id: u64, result: &QueryResult) {
    let mut line = format!("{qry_id};");
    for (i, &(doc_id, score)) in result.results.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&format!("{doc_id}:{score}"));
    }
    println!("{line}");
}

fn require_path(params: &HashMap<String, String>, key: &str) -> Result<std::path::PathBuf, Error> {
    match params.get(key) {
        Some(value) => Ok(Path::new(value).to_path_buf()),
        None => Err(Error::Parse {
            context: "missing required CLI parameter",
            line: key.to_string(),
        }),
    }
}

fn flag(params: &HashMap<String, String>, key: &str) -> bool {
    params
        .get(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_config(params: &HashMap<String, String>) -> Result<Config, Error> {
    let k = params
        .get("k")
        .map(|v| v.parse::<usize>())
        .transpose()
        .map_err(|_| Error::Parse {
            context: "k",
            line: params.get("k").cloned().unwrap_or_default(),
        })?
        .unwrap_or(10);

    let index_form = match params.get("form").map(String::as_str).unwrap_or("bmw") {
        "bmw" => IndexForm::Bmw,
        "wand" => IndexForm::Wand,
        other => return Err(Error::InvalidRunType(other.to_string())),
    };

    let traversal = match params.get("traversal").map(String::as_str).unwrap_or("or") {
        "or" => Traversal::Or,
        "and" => Traversal::And,
        other => return Err(Error::InvalidRunType(other.to_string())),
    };

    let f = params
        .get("f")
        .map(|v| v.parse::<f32>())
        .transpose()
        .map_err(|_| Error::Parse {
            context: "f",
            line: params.get("f").cloned().unwrap_or_default(),
        })?
        .unwrap_or(1.0);

    Ok(Config {
        k,
        index_form,
        traversal,
        version_two: flag(params, "v2"),
        f,
    })
}
