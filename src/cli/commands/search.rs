//! Search command implementation.

use colored::Colorize;

use crate::cli::SearchArgs;
use crate::error::{Error, Result};
use crate::model::EntityKind;
use crate::query::SearchOptions;
use crate::storage::{self, StorageOptions};

fn parse_kind(s: &str) -> Result<EntityKind> {
    match s {
        "session" => Ok(EntityKind::Session),
        "plan" => Ok(EntityKind::Plan),
        "learned" | "pattern" => Ok(EntityKind::Learned),
        _ => Err(Error::Validation(format!(
            "unknown entity type '{s}' (expected session, plan, learned)"
        ))),
    }
}

/// Execute the search command.
pub fn execute(args: &SearchArgs, opts: &StorageOptions, json: bool) -> Result<()> {
    let kinds = if args.kinds.is_empty() {
        None
    } else {
        Some(
            args.kinds
                .iter()
                .map(|k| parse_kind(k))
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let search_opts = SearchOptions {
        limit: args.limit,
        kinds,
    };

    let storage = storage::open_storage(opts)?;
    let hits = storage.search(&args.query, &search_opts)?;

    if json {
        let output = serde_json::json!({
            "count": hits.len(),
            "results": hits,
        });
        println!("{output}");
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matches for \"{}\".", args.query);
        return Ok(());
    }

    println!("Matches for \"{}\" ({} found):", args.query, hits.len());
    for hit in &hits {
        println!(
            "  [{:>2}] {} {}  {}",
            hit.score,
            hit.kind.as_str().cyan(),
            hit.id.bold(),
            hit.title
        );
        if !hit.snippet.is_empty() {
            println!("       {}", hit.snippet.dimmed());
        }
    }

    Ok(())
}
