//! Learned pattern command implementations.

use colored::Colorize;

use crate::cli::PatternCommands;
use crate::error::{Error, Result};
use crate::model::PatternCategory;
use crate::mutation::MutationEngine;
use crate::storage::{self, StorageOptions};

fn parse_category(s: &str) -> Result<PatternCategory> {
    PatternCategory::parse(s).ok_or_else(|| {
        Error::Validation(format!(
            "unknown pattern category '{s}' (expected error_resolution, \
             user_corrections, workarounds, debugging_techniques, project_specific)"
        ))
    })
}

/// Execute pattern commands.
pub fn execute(command: &PatternCommands, opts: &StorageOptions, json: bool) -> Result<()> {
    match command {
        PatternCommands::Add {
            id,
            category,
            title,
            keywords,
            content,
        } => add(id, category, title, keywords.clone(), content, opts, json),
        PatternCommands::Replace {
            id,
            content,
            title,
            keywords,
        } => replace(id, content, title.as_deref(), keywords.clone(), opts, json),
        PatternCommands::List { category } => list(category.as_deref(), opts, json),
        PatternCommands::Show { id } => show(id, opts, json),
    }
}

fn add(
    id: &str,
    category: &str,
    title: &str,
    keywords: Vec<String>,
    content: &str,
    opts: &StorageOptions,
    json: bool,
) -> Result<()> {
    let category = parse_category(category)?;

    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let pattern = engine.create_pattern(id, category, title, keywords, content)?;

    if json {
        let output = serde_json::json!({
            "id": pattern.id,
            "category": pattern.category,
            "status": pattern.status,
        });
        println!("{output}");
    } else {
        println!("Recorded pattern {} [{}]", pattern.id, pattern.category);
    }

    Ok(())
}

fn replace(
    id: &str,
    content: &str,
    title: Option<&str>,
    keywords: Option<Vec<String>>,
    opts: &StorageOptions,
    json: bool,
) -> Result<()> {
    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let pattern = engine.replace_pattern(id, title, keywords, content)?;

    if json {
        let output = serde_json::json!({
            "id": pattern.id,
            "updated": pattern.updated,
        });
        println!("{output}");
    } else {
        println!("Replaced pattern {}", pattern.id);
    }

    Ok(())
}

fn list(category: Option<&str>, opts: &StorageOptions, json: bool) -> Result<()> {
    let category = category.map(parse_category).transpose()?;

    let storage = storage::open_storage(opts)?;
    let patterns = storage.list_patterns(category)?;

    if json {
        let output = serde_json::json!({
            "count": patterns.len(),
            "patterns": patterns,
        });
        println!("{output}");
        return Ok(());
    }

    if patterns.is_empty() {
        println!("No patterns found.");
        return Ok(());
    }

    println!("Patterns ({} found):", patterns.len());
    for p in &patterns {
        println!("  {}  {} [{}]", p.id.bold(), p.title, p.category);
        if !p.keywords.is_empty() {
            println!("      keywords: {}", p.keywords.join(", "));
        }
    }

    Ok(())
}

fn show(id: &str, opts: &StorageOptions, json: bool) -> Result<()> {
    let storage = storage::open_storage(opts)?;
    let pattern = storage
        .load_pattern(id)?
        .ok_or_else(|| Error::Validation(format!("no pattern with id: {id}")))?;

    if json {
        println!("{}", serde_json::to_string(&pattern)?);
        return Ok(());
    }

    println!(
        "{}  {} [{} / {}]",
        pattern.id.bold(),
        pattern.title,
        pattern.category,
        pattern.status.as_str()
    );
    if !pattern.keywords.is_empty() {
        println!("Keywords: {}", pattern.keywords.join(", "));
    }
    println!();
    println!("{}", pattern.content);

    Ok(())
}
