//! Session command implementations.

use chrono::Utc;
use colored::Colorize;

use crate::cli::{SessionCommands, SessionListArgs, SessionUpdateArgs};
use crate::error::{Error, Result};
use crate::model::{Session, SessionStatus};
use crate::mutation::{parse_strict_date, MutationEngine, SectionEdit, SessionUpdate};
use crate::query::SessionFilter;
use crate::storage::{self, StorageOptions};

/// Execute session commands.
pub fn execute(
    command: &SessionCommands,
    opts: &StorageOptions,
    author: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        SessionCommands::Create {
            title,
            date,
            topics,
        } => create(title, date.as_deref(), topics.clone(), opts, author, json),
        SessionCommands::Update(args) => update(args, opts, author, json),
        SessionCommands::List(args) => list(args, opts, json),
        SessionCommands::Show { date } => show(date.as_deref(), opts, json),
    }
}

fn create(
    title: &str,
    date: Option<&str>,
    topics: Vec<String>,
    opts: &StorageOptions,
    author: Option<&str>,
    json: bool,
) -> Result<()> {
    let date = match date {
        Some(raw) => parse_strict_date(raw)?,
        None => Utc::now().date_naive(),
    };
    let author = crate::config::default_author(author);

    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let (session, created) = engine.create_session(date, title, &author, topics)?;

    if json {
        let output = serde_json::json!({
            "date": session.date,
            "title": session.title,
            "author": session.author,
            "created": created,
        });
        println!("{output}");
    } else if created {
        println!("Created session {} \"{}\"", session.date, session.title);
    } else {
        println!(
            "Session {} already exists (\"{}\"), no changes made",
            session.date, session.title
        );
    }

    Ok(())
}

/// Resolve the body edit from the mutually exclusive edit flags.
fn edit_from_args(args: &SessionUpdateArgs) -> Result<Option<SectionEdit>> {
    if let Some(content) = &args.append {
        return Ok(Some(SectionEdit::Append {
            section: args.section.clone(),
            content: content.clone(),
        }));
    }
    if let Some(content) = &args.prepend {
        return Ok(Some(SectionEdit::Prepend {
            section: args.section.clone(),
            content: content.clone(),
        }));
    }
    if let Some(pattern) = &args.insert_after {
        let content = args.content.clone().ok_or_else(|| {
            Error::Validation("--insert-after requires --content".to_string())
        })?;
        return Ok(Some(SectionEdit::InsertAfter {
            pattern: pattern.clone(),
            section: args.section.clone(),
            content,
        }));
    }
    if let Some(pattern) = &args.insert_before {
        let content = args.content.clone().ok_or_else(|| {
            Error::Validation("--insert-before requires --content".to_string())
        })?;
        return Ok(Some(SectionEdit::InsertBefore {
            pattern: pattern.clone(),
            section: args.section.clone(),
            content,
        }));
    }
    Ok(None)
}

fn update(
    args: &SessionUpdateArgs,
    opts: &StorageOptions,
    author: Option<&str>,
    json: bool,
) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(|s| {
            SessionStatus::parse(s).ok_or_else(|| {
                Error::Validation(format!(
                    "unknown session status '{s}' (expected in-progress, complete, abandoned)"
                ))
            })
        })
        .transpose()?;

    let update = SessionUpdate {
        date: args.date.clone(),
        author: author.map(ToString::to_string),
        title: args.title.clone(),
        add_topics: args.topics.clone(),
        plan: args.plan.clone(),
        status,
        edit: edit_from_args(args)?,
    };

    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let session = engine.update_session(&update)?;

    if json {
        let output = serde_json::json!({
            "date": session.date,
            "title": session.title,
            "status": session.status,
            "updated": session.updated,
        });
        println!("{output}");
    } else {
        println!("Updated session {}", session.date);
    }

    Ok(())
}

fn list(args: &SessionListArgs, opts: &StorageOptions, json: bool) -> Result<()> {
    let filter = SessionFilter {
        days: args.days,
        date_after: args.after.as_deref().map(parse_strict_date).transpose()?,
        date_before: args.before.as_deref().map(parse_strict_date).transpose()?,
        topic: args.topic.clone(),
        author: args.by.clone(),
        plan: args.plan.clone(),
        detail: args.detail.into(),
        limit: args.limit,
        offset: args.offset,
    };

    let storage = storage::open_storage(opts)?;
    let result = storage.query_sessions(&filter)?;

    if json {
        println!("{}", serde_json::to_string(&result)?);
        return Ok(());
    }

    if let Some(preview) = &result.preview {
        println!("{} sessions", result.count);
        if let Some((from, to)) = preview.date_range {
            println!("  Range: {from} to {to}");
        }
        if !preview.top_topics.is_empty() {
            println!("  Topics: {}", preview.top_topics.join(", "));
        }
        return Ok(());
    }

    if result.count == 0 {
        println!("No sessions found.");
        return Ok(());
    }

    println!("Sessions ({} found):", result.count);
    for view in &result.sessions {
        let status = status_badge(view.meta.status);
        println!(
            "  {}  {}  {} [{}]",
            view.meta.date,
            status,
            view.meta.title,
            view.meta.author
        );
        if !view.meta.topics.is_empty() {
            println!("      topics: {}", view.meta.topics.join(", "));
        }
        if let Some(content) = &view.content {
            for line in content.lines() {
                println!("      {line}");
            }
        }
    }

    Ok(())
}

fn show(date: Option<&str>, opts: &StorageOptions, json: bool) -> Result<()> {
    let storage = storage::open_storage(opts)?;
    let session = match date {
        Some(raw) => {
            let parsed = parse_strict_date(raw)?;
            storage
                .load_session(parsed)?
                .ok_or_else(|| Error::SessionNotFound {
                    date: Some(raw.to_string()),
                })?
        }
        None => storage
            .latest_session(None)?
            .ok_or(Error::SessionNotFound { date: None })?,
    };

    if json {
        println!("{}", serde_json::to_string(&session)?);
        return Ok(());
    }

    print_session(&session);
    Ok(())
}

fn print_session(session: &Session) {
    println!(
        "{}  {}  {} [{}]",
        session.date,
        status_badge(session.status),
        session.title.bold(),
        session.author
    );
    if let Some(plan) = &session.plan {
        println!("Plan: {plan}");
    }
    if !session.topics.is_empty() {
        println!("Topics: {}", session.topics.join(", "));
    }
    println!();
    println!("{}", session.content);
}

fn status_badge(status: SessionStatus) -> colored::ColoredString {
    match status {
        SessionStatus::InProgress => status.as_str().yellow(),
        SessionStatus::Complete => status.as_str().green(),
        SessionStatus::Abandoned => status.as_str().red(),
    }
}
