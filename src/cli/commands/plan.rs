//! Plan command implementations.

use colored::Colorize;

use crate::cli::{PlanCommands, PlanListArgs};
use crate::error::{Error, Result};
use crate::model::{Plan, PlanStatus};
use crate::mutation::{parse_strict_date, MutationEngine};
use crate::query::PlanFilter;
use crate::storage::{self, StorageOptions};

/// Execute plan commands.
pub fn execute(
    command: &PlanCommands,
    opts: &StorageOptions,
    author: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        PlanCommands::Create { title, topics } => {
            create(title, topics.clone(), opts, author, json)
        }
        PlanCommands::List(args) => list(args, opts, json),
        PlanCommands::Show { id } => show(id, opts, json),
        PlanCommands::Activate { id } => transition(id, PlanStatus::Active, opts, json),
        PlanCommands::Pause { id } => transition(id, PlanStatus::Paused, opts, json),
        PlanCommands::Complete { id } => transition(id, PlanStatus::Complete, opts, json),
        PlanCommands::Cancel { id } => transition(id, PlanStatus::Cancelled, opts, json),
        PlanCommands::Append { id, content } => note(id, content, false, opts, json),
        PlanCommands::Prepend { id, content } => note(id, content, true, opts, json),
        PlanCommands::Current => current(opts, author, json),
    }
}

fn create(
    title: &str,
    topics: Vec<String>,
    opts: &StorageOptions,
    author: Option<&str>,
    json: bool,
) -> Result<()> {
    let author = crate::config::default_author(author);

    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let plan = engine.create_plan(title, &author, topics)?;

    if json {
        let output = serde_json::json!({
            "id": plan.id,
            "title": plan.title,
            "status": plan.status,
            "author": plan.author,
        });
        println!("{output}");
    } else {
        println!("Created plan {} \"{}\"", plan.id, plan.title);
        println!("  Status: {}", status_badge(plan.status));
    }

    Ok(())
}

fn list(args: &PlanListArgs, opts: &StorageOptions, json: bool) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(|s| {
            PlanStatus::parse(s).ok_or_else(|| {
                Error::Validation(format!(
                    "unknown plan status '{s}' (expected PLANNED, ACTIVE, PAUSED, \
                     COMPLETE, CANCELLED)"
                ))
            })
        })
        .transpose()?;

    let filter = PlanFilter {
        status,
        author: args.by.clone(),
        topic: args.topic.clone(),
        date_after: args.after.as_deref().map(parse_strict_date).transpose()?,
        date_before: args.before.as_deref().map(parse_strict_date).transpose()?,
        title_contains: args.title.clone(),
        detail: args.detail.into(),
        limit: args.limit,
        offset: args.offset,
    };

    let storage = storage::open_storage(opts)?;
    let result = storage.query_plans(&filter)?;

    if json {
        println!("{}", serde_json::to_string(&result)?);
        return Ok(());
    }

    if let Some(preview) = &result.preview {
        println!("{} plans", result.count);
        if let Some((from, to)) = preview.date_range {
            println!("  Updated: {from} to {to}");
        }
        if !preview.top_topics.is_empty() {
            println!("  Topics: {}", preview.top_topics.join(", "));
        }
        return Ok(());
    }

    if result.count == 0 {
        println!("No plans found.");
        return Ok(());
    }

    println!("Plans ({} found):", result.count);
    for view in &result.plans {
        println!(
            "  {}  {}  {} [{}]",
            status_badge(view.meta.status),
            view.meta.id,
            view.meta.title,
            view.meta.author
        );
        if let Some(content) = &view.content {
            for line in content.lines() {
                println!("      {line}");
            }
        }
    }

    Ok(())
}

fn show(id: &str, opts: &StorageOptions, json: bool) -> Result<()> {
    let storage = storage::open_storage(opts)?;
    let plan = storage
        .load_plan(id)?
        .ok_or_else(|| Error::PlanNotFound { id: id.to_string() })?;

    if json {
        println!("{}", serde_json::to_string(&plan)?);
        return Ok(());
    }

    print_plan(&plan);
    Ok(())
}

fn transition(id: &str, to: PlanStatus, opts: &StorageOptions, json: bool) -> Result<()> {
    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let plan = engine.set_plan_status(id, to)?;

    if json {
        let output = serde_json::json!({
            "id": plan.id,
            "status": plan.status,
            "started": plan.started,
            "completed": plan.completed,
        });
        println!("{output}");
    } else {
        println!("Plan {} is now {}", plan.id, status_badge(plan.status));
    }

    Ok(())
}

fn note(id: &str, content: &str, prepend: bool, opts: &StorageOptions, json: bool) -> Result<()> {
    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let plan = if prepend {
        engine.prepend_progress(id, content)?
    } else {
        engine.append_progress(id, content)?
    };

    if json {
        let output = serde_json::json!({
            "id": plan.id,
            "updated": plan.updated,
        });
        println!("{output}");
    } else if prepend {
        println!("Prepended progress to {}", plan.id);
    } else {
        println!("Appended progress to {}", plan.id);
    }

    Ok(())
}

fn current(opts: &StorageOptions, author: Option<&str>, json: bool) -> Result<()> {
    let author = crate::config::default_author(author);

    let mut storage = storage::open_storage(opts)?;
    let mut engine = MutationEngine::new(storage.as_mut());
    let pointer = engine.current_plan(&author)?;

    if json {
        let output = match &pointer {
            Some((p, plan)) => serde_json::json!({
                "author": p.author,
                "plan": p.current_plan_id,
                "status": p.status,
                "title": plan.as_ref().map(|pl| pl.title.clone()),
            }),
            None => serde_json::json!({ "author": author, "plan": null }),
        };
        println!("{output}");
        return Ok(());
    }

    match pointer {
        Some((_, Some(plan))) => {
            println!(
                "Current plan for {}: {} \"{}\" ({})",
                author,
                plan.id,
                plan.title,
                status_badge(plan.status)
            );
        }
        Some((p, None)) => match p.current_plan_id {
            // Pointer references a plan whose file/row is gone.
            Some(id) => println!("Current plan for {author}: {id} (missing, run `aks index rebuild`)"),
            None => println!("No active plan for {author}."),
        },
        None => println!("No active plan for {author}."),
    }

    Ok(())
}

fn print_plan(plan: &Plan) {
    println!(
        "{}  {}  {} [{}]",
        status_badge(plan.status),
        plan.id,
        plan.title.bold(),
        plan.author
    );
    if !plan.topics.is_empty() {
        println!("Topics: {}", plan.topics.join(", "));
    }
    if let Some(started) = plan.started {
        println!("Started: {started}");
    }
    if let Some(completed) = plan.completed {
        println!("Finished: {completed}");
    }
    println!();
    println!("{}", plan.content);
}

fn status_badge(status: PlanStatus) -> colored::ColoredString {
    match status {
        PlanStatus::Planned => status.as_str().blue(),
        PlanStatus::Active => status.as_str().green(),
        PlanStatus::Paused => status.as_str().yellow(),
        PlanStatus::Complete => status.as_str().cyan(),
        PlanStatus::Cancelled => status.as_str().red(),
    }
}
