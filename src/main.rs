//! AIKnowSys CLI entry point.

use aiknowsys::cli::commands;
use aiknowsys::cli::{Cli, Commands};
use aiknowsys::error::Error;
use clap::Parser;
use std::process::ExitCode;

/// Rewrite named flags to positional args for agent ergonomics.
///
/// Agents naturally generate `--id PLAN_x` instead of positional
/// `PLAN_x`. This preprocessor transparently converts the flag forms
/// so both work.
fn preprocess_args(args: impl Iterator<Item = String>) -> Vec<String> {
    // Only flags that never appear as real named args anywhere in the
    // CLI may be aliased; everything else must stay untouched.
    const POSITIONAL_ALIASES: &[&str] = &[
        "--id",    // plan show/activate/pause/complete/cancel/append,
                   // pattern add/replace/show
        "--query", // search
    ];

    let mut result = Vec::new();
    let mut iter = args.peekable();

    while let Some(arg) = iter.next() {
        if POSITIONAL_ALIASES.contains(&arg.as_str()) {
            // Strip the flag, keep the value
            if let Some(value) = iter.next() {
                result.push(value);
            }
        } else if let Some(flag) = POSITIONAL_ALIASES
            .iter()
            .find(|f| arg.starts_with(&format!("{f}=")))
        {
            // Handle --flag=value form
            result.push(arg[flag.len() + 1..].to_string());
        } else {
            result.push(arg);
        }
    }

    result
}

fn main() -> ExitCode {
    let args = preprocess_args(std::env::args());
    let cli = Cli::parse_from(args);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let opts = cli.storage_options()?;
    let author = cli.author.as_deref();

    match &cli.command {
        Commands::Init { backend, force } => {
            commands::init::execute(backend, *force, &opts, json)
        }
        Commands::Version => commands::version::execute(json),

        Commands::Session { command } => {
            commands::session::execute(command, &opts, author, json)
        }
        Commands::Plan { command } => commands::plan::execute(command, &opts, author, json),
        Commands::Pattern { command } => commands::pattern::execute(command, &opts, json),

        Commands::Search(args) => commands::search::execute(args, &opts, json),
        Commands::Index { command } => commands::index::execute(command, &opts, json),

        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prep(args: &[&str]) -> Vec<String> {
        preprocess_args(args.iter().map(ToString::to_string))
    }

    #[test]
    fn test_positional_alias_stripped() {
        assert_eq!(
            prep(&["aks", "plan", "show", "--id", "PLAN_x"]),
            vec!["aks", "plan", "show", "PLAN_x"]
        );
        assert_eq!(
            prep(&["aks", "search", "--query=cache"]),
            vec!["aks", "search", "cache"]
        );
    }

    #[test]
    fn test_other_flags_untouched() {
        assert_eq!(
            prep(&["aks", "session", "update", "--date", "2026-08-20"]),
            vec!["aks", "session", "update", "--date", "2026-08-20"]
        );
    }
}
