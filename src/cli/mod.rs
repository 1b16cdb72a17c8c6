//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::query::DetailLevel;
use crate::storage::{AdapterKind, StorageOptions};

pub mod commands;

/// AIKnowSys CLI - Structured knowledge store for AI-assisted development
#[derive(Parser, Debug)]
#[command(name = "aks", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Knowledge-store directory (default: .aiknowsys at the git root)
    #[arg(long, global = true, env = "AIKNOWSYS_DIR")]
    pub dir: Option<PathBuf>,

    /// Storage backend (json, sqlite)
    #[arg(long, global = true)]
    pub adapter: Option<String>,

    /// SQLite database path (default: ~/.aiknowsys/data/aiknowsys.db)
    #[arg(long, global = true, env = "AIKNOWSYS_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Author identity (default: git user.name)
    #[arg(long, global = true, env = "AIKNOWSYS_AUTHOR")]
    pub author: Option<String>,

    /// Output as JSON (for agent integration)
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Backend options from the global flags.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAdapter` for an unknown `--adapter` value.
    pub fn storage_options(&self) -> crate::Result<StorageOptions> {
        let adapter = self
            .adapter
            .as_deref()
            .map(str::parse::<AdapterKind>)
            .transpose()?;
        Ok(StorageOptions {
            adapter,
            store_dir: self.dir.clone(),
            db_path: self.db.clone(),
        })
    }
}

/// Detail level for list/query commands.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetailArg {
    /// Aggregates only (count, date range, top topics)
    Preview,
    /// Metadata without body text (default)
    #[default]
    Metadata,
    /// Metadata plus full body text
    Full,
}

impl From<DetailArg> for DetailLevel {
    fn from(d: DetailArg) -> Self {
        match d {
            DetailArg::Preview => Self::Preview,
            DetailArg::Metadata => Self::Metadata,
            DetailArg::Full => Self::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a knowledge store
    Init {
        /// Storage backend to record in config.json (json, sqlite)
        #[arg(long, default_value = "json")]
        backend: String,

        /// Reinitialize over an existing store
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Session management
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },

    /// Learned pattern management
    Pattern {
        #[command(subcommand)]
        command: PatternCommands,
    },

    /// Ranked search across sessions, plans, and patterns
    Search(SearchArgs),

    /// Index maintenance
    Index {
        #[command(subcommand)]
        command: IndexCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Session Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Create today's session (idempotent per date)
    Create {
        /// Session title
        title: String,

        /// Session date (YYYY-MM-DD, default: today UTC)
        #[arg(short, long)]
        date: Option<String>,

        /// Topic tags (comma-separated or repeated)
        #[arg(short, long, value_delimiter = ',')]
        topics: Vec<String>,
    },

    /// Update a session (metadata and/or body sections)
    Update(SessionUpdateArgs),

    /// List sessions
    List(SessionListArgs),

    /// Show one session in full
    Show {
        /// Session date (YYYY-MM-DD, default: most recent)
        date: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct SessionUpdateArgs {
    /// Session date (YYYY-MM-DD, default: most recent session)
    #[arg(short, long)]
    pub date: Option<String>,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// Topics to add (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// Plan id to back-reference
    #[arg(long)]
    pub plan: Option<String>,

    /// New status (in-progress, complete, abandoned)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Append content to --section
    #[arg(long, group = "edit")]
    pub append: Option<String>,

    /// Prepend content inside --section
    #[arg(long, group = "edit")]
    pub prepend: Option<String>,

    /// Insert a new section after the first line containing this pattern
    #[arg(long, group = "edit")]
    pub insert_after: Option<String>,

    /// Insert a new section before the first line containing this pattern
    #[arg(long, group = "edit")]
    pub insert_before: Option<String>,

    /// Target section heading (for --append/--prepend and the inserts)
    #[arg(long, default_value = "Notes")]
    pub section: String,

    /// Section content (required by --insert-after/--insert-before)
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct SessionListArgs {
    /// Sessions from the last N days
    #[arg(long)]
    pub days: Option<u32>,

    /// Inclusive lower bound on session date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<String>,

    /// Inclusive upper bound on session date (YYYY-MM-DD)
    #[arg(long)]
    pub before: Option<String>,

    /// Filter by topic (exact match)
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Filter by author (exact match)
    #[arg(long)]
    pub by: Option<String>,

    /// Filter by plan back-reference
    #[arg(long)]
    pub plan: Option<String>,

    /// Detail level
    #[arg(long, value_enum, default_value_t)]
    pub detail: DetailArg,

    /// Maximum sessions to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Pagination offset
    #[arg(long, default_value = "0")]
    pub offset: usize,
}

// ============================================================================
// Plan Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Create a new PLANNED plan
    Create {
        /// Plan title (the id is PLAN_<slug-of-title>)
        title: String,

        /// Topic tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        topics: Vec<String>,
    },

    /// List plans
    List(PlanListArgs),

    /// Show one plan in full
    Show {
        /// Plan id
        id: String,
    },

    /// Transition a plan to ACTIVE and claim it
    Activate {
        /// Plan id
        id: String,
    },

    /// Pause an ACTIVE plan (keeps the claim)
    Pause {
        /// Plan id
        id: String,
    },

    /// Complete an ACTIVE plan
    Complete {
        /// Plan id
        id: String,
    },

    /// Cancel a non-terminal plan
    Cancel {
        /// Plan id
        id: String,
    },

    /// Append a note to a plan's Progress section
    Append {
        /// Plan id
        id: String,

        /// Progress note
        content: String,
    },

    /// Prepend a note at the top of a plan's Progress section
    Prepend {
        /// Plan id
        id: String,

        /// Progress note
        content: String,
    },

    /// Show the author's current plan pointer
    Current,
}

#[derive(Args, Debug, Default)]
pub struct PlanListArgs {
    /// Filter by status (PLANNED, ACTIVE, PAUSED, COMPLETE, CANCELLED)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Filter by author (exact match)
    #[arg(long)]
    pub by: Option<String>,

    /// Filter by topic (exact match)
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Inclusive lower bound on last-updated date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<String>,

    /// Inclusive upper bound on last-updated date (YYYY-MM-DD)
    #[arg(long)]
    pub before: Option<String>,

    /// Filter by title substring (case-insensitive)
    #[arg(long)]
    pub title: Option<String>,

    /// Detail level
    #[arg(long, value_enum, default_value_t)]
    pub detail: DetailArg,

    /// Maximum plans to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Pagination offset
    #[arg(long, default_value = "0")]
    pub offset: usize,
}

// ============================================================================
// Pattern Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PatternCommands {
    /// Record a new learned pattern
    Add {
        /// Pattern id (unique, immutable)
        id: String,

        /// Category (error_resolution, user_corrections, workarounds,
        /// debugging_techniques, project_specific)
        #[arg(short, long)]
        category: String,

        /// Human-readable title
        #[arg(long)]
        title: String,

        /// Keywords (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Markdown body
        content: String,
    },

    /// Replace an existing pattern's content
    Replace {
        /// Pattern id
        id: String,

        /// New markdown body
        content: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New keywords (comma-separated, replaces the old set)
        #[arg(short, long, value_delimiter = ',')]
        keywords: Option<Vec<String>>,
    },

    /// List patterns
    List {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show one pattern in full
    Show {
        /// Pattern id
        id: String,
    },
}

// ============================================================================
// Search / Index
// ============================================================================

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Restrict to entity types (session, plan, learned; comma-separated)
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    pub kinds: Vec<String>,

    /// Maximum hits to return
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommands {
    /// Recompute all derived index state from the source of truth
    Rebuild,
}
