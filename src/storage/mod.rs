//! Storage layer for AIKnowSys.
//!
//! Two interchangeable backends implement [`StorageAdapter`]:
//!
//! - [`json`] - markdown files as source of truth plus a denormalized
//!   `context-index.json` for fast listing/search
//! - [`sqlite`] - relational tables, shared across projects by default
//!
//! Backend selection happens in [`factory`]. Query filtering and search
//! ranking are delegated to [`crate::query`] so semantics are identical
//! across backends.
//!
//! # Submodules
//!
//! - [`factory`] - Adapter resolution and construction
//! - [`json`] - JSON-index backend
//! - [`schema`] - SQLite schema definitions
//! - [`sqlite`] - SQLite backend

pub mod factory;
pub mod json;
pub mod schema;
pub mod sqlite;

pub use factory::{open_storage, AdapterKind, StorageOptions};
pub use json::JsonStorage;
pub use sqlite::SqliteStorage;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{ActivePlanPointer, LearnedPattern, PatternCategory, Plan, Session};
use crate::query::{
    PlanFilter, PlanQueryResult, SearchHit, SearchOptions, SessionFilter, SessionQueryResult,
};

/// Capability contract shared by both backends.
///
/// Query methods never fail on "no results" (they return `count: 0`);
/// they fail with `StorageIo` on unreadable files or a corrupt index.
/// Entity loads return the authoritative record (file or row), never
/// index data, so mutations are immune to index staleness.
///
/// Every mutation primitive (`save_*`) also updates the backend's derived
/// search/index state; callers never run a separate sync step.
pub trait StorageAdapter {
    /// Idempotent setup: create required directories/files/tables.
    ///
    /// # Errors
    ///
    /// Returns `StorageInit` if the backing store cannot be established.
    fn init(&mut self) -> Result<()>;

    /// Query plans. No filter = all plans, most recently touched first.
    fn query_plans(&self, filter: &PlanFilter) -> Result<PlanQueryResult>;

    /// Query sessions. No filter = all sessions, most recent first.
    fn query_sessions(&self, filter: &SessionFilter) -> Result<SessionQueryResult>;

    /// Ranked search across sessions, plans, and learned patterns.
    fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>>;

    /// Recompute all derived state from the source of truth. Safe to call
    /// repeatedly; two consecutive calls produce identical index content.
    fn rebuild_index(&mut self) -> Result<()>;

    /// Release held resources. Safe to call multiple times.
    fn close(&mut self) -> Result<()>;

    // Entity primitives used by the mutation engine.

    /// Load the session for a date from the authoritative store.
    fn load_session(&self, date: NaiveDate) -> Result<Option<Session>>;

    /// The most recent session, optionally restricted to an author.
    fn latest_session(&self, author: Option<&str>) -> Result<Option<Session>>;

    /// Persist a session and update derived index state.
    fn save_session(&mut self, session: &Session) -> Result<()>;

    /// Load a plan by id from the authoritative store.
    fn load_plan(&self, id: &str) -> Result<Option<Plan>>;

    /// Persist a plan and update derived index state.
    fn save_plan(&mut self, plan: &Plan) -> Result<()>;

    /// Load an author's active-plan pointer.
    fn load_pointer(&self, author: &str) -> Result<Option<ActivePlanPointer>>;

    /// Persist an author's active-plan pointer.
    fn save_pointer(&mut self, pointer: &ActivePlanPointer) -> Result<()>;

    /// Load a learned pattern by id.
    fn load_pattern(&self, id: &str) -> Result<Option<LearnedPattern>>;

    /// Persist a learned pattern and update derived index state.
    fn save_pattern(&mut self, pattern: &LearnedPattern) -> Result<()>;

    /// List learned patterns, optionally by category, id order.
    fn list_patterns(&self, category: Option<PatternCategory>) -> Result<Vec<LearnedPattern>>;
}
