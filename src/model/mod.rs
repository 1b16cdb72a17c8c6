//! Data types for AIKnowSys entities.
//!
//! - [`session`] - Work sessions (one per date)
//! - [`plan`] - Tracked plans with a lifecycle state machine
//! - [`pattern`] - Learned patterns (keyword-indexed snippets)
//! - [`pointer`] - Per-author active-plan pointers
//! - [`index`] - Denormalized context-index metadata records

pub mod index;
pub mod pattern;
pub mod plan;
pub mod pointer;
pub mod session;

pub use index::{
    ContextIndex, EntityKind, PatternMeta, PlanMeta, SessionMeta, INDEX_VERSION,
};
pub use pattern::{LearnedPattern, PatternCategory, PatternStatus};
pub use plan::{slugify_title, Plan, PlanStatus};
pub use pointer::ActivePlanPointer;
pub use session::{Session, SessionStatus};
