//! Context index records.
//!
//! The JSON backend keeps a denormalized `context-index.json` so listing
//! and search never re-parse every markdown file. The index holds one
//! typed metadata array per entity type and is always rebuildable from
//! the source files; staleness is a `rebuild_index`-fixable condition.
//!
//! Both backends also use these metadata records as the common shape the
//! query engine filters and ranks, which keeps filter semantics identical
//! across backends.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    LearnedPattern, PatternCategory, PatternStatus, Plan, PlanStatus, Session, SessionStatus,
};

/// Current index format version.
pub const INDEX_VERSION: u32 = 2;

/// Entity discriminant used in search results and index records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Session,
    Plan,
    Learned,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Plan => "plan",
            Self::Learned => "learned",
        }
    }
}

/// Lightweight session metadata (no body text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub date: NaiveDate,
    pub title: String,
    pub topics: Vec<String>,
    pub author: String,
    pub plan: Option<String>,
    pub status: SessionStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<&Session> for SessionMeta {
    fn from(s: &Session) -> Self {
        Self {
            date: s.date,
            title: s.title.clone(),
            topics: s.topics.clone(),
            author: s.author.clone(),
            plan: s.plan.clone(),
            status: s.status,
            created: s.created,
            updated: s.updated,
        }
    }
}

/// Lightweight plan metadata (no body text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMeta {
    pub id: String,
    pub title: String,
    pub author: String,
    pub status: PlanStatus,
    pub topics: Vec<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
}

impl From<&Plan> for PlanMeta {
    fn from(p: &Plan) -> Self {
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            author: p.author.clone(),
            status: p.status,
            topics: p.topics.clone(),
            created: p.created,
            updated: p.updated,
            started: p.started,
            completed: p.completed,
        }
    }
}

/// Lightweight pattern metadata (no body text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMeta {
    pub id: String,
    pub category: PatternCategory,
    pub title: String,
    pub keywords: Vec<String>,
    pub status: PatternStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<&LearnedPattern> for PatternMeta {
    fn from(p: &LearnedPattern) -> Self {
        Self {
            id: p.id.clone(),
            category: p.category,
            title: p.title.clone(),
            keywords: p.keywords.clone(),
            status: p.status,
            created: p.created,
            updated: p.updated,
        }
    }
}

/// The denormalized directory of everything in a JSON-backed store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextIndex {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub sessions: Vec<SessionMeta>,
    #[serde(default)]
    pub plans: Vec<PlanMeta>,
    #[serde(default)]
    pub patterns: Vec<PatternMeta>,
}

impl ContextIndex {
    /// Empty index at the current format version.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: INDEX_VERSION,
            ..Self::default()
        }
    }

    /// Sort all arrays into canonical order so serialization is
    /// deterministic and rebuilds are byte-identical.
    pub fn sort(&mut self) {
        self.sessions
            .sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.author.cmp(&b.author)));
        self.plans.sort_by(|a, b| a.id.cmp(&b.id));
        self.patterns.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Insert or replace the session record for the same date.
    pub fn upsert_session(&mut self, meta: SessionMeta) {
        self.sessions.retain(|s| s.date != meta.date);
        self.sessions.push(meta);
        self.sort();
    }

    /// Insert or replace the plan record with the same id.
    pub fn upsert_plan(&mut self, meta: PlanMeta) {
        self.plans.retain(|p| p.id != meta.id);
        self.plans.push(meta);
        self.sort();
    }

    /// Insert or replace the pattern record with the same id.
    pub fn upsert_pattern(&mut self, meta: PatternMeta) {
        self.patterns.retain(|p| p.id != meta.id);
        self.patterns.push(meta);
        self.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(date: &str, author: &str) -> SessionMeta {
        SessionMeta {
            date: date.parse().unwrap(),
            title: "t".into(),
            topics: vec![],
            author: author.into(),
            plan: None,
            status: SessionStatus::InProgress,
            created: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_upsert_session_replaces_same_date() {
        let mut idx = ContextIndex::empty();
        idx.upsert_session(meta("2026-08-20", "a"));
        let mut replacement = meta("2026-08-20", "a");
        replacement.title = "new".into();
        idx.upsert_session(replacement);
        assert_eq!(idx.sessions.len(), 1);
        assert_eq!(idx.sessions[0].title, "new");
    }

    #[test]
    fn test_sort_is_stable_canonical() {
        let mut idx = ContextIndex::empty();
        idx.sessions.push(meta("2026-08-19", "b"));
        idx.sessions.push(meta("2026-08-21", "a"));
        idx.sessions.push(meta("2026-08-19", "a"));
        idx.sort();
        let order: Vec<_> = idx
            .sessions
            .iter()
            .map(|s| (s.date.to_string(), s.author.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2026-08-21".to_string(), "a".to_string()),
                ("2026-08-19".to_string(), "a".to_string()),
                ("2026-08-19".to_string(), "b".to_string()),
            ]
        );
    }
}
