//! Shared query semantics: filters, detail levels, ordering, and search
//! scoring.
//!
//! Both storage backends route their candidate records through this module
//! so filter and ranking behavior is identical regardless of where the
//! bytes live. Ordering is always deterministic (updated descending, with
//! id/date tiebreaks) so paged results are stable and tests are
//! reproducible.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{EntityKind, PlanMeta, PlanStatus, SessionMeta, SessionStatus};

/// How much of each record a query materializes.
///
/// `Metadata` must never load body text; `Preview` returns aggregates only.
/// This exists to bound response size for machine callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Preview,
    #[default]
    Metadata,
    Full,
}

/// Filter for plan queries. Empty filter = all plans.
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    /// Exact-match status.
    pub status: Option<PlanStatus>,
    /// Exact-match author (case-sensitive).
    pub author: Option<String>,
    /// Exact-match topic (case-sensitive).
    pub topic: Option<String>,
    /// Inclusive lower bound on `updated` date.
    pub date_after: Option<NaiveDate>,
    /// Inclusive upper bound on `updated` date.
    pub date_before: Option<NaiveDate>,
    /// Case-insensitive substring on title.
    pub title_contains: Option<String>,
    pub detail: DetailLevel,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Filter for session queries. Empty filter = all sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Relative window: sessions dated within the last N days of "now",
    /// resolved at query time.
    pub days: Option<u32>,
    /// Inclusive lower bound on session date.
    pub date_after: Option<NaiveDate>,
    /// Inclusive upper bound on session date.
    pub date_before: Option<NaiveDate>,
    /// Exact-match topic (case-sensitive).
    pub topic: Option<String>,
    /// Exact-match author (case-sensitive).
    pub author: Option<String>,
    /// Exact-match plan back-reference.
    pub plan: Option<String>,
    pub detail: DetailLevel,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SessionFilter {
    /// Effective inclusive lower bound: the explicit `date_after`, or the
    /// `days` window computed against today's UTC date.
    #[must_use]
    pub fn effective_date_after(&self) -> Option<NaiveDate> {
        match (self.date_after, self.days) {
            (Some(d), _) => Some(d),
            (None, Some(days)) => {
                Some(Utc::now().date_naive() - chrono::Duration::days(i64::from(days)))
            }
            (None, None) => None,
        }
    }
}

/// Whether a plan record passes the filter.
#[must_use]
pub fn plan_matches(meta: &PlanMeta, filter: &PlanFilter) -> bool {
    if let Some(status) = filter.status {
        if meta.status != status {
            return false;
        }
    }
    if let Some(author) = &filter.author {
        if &meta.author != author {
            return false;
        }
    }
    if let Some(topic) = &filter.topic {
        if !meta.topics.iter().any(|t| t == topic) {
            return false;
        }
    }
    let updated = meta.updated.date_naive();
    if let Some(after) = filter.date_after {
        if updated < after {
            return false;
        }
    }
    if let Some(before) = filter.date_before {
        if updated > before {
            return false;
        }
    }
    if let Some(needle) = &filter.title_contains {
        if !meta.title.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    true
}

/// Whether a session record passes the filter.
#[must_use]
pub fn session_matches(meta: &SessionMeta, filter: &SessionFilter) -> bool {
    if let Some(after) = filter.effective_date_after() {
        if meta.date < after {
            return false;
        }
    }
    if let Some(before) = filter.date_before {
        if meta.date > before {
            return false;
        }
    }
    if let Some(topic) = &filter.topic {
        if !meta.topics.iter().any(|t| t == topic) {
            return false;
        }
    }
    if let Some(author) = &filter.author {
        if &meta.author != author {
            return false;
        }
    }
    if let Some(plan) = &filter.plan {
        if meta.plan.as_deref() != Some(plan.as_str()) {
            return false;
        }
    }
    true
}

/// Canonical plan ordering: most recently touched first, id tiebreak.
pub fn sort_plans(plans: &mut [PlanMeta]) {
    plans.sort_by(|a, b| b.updated.cmp(&a.updated).then_with(|| a.id.cmp(&b.id)));
}

/// Canonical session ordering: most recent first, date then author tiebreak.
pub fn sort_sessions(sessions: &mut [SessionMeta]) {
    sessions.sort_by(|a, b| {
        b.updated
            .cmp(&a.updated)
            .then_with(|| b.date.cmp(&a.date))
            .then_with(|| a.author.cmp(&b.author))
    });
}

/// Apply offset/limit paging to an already-sorted vec.
pub fn page<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    }
}

// ============================================================================
// Query results
// ============================================================================

/// Aggregates returned by preview-level queries.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPreview {
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Most frequent topics, descending, capped at five.
    pub top_topics: Vec<String>,
}

/// Compute preview aggregates from (date, topics) pairs.
#[must_use]
pub fn preview_of<'a>(records: impl Iterator<Item = (NaiveDate, &'a [String])>) -> QueryPreview {
    let mut min: Option<NaiveDate> = None;
    let mut max: Option<NaiveDate> = None;
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();

    for (date, topics) in records {
        min = Some(min.map_or(date, |m| m.min(date)));
        max = Some(max.map_or(date, |m| m.max(date)));
        for t in topics {
            *counts.entry(t.as_str()).or_default() += 1;
        }
    }

    // BTreeMap iteration keeps topic order deterministic on count ties.
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    QueryPreview {
        date_range: min.zip(max),
        top_topics: ranked
            .into_iter()
            .take(5)
            .map(|(t, _)| t.to_string())
            .collect(),
    }
}

/// One session in a query result. `content` is populated only at
/// `DetailLevel::Full`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub meta: SessionMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One plan in a query result. `content` is populated only at
/// `DetailLevel::Full`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub meta: PlanMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Result of `query_sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionQueryResult {
    pub count: usize,
    pub sessions: Vec<SessionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<QueryPreview>,
}

/// Result of `query_plans`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanQueryResult {
    pub count: usize,
    pub plans: Vec<PlanView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<QueryPreview>,
}

// ============================================================================
// Search
// ============================================================================

/// Options for full-store search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum hits returned.
    pub limit: usize,
    /// Restrict to these entity kinds; `None` searches everything.
    pub kinds: Option<Vec<EntityKind>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            kinds: None,
        }
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub score: u32,
}

/// Case-insensitive non-overlapping occurrence count.
#[must_use]
pub fn occurrences(haystack: &str, needle: &str) -> u32 {
    if needle.is_empty() {
        return 0;
    }
    let haystack = haystack.to_lowercase();
    let needle = needle.to_lowercase();
    let mut count = 0;
    let mut pos = 0;
    while let Some(i) = haystack[pos..].find(&needle) {
        count += 1;
        pos += i + needle.len();
    }
    count
}

/// Relevance score for one record: occurrence counts weighted by field.
/// Title matches outrank topic matches outrank body matches.
#[must_use]
pub fn score_fields(query: &str, title: &str, topics: &[String], body: &str) -> u32 {
    let topic_text = topics.join(" ");
    3 * occurrences(title, query) + 2 * occurrences(&topic_text, query) + occurrences(body, query)
}

/// First line containing the query, trimmed to a display-sized snippet.
/// Falls back to the first non-empty line.
#[must_use]
pub fn snippet_for(query: &str, body: &str) -> String {
    const MAX: usize = 120;
    let lower = query.to_lowercase();
    let line = body
        .lines()
        .find(|l| l.to_lowercase().contains(&lower))
        .or_else(|| body.lines().find(|l| !l.trim().is_empty()))
        .unwrap_or("");
    let line = line.trim();
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        let cut: String = line.chars().take(MAX).collect();
        format!("{cut}...")
    }
}

/// Candidate record fed into [`rank_hits`].
pub struct SearchCandidate {
    pub kind: EntityKind,
    pub id: String,
    pub title: String,
    pub topics: Vec<String>,
    pub body: String,
    pub updated: chrono::DateTime<Utc>,
}

/// Score, order, and truncate search candidates.
///
/// Ordering: score descending, then recency, then id, so identical inputs
/// always produce identical output.
#[must_use]
pub fn rank_hits(query: &str, candidates: Vec<SearchCandidate>, opts: &SearchOptions) -> Vec<SearchHit> {
    let mut scored: Vec<(u32, SearchCandidate)> = candidates
        .into_iter()
        .filter(|c| {
            opts.kinds
                .as_ref()
                .is_none_or(|kinds| kinds.contains(&c.kind))
        })
        .filter_map(|c| {
            let score = score_fields(query, &c.title, &c.topics, &c.body);
            (score > 0).then_some((score, c))
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| b.updated.cmp(&a.updated))
            .then_with(|| a.id.cmp(&b.id))
    });

    scored
        .into_iter()
        .take(opts.limit)
        .map(|(score, c)| SearchHit {
            kind: c.kind,
            id: c.id,
            title: c.title.clone(),
            snippet: snippet_for(query, &c.body),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan_meta(id: &str, status: PlanStatus, updated_day: u32) -> PlanMeta {
        let ts = Utc.with_ymd_and_hms(2026, 8, updated_day, 12, 0, 0).unwrap();
        PlanMeta {
            id: id.to_string(),
            title: id.replace('_', " "),
            author: "erin".into(),
            status,
            topics: vec!["storage".into()],
            created: ts,
            updated: ts,
            started: None,
            completed: None,
        }
    }

    fn session_meta(date: &str, topics: &[&str]) -> SessionMeta {
        SessionMeta {
            date: date.parse().unwrap(),
            title: "work".into(),
            topics: topics.iter().map(ToString::to_string).collect(),
            author: "erin".into(),
            plan: None,
            status: SessionStatus::InProgress,
            created: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
            updated: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_status_filter_exact() {
        let plans = vec![
            plan_meta("PLAN_a", PlanStatus::Planned, 1),
            plan_meta("PLAN_b", PlanStatus::Active, 2),
            plan_meta("PLAN_c", PlanStatus::Active, 3),
            plan_meta("PLAN_d", PlanStatus::Paused, 4),
            plan_meta("PLAN_e", PlanStatus::Complete, 5),
        ];
        let filter = PlanFilter {
            status: Some(PlanStatus::Active),
            ..PlanFilter::default()
        };
        let matched: Vec<_> = plans.iter().filter(|p| plan_matches(p, &filter)).collect();
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|p| p.status == PlanStatus::Active));
    }

    #[test]
    fn test_date_range_inclusive_both_ends() {
        let meta = session_meta("2026-08-10", &[]);
        let mut filter = SessionFilter {
            date_after: Some("2026-08-10".parse().unwrap()),
            date_before: Some("2026-08-10".parse().unwrap()),
            ..SessionFilter::default()
        };
        assert!(session_matches(&meta, &filter));

        filter.date_before = Some("2026-08-09".parse().unwrap());
        assert!(!session_matches(&meta, &filter));
    }

    #[test]
    fn test_single_sided_range_is_open() {
        let meta = session_meta("2001-01-01", &[]);
        let filter = SessionFilter {
            date_before: Some("2026-01-01".parse().unwrap()),
            ..SessionFilter::default()
        };
        assert!(session_matches(&meta, &filter));
    }

    #[test]
    fn test_days_window_relative_to_now() {
        let today = Utc::now().date_naive();
        let recent = session_meta(&today.to_string(), &[]);
        let old = session_meta("2020-01-01", &[]);
        let filter = SessionFilter {
            days: Some(7),
            ..SessionFilter::default()
        };
        assert!(session_matches(&recent, &filter));
        assert!(!session_matches(&old, &filter));
    }

    #[test]
    fn test_topic_filter_case_sensitive() {
        let meta = session_meta("2026-08-10", &["Storage"]);
        let hit = SessionFilter {
            topic: Some("Storage".into()),
            ..SessionFilter::default()
        };
        let miss = SessionFilter {
            topic: Some("storage".into()),
            ..SessionFilter::default()
        };
        assert!(session_matches(&meta, &hit));
        assert!(!session_matches(&meta, &miss));
    }

    #[test]
    fn test_plan_ordering_updated_desc_id_tiebreak() {
        let mut plans = vec![
            plan_meta("PLAN_b", PlanStatus::Active, 1),
            plan_meta("PLAN_a", PlanStatus::Active, 1),
            plan_meta("PLAN_c", PlanStatus::Active, 5),
        ];
        sort_plans(&mut plans);
        let ids: Vec<_> = plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["PLAN_c", "PLAN_a", "PLAN_b"]);
    }

    #[test]
    fn test_occurrences() {
        assert_eq!(occurrences("abc ABC abC", "abc"), 3);
        assert_eq!(occurrences("aaaa", "aa"), 2);
        assert_eq!(occurrences("abc", ""), 0);
        assert_eq!(occurrences("", "x"), 0);
    }

    #[test]
    fn test_field_weighting_title_beats_body() {
        // One title hit (3) outweighs two body hits (2).
        let title_hit = score_fields("cache", "cache design", &[], "nothing here");
        let body_hits = score_fields("cache", "design", &[], "cache cache");
        assert!(title_hit > body_hits);
    }

    #[test]
    fn test_rank_hits_deterministic_tiebreak() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let mk = |id: &str| SearchCandidate {
            kind: EntityKind::Plan,
            id: id.to_string(),
            title: "cache".into(),
            topics: vec![],
            body: String::new(),
            updated: ts,
        };
        let hits = rank_hits(
            "cache",
            vec![mk("PLAN_b"), mk("PLAN_a")],
            &SearchOptions::default(),
        );
        assert_eq!(hits[0].id, "PLAN_a");
        assert_eq!(hits[1].id, "PLAN_b");
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn test_rank_hits_drops_non_matches_and_limits() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let mk = |id: &str, body: &str| SearchCandidate {
            kind: EntityKind::Session,
            id: id.to_string(),
            title: String::new(),
            topics: vec![],
            body: body.to_string(),
            updated: ts,
        };
        let candidates = vec![mk("a", "cache"), mk("b", "other"), mk("c", "cache cache")];
        let hits = rank_hits(
            "cache",
            candidates,
            &SearchOptions {
                limit: 1,
                kinds: None,
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c");
    }

    #[test]
    fn test_preview_aggregates() {
        let topics_a = vec!["rust".to_string(), "storage".to_string()];
        let topics_b = vec!["storage".to_string()];
        let records: Vec<(NaiveDate, &[String])> = vec![
            ("2026-08-01".parse().unwrap(), topics_a.as_slice()),
            ("2026-08-10".parse().unwrap(), topics_b.as_slice()),
        ];
        let preview = preview_of(records.into_iter());
        assert_eq!(
            preview.date_range,
            Some((
                "2026-08-01".parse().unwrap(),
                "2026-08-10".parse().unwrap()
            ))
        );
        assert_eq!(preview.top_topics[0], "storage");
    }

    #[test]
    fn test_snippet_prefers_matching_line() {
        let body = "first line\nthe cache lives here\nlast";
        assert_eq!(snippet_for("cache", body), "the cache lives here");
        assert_eq!(snippet_for("absent", body), "first line");
    }
}
