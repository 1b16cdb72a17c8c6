//! SQLite storage backend.
//!
//! Entities live in relational tables (see [`crate::storage::schema`]);
//! there are no markdown files on disk. A denormalized `search_text`
//! column per table backs the LIKE-based candidate scan; candidates are
//! then re-scored through [`crate::query::rank_hits`] so ranking is
//! identical to the JSON backend. Filter semantics likewise come from
//! [`crate::query`]: SQL narrows by the cheap indexed columns, the shared
//! predicates decide.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection};

use crate::error::{Error, Result};
use crate::model::{
    ActivePlanPointer, EntityKind, LearnedPattern, PatternCategory, PatternMeta, PatternStatus,
    Plan, PlanMeta, PlanStatus, Session, SessionMeta, SessionStatus,
};
use crate::query::{
    self, DetailLevel, PlanFilter, PlanQueryResult, PlanView, SearchCandidate, SearchHit,
    SearchOptions, SessionFilter, SessionQueryResult, SessionView,
};
use crate::storage::schema;
use crate::storage::StorageAdapter;

/// SQLite backend over a single database file (or `:memory:` in tests).
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Option<Connection>,
    path: PathBuf,
}

/// Lowercase haystack for the LIKE candidate scan. Recomputed on every
/// write and by `rebuild_index`.
fn search_text(title: &str, tags: &[String], content: &str) -> String {
    format!("{} {} {}", title, tags.join(" "), content).to_lowercase()
}

fn to_json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

impl SqliteStorage {
    /// Open (or create) a database at `path` with a 5s busy timeout.
    ///
    /// # Errors
    ///
    /// Returns `StorageInit` if the file cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, Duration::from_secs(5))
    }

    /// Open with an explicit busy timeout.
    pub fn open_with_timeout(path: &Path, busy: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::StorageInit {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        let conn = Connection::open(path).map_err(|e| Error::StorageInit {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::setup(conn, path.to_path_buf(), busy)
    }

    /// In-memory database for tests.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::StorageInit {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        })?;
        Self::setup(conn, PathBuf::from(":memory:"), Duration::from_secs(5))
    }

    fn setup(conn: Connection, path: PathBuf, busy: Duration) -> Result<Self> {
        conn.busy_timeout(busy)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok(); // no-op in memory
        schema::apply_schema(&conn)?;
        Ok(Self {
            conn: Some(conn),
            path,
        })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| Error::StorageIo {
            path: self.path.clone(),
            message: "database connection is closed".to_string(),
        })
    }

    fn bad_row(&self, what: &str, value: &str) -> Error {
        Error::StorageIo {
            path: self.path.clone(),
            message: format!("corrupt row: bad {what}: {value}"),
        }
    }

    fn parse_ts(&self, s: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| self.bad_row("timestamp", s))
    }

    fn parse_opt_ts(&self, s: Option<String>) -> Result<Option<DateTime<Utc>>> {
        s.as_deref().map(|s| self.parse_ts(s)).transpose()
    }

    fn parse_list(&self, s: &str) -> Result<Vec<String>> {
        serde_json::from_str(s).map_err(|_| self.bad_row("json list", s))
    }

    fn parse_date(&self, s: &str) -> Result<NaiveDate> {
        s.parse().map_err(|_| self.bad_row("date", s))
    }

    /// Plan metadata rows, pre-narrowed by the indexed columns. The shared
    /// predicates still run on every returned row.
    fn plan_metas(&self, filter: &PlanFilter) -> Result<Vec<PlanMeta>> {
        let mut sql = String::from(
            "SELECT id, title, author, status, topics, created, updated, started, completed \
             FROM plans WHERE 1=1",
        );
        let mut params: Vec<String> = Vec::new();
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            params.push(status.as_str().to_string());
        }
        if let Some(author) = &filter.author {
            sql.push_str(" AND author = ?");
            params.push(author.clone());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<String>>(8)?,
            ))
        })?;

        let mut metas = Vec::new();
        for row in rows {
            let (id, title, author, status, topics, created, updated, started, completed) = row?;
            metas.push(PlanMeta {
                id,
                title,
                author,
                status: PlanStatus::parse(&status)
                    .ok_or_else(|| self.bad_row("plan status", &status))?,
                topics: self.parse_list(&topics)?,
                created: self.parse_ts(&created)?,
                updated: self.parse_ts(&updated)?,
                started: self.parse_opt_ts(started)?,
                completed: self.parse_opt_ts(completed)?,
            });
        }
        Ok(metas)
    }

    fn session_metas(&self, filter: &SessionFilter) -> Result<Vec<SessionMeta>> {
        let mut sql = String::from(
            "SELECT date, title, topics, author, plan, status, created, updated \
             FROM sessions WHERE 1=1",
        );
        let mut params: Vec<String> = Vec::new();
        if let Some(author) = &filter.author {
            sql.push_str(" AND author = ?");
            params.push(author.clone());
        }
        if let Some(plan) = &filter.plan {
            sql.push_str(" AND plan = ?");
            params.push(plan.clone());
        }
        if let Some(after) = filter.effective_date_after() {
            sql.push_str(" AND date >= ?");
            params.push(after.to_string());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut metas = Vec::new();
        for row in rows {
            let (date, title, topics, author, plan, status, created, updated) = row?;
            metas.push(SessionMeta {
                date: self.parse_date(&date)?,
                title,
                topics: self.parse_list(&topics)?,
                author,
                plan,
                status: SessionStatus::parse(&status)
                    .ok_or_else(|| self.bad_row("session status", &status))?,
                created: self.parse_ts(&created)?,
                updated: self.parse_ts(&updated)?,
            });
        }
        Ok(metas)
    }

    fn plan_content(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        match conn.query_row("SELECT content FROM plans WHERE id = ?1", [id], |r| {
            r.get(0)
        }) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn session_content(&self, date: NaiveDate) -> Result<Option<String>> {
        let conn = self.conn()?;
        match conn.query_row(
            "SELECT content FROM sessions WHERE date = ?1",
            [date.to_string()],
            |r| r.get(0),
        ) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// LIKE candidate scan for one table. Over-broad matches are fine:
    /// `rank_hits` re-scores every candidate and drops zero scores.
    fn search_candidates(
        &self,
        table: &str,
        kind: EntityKind,
        pattern: &str,
    ) -> Result<Vec<SearchCandidate>> {
        let (id_col, tags_col) = match kind {
            EntityKind::Session => ("date", "topics"),
            EntityKind::Plan => ("id", "topics"),
            EntityKind::Learned => ("id", "keywords"),
        };
        let sql = format!(
            "SELECT {id_col}, title, {tags_col}, content, updated FROM {table} \
             WHERE search_text LIKE ?1"
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([pattern], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, title, tags, body, updated) = row?;
            out.push(SearchCandidate {
                kind,
                id,
                title,
                topics: self.parse_list(&tags)?,
                body,
                updated: self.parse_ts(&updated)?,
            });
        }
        Ok(out)
    }
}

impl StorageAdapter for SqliteStorage {
    fn init(&mut self) -> Result<()> {
        let conn = self.conn()?;
        schema::apply_schema(conn)?;
        Ok(())
    }

    fn query_plans(&self, filter: &PlanFilter) -> Result<PlanQueryResult> {
        let mut matched: Vec<PlanMeta> = self
            .plan_metas(filter)?
            .into_iter()
            .filter(|p| query::plan_matches(p, filter))
            .collect();
        query::sort_plans(&mut matched);
        let count = matched.len();

        if filter.detail == DetailLevel::Preview {
            let preview = query::preview_of(
                matched
                    .iter()
                    .map(|p| (p.updated.date_naive(), p.topics.as_slice())),
            );
            return Ok(PlanQueryResult {
                count,
                plans: Vec::new(),
                preview: Some(preview),
            });
        }

        let paged = query::page(matched, filter.offset, filter.limit);
        let mut plans = Vec::with_capacity(paged.len());
        for meta in paged {
            let content = if filter.detail == DetailLevel::Full {
                self.plan_content(&meta.id)?
            } else {
                None
            };
            plans.push(PlanView { meta, content });
        }
        Ok(PlanQueryResult {
            count,
            plans,
            preview: None,
        })
    }

    fn query_sessions(&self, filter: &SessionFilter) -> Result<SessionQueryResult> {
        let mut matched: Vec<SessionMeta> = self
            .session_metas(filter)?
            .into_iter()
            .filter(|s| query::session_matches(s, filter))
            .collect();
        query::sort_sessions(&mut matched);
        let count = matched.len();

        if filter.detail == DetailLevel::Preview {
            let preview =
                query::preview_of(matched.iter().map(|s| (s.date, s.topics.as_slice())));
            return Ok(SessionQueryResult {
                count,
                sessions: Vec::new(),
                preview: Some(preview),
            });
        }

        let paged = query::page(matched, filter.offset, filter.limit);
        let mut sessions = Vec::with_capacity(paged.len());
        for meta in paged {
            let content = if filter.detail == DetailLevel::Full {
                self.session_content(meta.date)?
            } else {
                None
            };
            sessions.push(SessionView { meta, content });
        }
        Ok(SessionQueryResult {
            count,
            sessions,
            preview: None,
        })
    }

    fn search(&self, query_str: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>> {
        let pattern = format!("%{}%", query_str.to_lowercase());
        let mut candidates = self.search_candidates("sessions", EntityKind::Session, &pattern)?;
        candidates.extend(self.search_candidates("plans", EntityKind::Plan, &pattern)?);
        candidates.extend(self.search_candidates("patterns", EntityKind::Learned, &pattern)?);
        Ok(query::rank_hits(query_str, candidates, opts))
    }

    fn rebuild_index(&mut self) -> Result<()> {
        // Recompute every search_text column from the row it belongs to.
        let conn = self.conn()?;
        for (table, id_col, tags_col) in [
            ("sessions", "date", "topics"),
            ("plans", "id", "topics"),
            ("patterns", "id", "keywords"),
        ] {
            let sql = format!("SELECT {id_col}, title, {tags_col}, content FROM {table}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut updates = Vec::new();
            for row in rows {
                let (id, title, tags, content) = row?;
                let tags = self.parse_list(&tags)?;
                updates.push((id, search_text(&title, &tags, &content)));
            }
            drop(stmt);

            let update_sql = format!("UPDATE {table} SET search_text = ?1 WHERE {id_col} = ?2");
            for (id, text) in updates {
                conn.execute(&update_sql, params![text, id])?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| Error::Database(e))?;
        }
        Ok(())
    }

    fn load_session(&self, date: NaiveDate) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT date, title, topics, author, plan, status, created, updated, content \
             FROM sessions WHERE date = ?1",
            [date.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        );
        match row {
            Ok((date, title, topics, author, plan, status, created, updated, content)) => {
                Ok(Some(Session {
                    date: self.parse_date(&date)?,
                    title,
                    topics: self.parse_list(&topics)?,
                    author,
                    plan,
                    status: SessionStatus::parse(&status)
                        .ok_or_else(|| self.bad_row("session status", &status))?,
                    created: self.parse_ts(&created)?,
                    updated: self.parse_ts(&updated)?,
                    content,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn latest_session(&self, author: Option<&str>) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let date: Option<String> = match author {
            Some(a) => conn
                .query_row(
                    "SELECT date FROM sessions WHERE author = ?1 ORDER BY date DESC LIMIT 1",
                    [a],
                    |r| r.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    e => Err(e),
                })?,
            None => conn
                .query_row(
                    "SELECT date FROM sessions ORDER BY date DESC LIMIT 1",
                    [],
                    |r| r.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    e => Err(e),
                })?,
        };
        match date {
            Some(d) => self.load_session(self.parse_date(&d)?),
            None => Ok(None),
        }
    }

    fn save_session(&mut self, session: &Session) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions \
             (date, title, topics, author, plan, status, created, updated, content, search_text) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.date.to_string(),
                session.title,
                to_json_list(&session.topics),
                session.author,
                session.plan,
                session.status.as_str(),
                session.created.to_rfc3339(),
                session.updated.to_rfc3339(),
                session.content,
                search_text(&session.title, &session.topics, &session.content),
            ],
        )?;
        Ok(())
    }

    fn load_plan(&self, id: &str) -> Result<Option<Plan>> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT id, title, author, status, topics, created, updated, started, completed, content \
             FROM plans WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            },
        );
        match row {
            Ok((id, title, author, status, topics, created, updated, started, completed, content)) => {
                Ok(Some(Plan {
                    id,
                    title,
                    author,
                    status: PlanStatus::parse(&status)
                        .ok_or_else(|| self.bad_row("plan status", &status))?,
                    topics: self.parse_list(&topics)?,
                    created: self.parse_ts(&created)?,
                    updated: self.parse_ts(&updated)?,
                    started: self.parse_opt_ts(started)?,
                    completed: self.parse_opt_ts(completed)?,
                    content,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_plan(&mut self, plan: &Plan) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO plans \
             (id, title, author, status, topics, created, updated, started, completed, content, search_text) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                plan.id,
                plan.title,
                plan.author,
                plan.status.as_str(),
                to_json_list(&plan.topics),
                plan.created.to_rfc3339(),
                plan.updated.to_rfc3339(),
                plan.started.map(|t| t.to_rfc3339()),
                plan.completed.map(|t| t.to_rfc3339()),
                plan.content,
                search_text(&plan.title, &plan.topics, &plan.content),
            ],
        )?;
        Ok(())
    }

    fn load_pointer(&self, author: &str) -> Result<Option<ActivePlanPointer>> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT author, current_plan_id, status, updated FROM active_pointers WHERE author = ?1",
            [author],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        );
        match row {
            Ok((author, current_plan_id, status, updated)) => {
                let status = status
                    .as_deref()
                    .map(|s| PlanStatus::parse(s).ok_or_else(|| self.bad_row("plan status", s)))
                    .transpose()?;
                Ok(Some(ActivePlanPointer {
                    author,
                    current_plan_id,
                    status,
                    updated: self.parse_ts(&updated)?,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_pointer(&mut self, pointer: &ActivePlanPointer) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO active_pointers (author, current_plan_id, status, updated) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                pointer.author,
                pointer.current_plan_id,
                pointer.status.map(|s| s.as_str()),
                pointer.updated.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_pattern(&self, id: &str) -> Result<Option<LearnedPattern>> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT id, category, title, keywords, status, created, updated, content \
             FROM patterns WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        );
        match row {
            Ok((id, category, title, keywords, status, created, updated, content)) => {
                Ok(Some(LearnedPattern {
                    id,
                    category: PatternCategory::parse(&category)
                        .ok_or_else(|| self.bad_row("pattern category", &category))?,
                    title,
                    keywords: self.parse_list(&keywords)?,
                    status: PatternStatus::parse(&status)
                        .ok_or_else(|| self.bad_row("pattern status", &status))?,
                    created: self.parse_ts(&created)?,
                    updated: self.parse_ts(&updated)?,
                    content,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_pattern(&mut self, pattern: &LearnedPattern) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO patterns \
             (id, category, title, keywords, status, created, updated, content, search_text) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                pattern.id,
                pattern.category.as_str(),
                pattern.title,
                to_json_list(&pattern.keywords),
                pattern.status.as_str(),
                pattern.created.to_rfc3339(),
                pattern.updated.to_rfc3339(),
                pattern.content,
                search_text(&pattern.title, &pattern.keywords, &pattern.content),
            ],
        )?;
        Ok(())
    }

    fn list_patterns(&self, category: Option<PatternCategory>) -> Result<Vec<LearnedPattern>> {
        let conn = self.conn()?;
        let ids: Vec<String> = match category {
            Some(c) => {
                let mut stmt = conn
                    .prepare("SELECT id FROM patterns WHERE category = ?1 ORDER BY id")?;
                let rows = stmt.query_map([c.as_str()], |r| r.get(0))?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare("SELECT id FROM patterns ORDER BY id")?;
                let rows = stmt.query_map([], |r| r.get(0))?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };

        let mut patterns = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.load_pattern(&id)? {
                patterns.push(p);
            }
        }
        Ok(patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStorage {
        SqliteStorage::open_memory().unwrap()
    }

    fn session(date: &str, title: &str) -> Session {
        Session::new(date.parse().unwrap(), title, "erin", vec!["storage".into()])
    }

    #[test]
    fn test_session_round_trip() {
        let mut storage = store();
        let mut s = session("2026-08-20", "Schema work");
        s.plan = Some("PLAN_schema".into());
        storage.save_session(&s).unwrap();

        let loaded = storage.load_session(s.date).unwrap().unwrap();
        assert_eq!(loaded.title, "Schema work");
        assert_eq!(loaded.topics, vec!["storage"]);
        assert_eq!(loaded.plan.as_deref(), Some("PLAN_schema"));
        assert_eq!(loaded.content, s.content);
    }

    #[test]
    fn test_save_session_is_upsert() {
        let mut storage = store();
        let mut s = session("2026-08-20", "first");
        storage.save_session(&s).unwrap();
        s.title = "second".into();
        storage.save_session(&s).unwrap();

        let result = storage.query_sessions(&SessionFilter::default()).unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.sessions[0].meta.title, "second");
    }

    #[test]
    fn test_plan_round_trip_with_lifecycle_fields() {
        let mut storage = store();
        let mut plan = Plan::new("Auth Rework", "erin", vec!["auth".into()]);
        plan.status = PlanStatus::Active;
        plan.started = Some(Utc::now());
        storage.save_plan(&plan).unwrap();

        let loaded = storage.load_plan("PLAN_auth_rework").unwrap().unwrap();
        assert_eq!(loaded.status, PlanStatus::Active);
        assert!(loaded.started.is_some());
        assert!(loaded.completed.is_none());
        assert!(storage.load_plan("PLAN_missing").unwrap().is_none());
    }

    #[test]
    fn test_query_plans_by_status() {
        let mut storage = store();
        let mut active = Plan::new("A", "erin", vec![]);
        active.status = PlanStatus::Active;
        storage.save_plan(&active).unwrap();
        storage.save_plan(&Plan::new("B", "erin", vec![])).unwrap();

        let result = storage
            .query_plans(&PlanFilter {
                status: Some(PlanStatus::Active),
                ..PlanFilter::default()
            })
            .unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.plans[0].meta.id, "PLAN_a");
    }

    #[test]
    fn test_metadata_detail_has_no_body() {
        let mut storage = store();
        storage.save_session(&session("2026-08-20", "t")).unwrap();
        let result = storage.query_sessions(&SessionFilter::default()).unwrap();
        assert!(result.sessions[0].content.is_none());

        let full = storage
            .query_sessions(&SessionFilter {
                detail: DetailLevel::Full,
                ..SessionFilter::default()
            })
            .unwrap();
        assert!(full.sessions[0].content.is_some());
    }

    #[test]
    fn test_empty_query_returns_count_zero() {
        let storage = store();
        let result = storage.query_sessions(&SessionFilter::default()).unwrap();
        assert_eq!(result.count, 0);
        assert!(result.sessions.is_empty());
    }

    #[test]
    fn test_search_ranks_like_shared_scorer() {
        let mut storage = store();
        let mut a = session("2026-08-19", "cache design");
        a.content = "nothing relevant".into();
        let mut b = session("2026-08-20", "misc");
        b.content = "cache mention".into();
        storage.save_session(&a).unwrap();
        storage.save_session(&b).unwrap();

        let hits = storage.search("cache", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "2026-08-19");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_rebuild_recomputes_search_text() {
        let mut storage = store();
        storage.save_session(&session("2026-08-20", "cache work")).unwrap();
        // Break the derived column out-of-band.
        storage
            .conn()
            .unwrap()
            .execute("UPDATE sessions SET search_text = ''", [])
            .unwrap();
        assert!(storage.search("cache", &SearchOptions::default()).unwrap().is_empty());

        storage.rebuild_index().unwrap();
        let hits = storage.search("cache", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_pointer_round_trip() {
        let mut storage = store();
        storage
            .save_pointer(&ActivePlanPointer::pointing_at(
                "erin",
                "PLAN_x",
                PlanStatus::Active,
            ))
            .unwrap();
        let loaded = storage.load_pointer("erin").unwrap().unwrap();
        assert_eq!(loaded.current_plan_id.as_deref(), Some("PLAN_x"));
        assert_eq!(loaded.status, Some(PlanStatus::Active));

        storage
            .save_pointer(&ActivePlanPointer::cleared("erin", PlanStatus::Complete))
            .unwrap();
        let cleared = storage.load_pointer("erin").unwrap().unwrap();
        assert!(cleared.current_plan_id.is_none());
    }

    #[test]
    fn test_latest_session_by_author() {
        let mut storage = store();
        storage.save_session(&session("2026-08-19", "old")).unwrap();
        storage.save_session(&session("2026-08-20", "new")).unwrap();
        let mut other = session("2026-08-21", "other author");
        other.author = "kai".into();
        storage.save_session(&other).unwrap();

        assert_eq!(storage.latest_session(None).unwrap().unwrap().title, "other author");
        assert_eq!(
            storage.latest_session(Some("erin")).unwrap().unwrap().title,
            "new"
        );
        assert!(storage.latest_session(Some("nobody")).unwrap().is_none());
    }

    #[test]
    fn test_list_patterns_by_category() {
        let mut storage = store();
        storage
            .save_pattern(&LearnedPattern::new(
                "p1",
                PatternCategory::Workarounds,
                "w",
                vec![],
                "body",
            ))
            .unwrap();
        storage
            .save_pattern(&LearnedPattern::new(
                "p2",
                PatternCategory::ErrorResolution,
                "e",
                vec![],
                "body",
            ))
            .unwrap();

        assert_eq!(storage.list_patterns(None).unwrap().len(), 2);
        let only = storage
            .list_patterns(Some(PatternCategory::Workarounds))
            .unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, "p1");
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_use() {
        let mut storage = store();
        storage.close().unwrap();
        storage.close().unwrap();
        assert!(matches!(
            storage.query_sessions(&SessionFilter::default()),
            Err(Error::StorageIo { .. })
        ));
    }
}
