//! JSON-index storage backend.
//!
//! Markdown files are the source of truth; `context-index.json` is a
//! denormalized directory of metadata records so listing and search never
//! re-parse every file. Layout under the store root:
//!
//! ```text
//! sessions/<YYYY-MM-DD>-session.md
//! PLAN_<slug>.md
//! plans/active-<author>.md
//! patterns/<id>.md
//! context-index.json
//! ```
//!
//! Every write is atomic (temp file + fsync + rename), entity file first,
//! index second. A crash between the two leaves a stale index that
//! `rebuild_index` repairs; mutations are unaffected because they load the
//! authoritative file, never the index.
//!
//! Concurrency: whole-file read-modify-write is last-write-wins. Two
//! concurrent writers to the same entity can lose one update; this backend
//! assumes at most one writer at a time.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::warn;

use crate::error::{Error, Result};
use crate::frontmatter;
use crate::model::{
    ActivePlanPointer, ContextIndex, EntityKind, LearnedPattern, PatternCategory, Plan, Session,
};
use crate::query::{
    self, PlanFilter, PlanQueryResult, PlanView, SearchCandidate, SearchHit, SearchOptions,
    SessionFilter, SessionQueryResult, SessionView, DetailLevel,
};
use crate::storage::StorageAdapter;

/// Name of the denormalized index file.
pub const INDEX_FILE: &str = "context-index.json";

/// JSON-index backend rooted at a knowledge-store directory.
#[derive(Debug)]
pub struct JsonStorage {
    root: PathBuf,
}

/// Write content to a file atomically: write to a `.tmp` sibling, fsync,
/// then rename over the target. On failure the original file is untouched.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, &e))?;
    }

    {
        let file = File::create(&tmp).map_err(|e| Error::io(&tmp, &e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(content.as_bytes())
            .and_then(|()| writer.flush())
            .and_then(|()| writer.get_ref().sync_all())
            .map_err(|e| Error::io(&tmp, &e))?;
    }

    fs::rename(&tmp, path).map_err(|e| Error::io(path, &e))
}

/// Read a file, mapping "not found" to `None` and other failures to
/// `StorageIo`.
fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, &e)),
    }
}

impl JsonStorage {
    /// Open (and initialize) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `StorageInit` if the directory layout cannot be created.
    pub fn open(root: &Path) -> Result<Self> {
        let mut storage = Self {
            root: root.to_path_buf(),
        };
        storage.init()?;
        Ok(storage)
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn plans_dir(&self) -> PathBuf {
        self.root.join("plans")
    }

    fn patterns_dir(&self) -> PathBuf {
        self.root.join("patterns")
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn session_path(&self, date: NaiveDate) -> PathBuf {
        self.sessions_dir()
            .join(format!("{}-session.md", date.format("%Y-%m-%d")))
    }

    /// Plan ids already carry the `PLAN_` prefix, so the filename is
    /// `<id>.md` at the store root.
    fn plan_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.md"))
    }

    fn pointer_path(&self, author: &str) -> PathBuf {
        self.plans_dir().join(format!("active-{author}.md"))
    }

    fn pattern_path(&self, id: &str) -> PathBuf {
        self.patterns_dir().join(format!("{id}.md"))
    }

    /// Load the index, treating a missing file as empty and a corrupt
    /// file as `StorageIo` (queries surface it; `rebuild_index` fixes it).
    fn load_index(&self) -> Result<ContextIndex> {
        let path = self.index_path();
        match read_optional(&path)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| Error::StorageIo {
                path,
                message: format!("corrupt index: {e}"),
            }),
            None => Ok(ContextIndex::empty()),
        }
    }

    /// Index for a write path. An unreadable index must not block entity
    /// writes (files are the source of truth), so start fresh and report.
    fn load_index_or_empty(&self) -> ContextIndex {
        self.load_index().unwrap_or_else(|e| {
            warn!(error = %e, "index unreadable during write; starting fresh (run `index rebuild`)");
            ContextIndex::empty()
        })
    }

    fn write_index(&self, index: &mut ContextIndex) -> Result<()> {
        index.sort();
        let path = self.index_path();
        let json = serde_json::to_string_pretty(index).map_err(|e| Error::StorageIo {
            path: path.clone(),
            message: e.to_string(),
        })?;
        atomic_write(&path, &json)
    }

    /// Dates of all session files on disk, newest first. Derived from
    /// filenames, so no file is parsed.
    fn session_dates(&self) -> Result<Vec<NaiveDate>> {
        let dir = self.sessions_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&dir, &e)),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, &e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = name.strip_suffix("-session.md") {
                if let Ok(date) = stem.parse::<NaiveDate>() {
                    dates.push(date);
                }
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Plan ids of all plan files at the store root.
    fn plan_ids(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| Error::io(&self.root, &e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.root, &e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("PLAN_") {
                if let Some(id) = name.strip_suffix(".md") {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn pattern_ids(&self) -> Result<Vec<String>> {
        let dir = self.patterns_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&dir, &e)),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, &e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(id) = name.strip_suffix(".md") {
                ids.push(id.to_string());
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Body text for a full-detail view. A missing file means the index
    /// entry is stale; report it and serve the record without a body.
    fn session_body(&self, date: NaiveDate) -> Result<Option<String>> {
        match self.load_session(date)? {
            Some(s) => Ok(Some(s.content)),
            None => {
                warn!(date = %date, "stale index entry: session file missing; run `index rebuild`");
                Ok(None)
            }
        }
    }

    fn plan_body(&self, id: &str) -> Result<Option<String>> {
        match self.load_plan(id)? {
            Some(p) => Ok(Some(p.content)),
            None => {
                warn!(id, "stale index entry: plan file missing; run `index rebuild`");
                Ok(None)
            }
        }
    }
}

impl StorageAdapter for JsonStorage {
    fn init(&mut self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.sessions_dir(),
            self.plans_dir(),
            self.patterns_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| Error::StorageInit {
                path: dir.clone(),
                message: e.to_string(),
            })?;
        }
        if !self.index_path().exists() {
            self.write_index(&mut ContextIndex::empty())
                .map_err(|e| Error::StorageInit {
                    path: self.index_path(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn query_plans(&self, filter: &PlanFilter) -> Result<PlanQueryResult> {
        let index = self.load_index()?;
        let mut matched: Vec<_> = index
            .plans
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
                self.plan_body(&meta.id)?
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
        let index = self.load_index()?;
        let mut matched: Vec<_> = index
            .sessions
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
                self.session_body(meta.date)?
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
        let index = self.load_index()?;
        let mut candidates = Vec::new();

        for meta in &index.sessions {
            candidates.push(SearchCandidate {
                kind: EntityKind::Session,
                id: meta.date.to_string(),
                title: meta.title.clone(),
                topics: meta.topics.clone(),
                body: self.session_body(meta.date)?.unwrap_or_default(),
                updated: meta.updated,
            });
        }
        for meta in &index.plans {
            candidates.push(SearchCandidate {
                kind: EntityKind::Plan,
                id: meta.id.clone(),
                title: meta.title.clone(),
                topics: meta.topics.clone(),
                body: self.plan_body(&meta.id)?.unwrap_or_default(),
                updated: meta.updated,
            });
        }
        for meta in &index.patterns {
            let body = self
                .load_pattern(&meta.id)?
                .map(|p| p.content)
                .unwrap_or_default();
            candidates.push(SearchCandidate {
                kind: EntityKind::Learned,
                id: meta.id.clone(),
                title: meta.title.clone(),
                topics: meta.keywords.clone(),
                body,
                updated: meta.updated,
            });
        }

        Ok(query::rank_hits(query_str, candidates, opts))
    }

    fn rebuild_index(&mut self) -> Result<()> {
        let mut index = ContextIndex::empty();

        for date in self.session_dates()? {
            let path = self.session_path(date);
            match read_optional(&path)?.map(|raw| frontmatter::session_from_markdown(&raw)) {
                Some(Ok(session)) => index.sessions.push((&session).into()),
                Some(Err(e)) => warn!(path = %path.display(), error = %e, "skipping unparseable session file"),
                None => {}
            }
        }

        for id in self.plan_ids()? {
            let path = self.plan_path(&id);
            match read_optional(&path)?.map(|raw| frontmatter::plan_from_markdown(&raw)) {
                Some(Ok(plan)) => index.plans.push((&plan).into()),
                Some(Err(e)) => warn!(path = %path.display(), error = %e, "skipping unparseable plan file"),
                None => {}
            }
        }

        for id in self.pattern_ids()? {
            let path = self.pattern_path(&id);
            match read_optional(&path)?.map(|raw| frontmatter::pattern_from_markdown(&raw)) {
                Some(Ok(pattern)) => index.patterns.push((&pattern).into()),
                Some(Err(e)) => warn!(path = %path.display(), error = %e, "skipping unparseable pattern file"),
                None => {}
            }
        }

        self.write_index(&mut index)
    }

    fn close(&mut self) -> Result<()> {
        // No held handles; files are opened per operation.
        Ok(())
    }

    fn load_session(&self, date: NaiveDate) -> Result<Option<Session>> {
        read_optional(&self.session_path(date))?
            .map(|raw| frontmatter::session_from_markdown(&raw))
            .transpose()
    }

    fn latest_session(&self, author: Option<&str>) -> Result<Option<Session>> {
        for date in self.session_dates()? {
            if let Some(session) = self.load_session(date)? {
                if author.is_none_or(|a| session.author == a) {
                    return Ok(Some(session));
                }
            }
        }
        Ok(None)
    }

    fn save_session(&mut self, session: &Session) -> Result<()> {
        let doc = frontmatter::session_to_markdown(session)?;
        atomic_write(&self.session_path(session.date), &doc)?;

        let mut index = self.load_index_or_empty();
        index.upsert_session(session.into());
        self.write_index(&mut index)
    }

    fn load_plan(&self, id: &str) -> Result<Option<Plan>> {
        read_optional(&self.plan_path(id))?
            .map(|raw| frontmatter::plan_from_markdown(&raw))
            .transpose()
    }

    fn save_plan(&mut self, plan: &Plan) -> Result<()> {
        let doc = frontmatter::plan_to_markdown(plan)?;
        atomic_write(&self.plan_path(&plan.id), &doc)?;

        let mut index = self.load_index_or_empty();
        index.upsert_plan(plan.into());
        self.write_index(&mut index)
    }

    fn load_pointer(&self, author: &str) -> Result<Option<ActivePlanPointer>> {
        read_optional(&self.pointer_path(author))?
            .map(|raw| frontmatter::pointer_from_markdown(&raw))
            .transpose()
    }

    fn save_pointer(&mut self, pointer: &ActivePlanPointer) -> Result<()> {
        let doc = frontmatter::pointer_to_markdown(pointer)?;
        atomic_write(&self.pointer_path(&pointer.author), &doc)
    }

    fn load_pattern(&self, id: &str) -> Result<Option<LearnedPattern>> {
        read_optional(&self.pattern_path(id))?
            .map(|raw| frontmatter::pattern_from_markdown(&raw))
            .transpose()
    }

    fn save_pattern(&mut self, pattern: &LearnedPattern) -> Result<()> {
        let doc = frontmatter::pattern_to_markdown(pattern)?;
        atomic_write(&self.pattern_path(&pattern.id), &doc)?;

        let mut index = self.load_index_or_empty();
        index.upsert_pattern(pattern.into());
        self.write_index(&mut index)
    }

    fn list_patterns(&self, category: Option<PatternCategory>) -> Result<Vec<LearnedPattern>> {
        let mut patterns = Vec::new();
        for id in self.pattern_ids()? {
            if let Some(p) = self.load_pattern(&id)? {
                if category.is_none_or(|c| p.category == c) {
                    patterns.push(p);
                }
            }
        }
        Ok(patterns)
    }
}
