//! Mutation engine: every write to the knowledge store goes through here.
//!
//! The engine owns the semantics that must be identical across backends:
//! idempotent session creation, the plan lifecycle state machine, pointer
//! bookkeeping, and section edits. Backends only provide load/save
//! primitives.
//!
//! Ordering discipline: all validation (date parsing, status transition
//! checks, section pattern matching) happens in memory before the first
//! write. A failed mutation leaves every file and row exactly as it was.

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{
    ActivePlanPointer, LearnedPattern, PatternCategory, Plan, PlanStatus, Session, SessionStatus,
};
use crate::sections;
use crate::storage::StorageAdapter;

/// A single edit against a markdown body.
#[derive(Debug, Clone)]
pub enum SectionEdit {
    /// Append to a named section, creating it at the end if absent.
    Append { section: String, content: String },
    /// Prepend inside a named section, creating it at the start if absent.
    Prepend { section: String, content: String },
    /// Insert a new section after the first line containing `pattern`.
    InsertAfter {
        pattern: String,
        section: String,
        content: String,
    },
    /// Insert a new section before the first line containing `pattern`.
    InsertBefore {
        pattern: String,
        section: String,
        content: String,
    },
}

impl SectionEdit {
    /// Apply the edit to a body. Pure; the caller persists the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PatternNotFound`] for the insert variants when no
    /// line matches.
    pub fn apply(&self, body: &str) -> Result<String> {
        match self {
            Self::Append { section, content } => {
                Ok(sections::append_to_section(body, section, content))
            }
            Self::Prepend { section, content } => {
                Ok(sections::prepend_to_section(body, section, content))
            }
            Self::InsertAfter {
                pattern,
                section,
                content,
            } => sections::insert_section_after(body, pattern, section, content),
            Self::InsertBefore {
                pattern,
                section,
                content,
            } => sections::insert_section_before(body, pattern, section, content),
        }
    }
}

/// Changes to apply to a session. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// Target date as `YYYY-MM-DD`; `None` resolves to the most recent
    /// session (restricted to `author` when given).
    pub date: Option<String>,
    /// Author used for latest-session resolution.
    pub author: Option<String>,
    pub title: Option<String>,
    /// Topics to add (duplicates are ignored).
    pub add_topics: Vec<String>,
    /// Plan back-reference to set.
    pub plan: Option<String>,
    pub status: Option<SessionStatus>,
    /// Body edit to apply.
    pub edit: Option<SectionEdit>,
}

/// Parse a `YYYY-MM-DD` date strictly: zero-padded, no extra text.
///
/// # Errors
///
/// Returns [`Error::Validation`] for anything else, including real dates
/// in a different format.
pub fn parse_strict_date(s: &str) -> Result<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("invalid date '{s}': expected YYYY-MM-DD")))?;
    // chrono accepts unpadded components; require the canonical form.
    if parsed.format("%Y-%m-%d").to_string() != s {
        return Err(Error::Validation(format!(
            "invalid date '{s}': expected YYYY-MM-DD"
        )));
    }
    Ok(parsed)
}

/// Reject an empty (post-trim) required argument.
fn require_nonempty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Validate a value that becomes part of a filename. Path separators
/// would let it escape the store layout.
fn require_path_safe(field: &str, value: &str) -> Result<()> {
    require_nonempty(field, value)?;
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(Error::Validation(format!(
            "{field} must not contain path separators: '{value}'"
        )));
    }
    Ok(())
}

/// The write path over a storage backend.
pub struct MutationEngine<'a> {
    storage: &'a mut dyn StorageAdapter,
}

impl<'a> MutationEngine<'a> {
    pub fn new(storage: &'a mut dyn StorageAdapter) -> Self {
        Self { storage }
    }

    /// Create the session for `date`, or return the existing one.
    ///
    /// One session per calendar date: repeating the call with the same
    /// date returns `created: false` and preserves the existing title,
    /// topics, and body; only the `updated` timestamp is refreshed.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty title or unusable author; propagates
    /// storage failures.
    pub fn create_session(
        &mut self,
        date: NaiveDate,
        title: &str,
        author: &str,
        topics: Vec<String>,
    ) -> Result<(Session, bool)> {
        require_nonempty("title", title)?;
        require_path_safe("author", author)?;
        if let Some(mut existing) = self.storage.load_session(date)? {
            existing.updated = Utc::now();
            self.storage.save_session(&existing)?;
            info!(%date, "session already exists, refreshed timestamp");
            return Ok((existing, false));
        }
        let session = Session::new(date, title, author, topics);
        self.storage.save_session(&session)?;
        info!(%date, title, "created session");
        Ok((session, true))
    }

    /// Apply an update to an existing session.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed date, `SessionNotFound` when the
    /// target does not exist, `PatternNotFound` from insert edits. On any
    /// error nothing has been written.
    pub fn update_session(&mut self, update: &SessionUpdate) -> Result<Session> {
        let mut session = match &update.date {
            Some(raw) => {
                let date = parse_strict_date(raw)?;
                self.storage
                    .load_session(date)?
                    .ok_or_else(|| Error::SessionNotFound {
                        date: Some(raw.clone()),
                    })?
            }
            None => self
                .storage
                .latest_session(update.author.as_deref())?
                .ok_or(Error::SessionNotFound { date: None })?,
        };

        if let Some(title) = &update.title {
            require_nonempty("title", title)?;
            session.title.clone_from(title);
        }
        for topic in &update.add_topics {
            if !session.topics.contains(topic) {
                session.topics.push(topic.clone());
            }
        }
        if let Some(plan) = &update.plan {
            session.plan = Some(plan.clone());
        }
        if let Some(status) = update.status {
            session.status = status;
        }
        if let Some(edit) = &update.edit {
            session.content = edit.apply(&session.content)?;
        }

        session.updated = Utc::now();
        self.storage.save_session(&session)?;
        Ok(session)
    }

    /// Create a new PLANNED plan and write the author's pointer with a
    /// PLANNED badge. Creation does not activate.
    ///
    /// # Errors
    ///
    /// `Validation` when the title yields no slug (empty or all
    /// punctuation) or the author is unusable; `DuplicatePlan` when a
    /// plan with the derived id already exists.
    pub fn create_plan(
        &mut self,
        title: &str,
        author: &str,
        topics: Vec<String>,
    ) -> Result<Plan> {
        require_nonempty("title", title)?;
        require_path_safe("author", author)?;
        let plan = Plan::new(title, author, topics);
        if plan.id == "PLAN_" {
            return Err(Error::Validation(format!(
                "title '{title}' contains no alphanumeric characters to derive an id from"
            )));
        }
        if self.storage.load_plan(&plan.id)?.is_some() {
            return Err(Error::DuplicatePlan {
                id: plan.id.clone(),
            });
        }
        self.storage.save_plan(&plan)?;
        self.storage.save_pointer(&ActivePlanPointer::pointing_at(
            author,
            &plan.id,
            PlanStatus::Planned,
        ))?;
        info!(id = %plan.id, "created plan");
        Ok(plan)
    }

    /// Transition a plan through its lifecycle, keeping timestamps and
    /// the author's pointer in sync:
    ///
    /// - first entry into ACTIVE stamps `started`
    /// - COMPLETE/CANCELLED stamp `completed` and clear the pointer
    /// - ACTIVE/PAUSED set the pointer with the matching badge
    ///
    /// # Errors
    ///
    /// `PlanNotFound` for an unknown id, `InvalidTransition` for an
    /// illegal move (including any move out of a terminal status).
    pub fn set_plan_status(&mut self, id: &str, to: PlanStatus) -> Result<Plan> {
        let mut plan = self
            .storage
            .load_plan(id)?
            .ok_or_else(|| Error::PlanNotFound { id: id.to_string() })?;
        let from = plan.status;
        if !from.can_transition(to) {
            return Err(Error::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        let now = Utc::now();
        plan.status = to;
        plan.updated = now;
        if to == PlanStatus::Active && plan.started.is_none() {
            plan.started = Some(now);
        }
        if to.is_terminal() {
            plan.completed = Some(now);
        }
        self.storage.save_plan(&plan)?;

        if to.is_terminal() {
            // Clear only if the pointer actually references this plan.
            let points_here = self
                .storage
                .load_pointer(&plan.author)?
                .is_some_and(|p| p.current_plan_id.as_deref() == Some(id));
            if points_here {
                self.storage
                    .save_pointer(&ActivePlanPointer::cleared(&plan.author, to))?;
            }
        } else {
            self.storage
                .save_pointer(&ActivePlanPointer::pointing_at(&plan.author, id, to))?;
        }

        info!(id, %from, %to, "plan transition");
        Ok(plan)
    }

    /// `PLANNED -> ACTIVE` or `PAUSED -> ACTIVE`.
    pub fn activate_plan(&mut self, id: &str) -> Result<Plan> {
        self.set_plan_status(id, PlanStatus::Active)
    }

    /// `ACTIVE -> PAUSED`. The pointer is retained with a PAUSED badge.
    pub fn pause_plan(&mut self, id: &str) -> Result<Plan> {
        self.set_plan_status(id, PlanStatus::Paused)
    }

    /// `ACTIVE -> COMPLETE`.
    pub fn complete_plan(&mut self, id: &str) -> Result<Plan> {
        self.set_plan_status(id, PlanStatus::Complete)
    }

    /// Any non-terminal status `-> CANCELLED`.
    pub fn cancel_plan(&mut self, id: &str) -> Result<Plan> {
        self.set_plan_status(id, PlanStatus::Cancelled)
    }

    /// Apply a body edit to a plan. Defaults the CLI uses target the
    /// `## Progress` section.
    ///
    /// # Errors
    ///
    /// `PlanNotFound` for an unknown id; `PatternNotFound` from insert
    /// edits, in which case the file is untouched.
    pub fn edit_plan(&mut self, id: &str, edit: &SectionEdit) -> Result<Plan> {
        let mut plan = self
            .storage
            .load_plan(id)?
            .ok_or_else(|| Error::PlanNotFound { id: id.to_string() })?;
        plan.content = edit.apply(&plan.content)?;
        plan.updated = Utc::now();
        self.storage.save_plan(&plan)?;
        Ok(plan)
    }

    /// Append a progress note to a plan's `## Progress` section.
    pub fn append_progress(&mut self, id: &str, content: &str) -> Result<Plan> {
        self.edit_plan(
            id,
            &SectionEdit::Append {
                section: "## Progress".to_string(),
                content: content.to_string(),
            },
        )
    }

    /// Prepend a progress note at the top of a plan's `## Progress` section.
    pub fn prepend_progress(&mut self, id: &str, content: &str) -> Result<Plan> {
        self.edit_plan(
            id,
            &SectionEdit::Prepend {
                section: "## Progress".to_string(),
                content: content.to_string(),
            },
        )
    }

    /// The plan the author's pointer currently references, if any.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn current_plan(&mut self, author: &str) -> Result<Option<(ActivePlanPointer, Option<Plan>)>> {
        let Some(pointer) = self.storage.load_pointer(author)? else {
            return Ok(None);
        };
        let plan = match &pointer.current_plan_id {
            Some(id) => self.storage.load_plan(id)?,
            None => None,
        };
        Ok(Some((pointer, plan)))
    }

    /// Record a new learned pattern.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or path-unsafe id, an empty title, or
    /// when a pattern with the id already exists.
    pub fn create_pattern(
        &mut self,
        id: &str,
        category: PatternCategory,
        title: &str,
        keywords: Vec<String>,
        content: &str,
    ) -> Result<LearnedPattern> {
        require_path_safe("pattern id", id)?;
        require_nonempty("title", title)?;
        if self.storage.load_pattern(id)?.is_some() {
            return Err(Error::Validation(format!(
                "pattern already exists: {id} (use replace to overwrite)"
            )));
        }
        let pattern = LearnedPattern::new(id, category, title, keywords, content);
        self.storage.save_pattern(&pattern)?;
        info!(id, "created pattern");
        Ok(pattern)
    }

    /// Replace an existing pattern's content (and optionally its title and
    /// keywords), preserving identity and `created`.
    ///
    /// # Errors
    ///
    /// `Validation` when no pattern with the id exists.
    pub fn replace_pattern(
        &mut self,
        id: &str,
        title: Option<&str>,
        keywords: Option<Vec<String>>,
        content: &str,
    ) -> Result<LearnedPattern> {
        let mut pattern = self
            .storage
            .load_pattern(id)?
            .ok_or_else(|| Error::Validation(format!("no pattern with id: {id}")))?;
        if let Some(title) = title {
            pattern.title = title.to_string();
        }
        if let Some(mut keywords) = keywords {
            keywords.sort();
            keywords.dedup();
            pattern.keywords = keywords;
        }
        pattern.content = content.to_string();
        pattern.updated = Utc::now();
        self.storage.save_pattern(&pattern)?;
        Ok(pattern)
    }
}
