//! Session model.
//!
//! A session records one work episode. There is at most one session file
//! per calendar date; the date is immutable after creation and doubles as
//! the session's identity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Session status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    InProgress,
    Complete,
    Abandoned,
}

impl SessionStatus {
    /// Get the string representation for storage and frontmatter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
            Self::Abandoned => "abandoned",
        }
    }

    /// Parse from a stored string. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in-progress" => Some(Self::InProgress),
            "complete" => Some(Self::Complete),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::InProgress
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A work session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session date; immutable, also encoded in the filename.
    pub date: NaiveDate,

    /// Session title / topic line.
    pub title: String,

    /// Topic tags.
    pub topics: Vec<String>,

    /// Author (VCS identity when not given explicitly).
    pub author: String,

    /// Weak back-reference to a plan id. Lookup only, no ownership.
    pub plan: Option<String>,

    /// Current status.
    pub status: SessionStatus,

    /// Creation timestamp.
    pub created: DateTime<Utc>,

    /// Last-touched timestamp; drives query ordering.
    pub updated: DateTime<Utc>,

    /// Markdown body organized into named `##` sections.
    pub content: String,
}

impl Session {
    /// Create a new in-progress session with the skeleton body.
    #[must_use]
    pub fn new(date: NaiveDate, title: &str, author: &str, topics: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            date,
            title: title.to_string(),
            topics,
            author: author.to_string(),
            plan: None,
            status: SessionStatus::InProgress,
            created: now,
            updated: now,
            content: format!("# {title}\n\n## Goal\n\n## Changes\n\n## Notes\n"),
        }
    }

    /// Filename for this session under the sessions directory.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}-session.md", self.date.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_skeleton() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let s = Session::new(date, "Index refactor", "erin", vec!["storage".into()]);
        assert_eq!(s.status, SessionStatus::InProgress);
        assert!(s.content.contains("## Goal"));
        assert!(s.content.contains("## Changes"));
        assert!(s.content.contains("## Notes"));
        assert_eq!(s.filename(), "2026-08-23-session.md");
    }

    #[test]
    fn test_status_round_trip() {
        for s in [
            SessionStatus::InProgress,
            SessionStatus::Complete,
            SessionStatus::Abandoned,
        ] {
            assert_eq!(SessionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SessionStatus::parse("IN-PROGRESS"), None);
    }
}
