//! Learned pattern model.
//!
//! Patterns are reusable, keyword-indexed knowledge snippets captured by
//! extraction tooling or by hand. The core stores, lists, and searches
//! them; beyond a full-content replace it never edits one in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pattern categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    ErrorResolution,
    UserCorrections,
    Workarounds,
    DebuggingTechniques,
    ProjectSpecific,
}

impl PatternCategory {
    /// Get the string representation for storage and frontmatter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorResolution => "error_resolution",
            Self::UserCorrections => "user_corrections",
            Self::Workarounds => "workarounds",
            Self::DebuggingTechniques => "debugging_techniques",
            Self::ProjectSpecific => "project_specific",
        }
    }

    /// Parse from a stored string. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error_resolution" => Some(Self::ErrorResolution),
            "user_corrections" => Some(Self::UserCorrections),
            "workarounds" => Some(Self::Workarounds),
            "debugging_techniques" => Some(Self::DebuggingTechniques),
            "project_specific" => Some(Self::ProjectSpecific),
            _ => None,
        }
    }
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state. The draft/approval workflow itself is external; the
/// core only persists the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStatus {
    Draft,
    Approved,
}

impl PatternStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

impl Default for PatternStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// A learned pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    /// Unique, immutable identifier.
    pub id: String,

    /// Category bucket.
    pub category: PatternCategory,

    /// Human-readable title.
    pub title: String,

    /// Keywords for lookup. Stored sorted for deterministic output.
    pub keywords: Vec<String>,

    /// Approval state.
    pub status: PatternStatus,

    /// Creation timestamp.
    pub created: DateTime<Utc>,

    /// Last-touched timestamp.
    pub updated: DateTime<Utc>,

    /// Markdown body.
    pub content: String,
}

impl LearnedPattern {
    /// Create a new draft pattern. Keywords are deduplicated and sorted.
    #[must_use]
    pub fn new(
        id: &str,
        category: PatternCategory,
        title: &str,
        mut keywords: Vec<String>,
        content: &str,
    ) -> Self {
        keywords.sort();
        keywords.dedup();
        let now = Utc::now();
        Self {
            id: id.to_string(),
            category,
            title: title.to_string(),
            keywords,
            status: PatternStatus::Draft,
            created: now,
            updated: now,
            content: content.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_sorted_and_deduped() {
        let p = LearnedPattern::new(
            "borrowck_clone_loop",
            PatternCategory::ErrorResolution,
            "Clone before iterating",
            vec!["loop".into(), "borrow".into(), "loop".into()],
            "Clone the collection when the loop body needs &mut self.",
        );
        assert_eq!(p.keywords, vec!["borrow", "loop"]);
        assert_eq!(p.status, PatternStatus::Draft);
    }

    #[test]
    fn test_category_round_trip() {
        for c in [
            PatternCategory::ErrorResolution,
            PatternCategory::UserCorrections,
            PatternCategory::Workarounds,
            PatternCategory::DebuggingTechniques,
            PatternCategory::ProjectSpecific,
        ] {
            assert_eq!(PatternCategory::parse(c.as_str()), Some(c));
        }
        assert_eq!(PatternCategory::parse("misc"), None);
    }
}
