//! YAML frontmatter parsing and rendering.
//!
//! Every entity file is a leading `---`-delimited YAML block followed by a
//! markdown body:
//!
//! ```text
//! ---
//! date: 2026-08-23
//! status: in-progress
//! author: erin
//! ---
//! ## Goal
//! ...
//! ```
//!
//! Frontmatter is strictly parsed: a missing block, a missing closing
//! delimiter, malformed YAML, or a missing required key is a hard
//! [`Error::Validation`] at read time, never a warning.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    ActivePlanPointer, LearnedPattern, PatternCategory, PatternStatus, Plan, PlanStatus, Session,
    SessionStatus,
};

const DELIMITER: &str = "---";

/// Split a document into its raw YAML block and body.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the document does not start with a
/// frontmatter block or the closing delimiter is missing.
pub fn split(content: &str) -> Result<(&str, &str)> {
    let trimmed = content.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed.strip_prefix(DELIMITER) else {
        return Err(Error::Validation(
            "document has no YAML frontmatter block".to_string(),
        ));
    };
    let rest = rest.strip_prefix('\r').unwrap_or(rest);
    let Some(rest) = rest.strip_prefix('\n') else {
        return Err(Error::Validation(
            "frontmatter delimiter must be on its own line".to_string(),
        ));
    };

    // The closing delimiter must start a line.
    let close = format!("\n{DELIMITER}");
    let Some(end) = rest.find(&close) else {
        return Err(Error::Validation(
            "frontmatter missing closing delimiter".to_string(),
        ));
    };

    let yaml = &rest[..end];
    let body = rest[end + close.len()..].trim_start_matches(['\r', '\n']);
    Ok((yaml, body))
}

/// Parse a document into typed frontmatter plus body.
///
/// # Errors
///
/// Returns [`Error::Validation`] on structural or YAML failures, including
/// missing required keys.
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<(T, String)> {
    let (yaml, body) = split(content)?;
    let fm: T = serde_yaml_ng::from_str(yaml)
        .map_err(|e| Error::Validation(format!("malformed frontmatter: {e}")))?;
    Ok((fm, body.to_string()))
}

/// Render typed frontmatter plus body into a document.
///
/// Serialization order follows struct field order, so output is
/// deterministic for identical input.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the frontmatter cannot be serialized.
pub fn render<T: Serialize>(fm: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml_ng::to_string(fm)
        .map_err(|e| Error::Validation(format!("cannot serialize frontmatter: {e}")))?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n{body}"))
}

// ============================================================================
// Per-entity frontmatter schemas
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SessionFrontmatter {
    date: chrono::NaiveDate,
    title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    topics: Vec<String>,
    author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan: Option<String>,
    status: SessionStatus,
    created: chrono::DateTime<chrono::Utc>,
    updated: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlanFrontmatter {
    id: String,
    title: String,
    author: String,
    status: PlanStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    topics: Vec<String>,
    created: chrono::DateTime<chrono::Utc>,
    updated: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PointerFrontmatter {
    author: String,
    // Serialized even when null so the cleared state is visible in the file.
    plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<PlanStatus>,
    updated: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PatternFrontmatter {
    id: String,
    category: PatternCategory,
    title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    keywords: Vec<String>,
    #[serde(default)]
    status: PatternStatus,
    created: chrono::DateTime<chrono::Utc>,
    updated: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Entity <-> document conversions
// ============================================================================

/// Render a session to its markdown document.
pub fn session_to_markdown(s: &Session) -> Result<String> {
    let fm = SessionFrontmatter {
        date: s.date,
        title: s.title.clone(),
        topics: s.topics.clone(),
        author: s.author.clone(),
        plan: s.plan.clone(),
        status: s.status,
        created: s.created,
        updated: s.updated,
    };
    render(&fm, &s.content)
}

/// Parse a session from its markdown document.
pub fn session_from_markdown(content: &str) -> Result<Session> {
    let (fm, body): (SessionFrontmatter, String) = parse(content)?;
    Ok(Session {
        date: fm.date,
        title: fm.title,
        topics: fm.topics,
        author: fm.author,
        plan: fm.plan,
        status: fm.status,
        created: fm.created,
        updated: fm.updated,
        content: body,
    })
}

/// Render a plan to its markdown document.
pub fn plan_to_markdown(p: &Plan) -> Result<String> {
    let fm = PlanFrontmatter {
        id: p.id.clone(),
        title: p.title.clone(),
        author: p.author.clone(),
        status: p.status,
        topics: p.topics.clone(),
        created: p.created,
        updated: p.updated,
        started: p.started,
        completed: p.completed,
    };
    render(&fm, &p.content)
}

/// Parse a plan from its markdown document.
pub fn plan_from_markdown(content: &str) -> Result<Plan> {
    let (fm, body): (PlanFrontmatter, String) = parse(content)?;
    Ok(Plan {
        id: fm.id,
        title: fm.title,
        author: fm.author,
        status: fm.status,
        topics: fm.topics,
        created: fm.created,
        updated: fm.updated,
        started: fm.started,
        completed: fm.completed,
        content: body,
    })
}

/// Render an active-plan pointer to its markdown document.
pub fn pointer_to_markdown(p: &ActivePlanPointer) -> Result<String> {
    let fm = PointerFrontmatter {
        author: p.author.clone(),
        plan: p.current_plan_id.clone(),
        status: p.status,
        updated: p.updated,
    };
    let body = match (&p.current_plan_id, p.status) {
        (Some(id), Some(status)) => format!("Current plan: **{id}** ({status})\n"),
        (Some(id), None) => format!("Current plan: **{id}**\n"),
        (None, _) => "No active plan.\n".to_string(),
    };
    render(&fm, &body)
}

/// Parse an active-plan pointer from its markdown document.
pub fn pointer_from_markdown(content: &str) -> Result<ActivePlanPointer> {
    let (fm, _body): (PointerFrontmatter, String) = parse(content)?;
    Ok(ActivePlanPointer {
        author: fm.author,
        current_plan_id: fm.plan,
        status: fm.status,
        updated: fm.updated,
    })
}

/// Render a learned pattern to its markdown document.
pub fn pattern_to_markdown(p: &LearnedPattern) -> Result<String> {
    let fm = PatternFrontmatter {
        id: p.id.clone(),
        category: p.category,
        title: p.title.clone(),
        keywords: p.keywords.clone(),
        status: p.status,
        created: p.created,
        updated: p.updated,
    };
    render(&fm, &p.content)
}

/// Parse a learned pattern from its markdown document.
pub fn pattern_from_markdown(content: &str) -> Result<LearnedPattern> {
    let (fm, body): (PatternFrontmatter, String) = parse(content)?;
    Ok(LearnedPattern {
        id: fm.id,
        category: fm.category,
        title: fm.title,
        keywords: fm.keywords,
        status: fm.status,
        created: fm.created,
        updated: fm.updated,
        content: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_session_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let mut s = Session::new(date, "Index refactor", "erin", vec!["storage".into()]);
        s.plan = Some("PLAN_index_refactor".into());

        let doc = session_to_markdown(&s).unwrap();
        assert!(doc.starts_with("---\n"));

        let parsed = session_from_markdown(&doc).unwrap();
        assert_eq!(parsed.date, s.date);
        assert_eq!(parsed.title, s.title);
        assert_eq!(parsed.topics, s.topics);
        assert_eq!(parsed.plan, s.plan);
        assert_eq!(parsed.content, s.content);
    }

    #[test]
    fn test_plan_round_trip_preserves_timestamps() {
        let mut p = Plan::new("Auth Rework", "erin", vec![]);
        p.status = PlanStatus::Active;
        p.started = Some(p.created);

        let doc = plan_to_markdown(&p).unwrap();
        let parsed = plan_from_markdown(&doc).unwrap();
        assert_eq!(parsed.id, "PLAN_auth_rework");
        assert_eq!(parsed.status, PlanStatus::Active);
        assert_eq!(parsed.started, p.started);
        assert!(parsed.completed.is_none());
    }

    #[test]
    fn test_pointer_serializes_null_plan() {
        let p = ActivePlanPointer::cleared("erin", PlanStatus::Complete);
        let doc = pointer_to_markdown(&p).unwrap();
        assert!(doc.contains("plan: null"));

        let parsed = pointer_from_markdown(&doc).unwrap();
        assert!(parsed.current_plan_id.is_none());
        assert_eq!(parsed.status, Some(PlanStatus::Complete));
    }

    #[test]
    fn test_missing_frontmatter_rejected() {
        let err = session_from_markdown("## Goal\nno frontmatter here\n").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_unclosed_frontmatter_rejected() {
        let err = split("---\ndate: 2026-01-01\n").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_missing_required_key_rejected() {
        // No author key.
        let doc = "---\ndate: 2026-08-23\ntitle: x\nstatus: in-progress\n\
                   created: 2026-08-23T00:00:00Z\nupdated: 2026-08-23T00:00:00Z\n---\n\nbody\n";
        let err = session_from_markdown(doc).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_inline_topic_list_syntax() {
        let doc = "---\ndate: 2026-08-23\ntitle: x\ntopics: [a, b]\nauthor: erin\n\
                   status: in-progress\ncreated: 2026-08-23T00:00:00Z\n\
                   updated: 2026-08-23T00:00:00Z\n---\n\nbody\n";
        let s = session_from_markdown(doc).unwrap();
        assert_eq!(s.topics, vec!["a", "b"]);
        assert_eq!(s.content, "body\n");
    }
}
