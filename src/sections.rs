//! Markdown section operations.
//!
//! Session and plan bodies are organized into named `##` sections that are
//! independently addressable: append/prepend target a named section
//! (creating it at the document end/start when absent), insert-after and
//! insert-before inject a new section at the first line matching a literal
//! pattern. All operations are pure string transforms; callers decide when
//! and how to persist the result.

use crate::error::{Error, Result};

/// Normalize a section argument to a `##` heading line.
///
/// Accepts both `"Progress"` and `"## Progress"`.
#[must_use]
pub fn normalize_heading(section: &str) -> String {
    let s = section.trim();
    if s.starts_with('#') {
        s.to_string()
    } else {
        format!("## {s}")
    }
}

fn is_heading(line: &str) -> bool {
    line.starts_with("# ") || line.starts_with("## ")
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Index of the heading line for `heading`, if present.
fn find_heading(lines: &[String], heading: &str) -> Option<usize> {
    lines.iter().position(|l| l.trim_end() == heading)
}

/// Exclusive end index of the section starting at `start`: the next
/// h1/h2 heading, or the document end.
fn section_end(lines: &[String], start: usize) -> usize {
    lines[start + 1..]
        .iter()
        .position(|l| is_heading(l))
        .map_or(lines.len(), |i| start + 1 + i)
}

/// Remove one of any adjacent blank-line pairs around index `at`.
///
/// Used after a splice so that block padding never produces runs of
/// blank lines at the seams. Lines away from the splice are untouched.
fn collapse_blanks_at(lines: &mut Vec<String>, at: usize) {
    if at == 0 || at >= lines.len() {
        return;
    }
    while at < lines.len() && is_blank(&lines[at - 1]) && is_blank(&lines[at]) {
        lines.remove(at);
    }
}

fn splice(lines: &mut Vec<String>, at: usize, block: &[String]) {
    let end = at + block.len();
    lines.splice(at..at, block.iter().cloned());
    collapse_blanks_at(lines, end);
    collapse_blanks_at(lines, at);
}

fn join(mut lines: Vec<String>) -> String {
    while lines.last().is_some_and(|l| is_blank(l)) {
        lines.pop();
    }
    if lines.is_empty() {
        String::new()
    } else {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn to_lines(body: &str) -> Vec<String> {
    body.lines().map(str::to_string).collect()
}

/// Append `content` at the end of the named section, creating the section
/// at the document end if absent.
#[must_use]
pub fn append_to_section(body: &str, section: &str, content: &str) -> String {
    let heading = normalize_heading(section);
    let mut lines = to_lines(body);

    if let Some(start) = find_heading(&lines, &heading) {
        let end = section_end(&lines, start);
        let block = vec![String::new(), content.to_string(), String::new()];
        splice(&mut lines, end, &block);
    } else {
        let mut block = Vec::new();
        if !lines.is_empty() {
            block.push(String::new());
        }
        block.extend([heading, String::new(), content.to_string()]);
        let at = lines.len();
        splice(&mut lines, at, &block);
    }
    join(lines)
}

/// Prepend `content` at the top of the named section, creating the section
/// at the document start if absent.
#[must_use]
pub fn prepend_to_section(body: &str, section: &str, content: &str) -> String {
    let heading = normalize_heading(section);
    let mut lines = to_lines(body);

    if let Some(start) = find_heading(&lines, &heading) {
        let block = vec![String::new(), content.to_string(), String::new()];
        splice(&mut lines, start + 1, &block);
    } else {
        let block = vec![
            heading,
            String::new(),
            content.to_string(),
            String::new(),
        ];
        splice(&mut lines, 0, &block);
    }
    join(lines)
}

/// Inject a new section after the first line containing `pattern`.
///
/// # Errors
///
/// Returns [`Error::PatternNotFound`] if no line matches; the input is
/// returned unmodified only through the error path (callers must not have
/// written anything yet).
pub fn insert_section_after(
    body: &str,
    pattern: &str,
    section: &str,
    content: &str,
) -> Result<String> {
    let mut lines = to_lines(body);
    let at = lines
        .iter()
        .position(|l| l.contains(pattern))
        .ok_or_else(|| Error::PatternNotFound {
            pattern: pattern.to_string(),
        })?;

    let block = vec![
        String::new(),
        normalize_heading(section),
        String::new(),
        content.to_string(),
        String::new(),
    ];
    splice(&mut lines, at + 1, &block);
    Ok(join(lines))
}

/// Inject a new section before the first line containing `pattern`.
///
/// # Errors
///
/// Returns [`Error::PatternNotFound`] if no line matches.
pub fn insert_section_before(
    body: &str,
    pattern: &str,
    section: &str,
    content: &str,
) -> Result<String> {
    let mut lines = to_lines(body);
    let at = lines
        .iter()
        .position(|l| l.contains(pattern))
        .ok_or_else(|| Error::PatternNotFound {
            pattern: pattern.to_string(),
        })?;

    let block = vec![
        normalize_heading(section),
        String::new(),
        content.to_string(),
        String::new(),
    ];
    splice(&mut lines, at, &block);
    Ok(join(lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "# Title\n\n## Goal\n\nShip it\n\n## Notes\n\nNone yet\n";

    #[test]
    fn test_append_to_existing_section() {
        let out = append_to_section(BODY, "## Goal", "Step 1 done");
        let goal_pos = out.find("## Goal").unwrap();
        let step_pos = out.find("Step 1 done").unwrap();
        let notes_pos = out.find("## Notes").unwrap();
        assert!(goal_pos < step_pos && step_pos < notes_pos);
        // Prior content untouched
        assert!(out.contains("Ship it"));
        assert!(out.contains("None yet"));
    }

    #[test]
    fn test_append_creates_missing_section_at_end() {
        let out = append_to_section(BODY, "Progress", "Started");
        assert!(out.ends_with("## Progress\n\nStarted\n"));
    }

    #[test]
    fn test_append_to_last_section() {
        let out = append_to_section(BODY, "## Notes", "A note");
        assert!(out.ends_with("None yet\n\nA note\n"));
    }

    #[test]
    fn test_prepend_to_existing_section() {
        let out = prepend_to_section(BODY, "## Notes", "First!");
        let idx_heading = out.find("## Notes").unwrap();
        let idx_new = out.find("First!").unwrap();
        let idx_old = out.find("None yet").unwrap();
        assert!(idx_heading < idx_new && idx_new < idx_old);
    }

    #[test]
    fn test_prepend_creates_missing_section_at_start() {
        let out = prepend_to_section(BODY, "## Blockers", "CI is red");
        assert!(out.starts_with("## Blockers\n\nCI is red\n"));
        assert!(out.contains("# Title"));
    }

    #[test]
    fn test_append_to_empty_section() {
        let body = "## Progress\n\n## Notes\n\nx\n";
        let out = append_to_section(body, "## Progress", "Step 1");
        let progress = out.find("## Progress").unwrap();
        let step = out.find("Step 1").unwrap();
        let notes = out.find("## Notes").unwrap();
        assert!(progress < step && step < notes);
        // No blank-line runs at the seams
        assert!(!out.contains("\n\n\n"));
    }

    #[test]
    fn test_insert_after_pattern() {
        let out = insert_section_after(BODY, "Ship it", "## Follow-up", "Write docs").unwrap();
        let anchor = out.find("Ship it").unwrap();
        let heading = out.find("## Follow-up").unwrap();
        let notes = out.find("## Notes").unwrap();
        assert!(anchor < heading && heading < notes);
        assert!(out.contains("Write docs"));
    }

    #[test]
    fn test_insert_before_heading_pattern() {
        let out = insert_section_before(BODY, "## Notes", "## Risks", "Scope creep").unwrap();
        let risks = out.find("## Risks").unwrap();
        let notes = out.find("## Notes").unwrap();
        assert!(risks < notes);
    }

    #[test]
    fn test_insert_after_missing_pattern_fails() {
        let err = insert_section_after(BODY, "## Nonexistent", "## X", "y").unwrap_err();
        assert!(matches!(err, Error::PatternNotFound { .. }));
    }

    #[test]
    fn test_heading_normalization() {
        assert_eq!(normalize_heading("Progress"), "## Progress");
        assert_eq!(normalize_heading("## Progress"), "## Progress");
        assert_eq!(normalize_heading("  Notes "), "## Notes");
    }

    #[test]
    fn test_empty_body_append() {
        let out = append_to_section("", "## Progress", "Step 1");
        assert_eq!(out, "## Progress\n\nStep 1\n");
    }
}
