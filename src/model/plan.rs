//! Plan model.
//!
//! Plans represent tracked units of work with an explicit lifecycle:
//! `PLANNED -> ACTIVE <-> PAUSED`, with `ACTIVE -> COMPLETE` and
//! `PLANNED/ACTIVE/PAUSED -> CANCELLED` as terminal exits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plan status values, forming the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanStatus {
    Planned,
    Active,
    Paused,
    Complete,
    Cancelled,
}

impl PlanStatus {
    /// Get the string representation for storage and frontmatter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Complete => "COMPLETE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse from a stored string. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLANNED" => Some(Self::Planned),
            "ACTIVE" => Some(Self::Active),
            "PAUSED" => Some(Self::Paused),
            "COMPLETE" => Some(Self::Complete),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether transitioning from `self` to `to` is legal.
    ///
    /// COMPLETE and CANCELLED are terminal: nothing leaves them.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Planned, Self::Active)
                | (Self::Active, Self::Paused)
                | (Self::Paused, Self::Active)
                | (Self::Active, Self::Complete)
                | (Self::Planned | Self::Active | Self::Paused, Self::Cancelled)
        )
    }

    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier derived from the title (`PLAN_<slug>`).
    pub id: String,

    /// Plan title.
    pub title: String,

    /// Author (VCS identity when not given explicitly).
    pub author: String,

    /// Current lifecycle status.
    pub status: PlanStatus,

    /// Topic tags.
    pub topics: Vec<String>,

    /// Creation timestamp.
    pub created: DateTime<Utc>,

    /// Last-touched timestamp; drives query ordering.
    pub updated: DateTime<Utc>,

    /// Set the first time the plan enters ACTIVE.
    pub started: Option<DateTime<Utc>>,

    /// Set when the plan reaches COMPLETE or CANCELLED.
    pub completed: Option<DateTime<Utc>>,

    /// Markdown body with a `## Progress` section.
    pub content: String,
}

/// Derive a plan id from its title: lowercase, non-alphanumeric runs
/// collapse to single underscores, prefixed `PLAN_`.
#[must_use]
pub fn slugify_title(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_underscore = true; // suppress a leading underscore
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            slug.push('_');
            last_underscore = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    format!("PLAN_{slug}")
}

impl Plan {
    /// Create a new PLANNED plan with a skeleton body.
    #[must_use]
    pub fn new(title: &str, author: &str, topics: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: slugify_title(title),
            title: title.to_string(),
            author: author.to_string(),
            status: PlanStatus::Planned,
            topics,
            created: now,
            updated: now,
            started: None,
            completed: None,
            content: format!("# {title}\n\n## Progress\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify_title("Test Plan"), "PLAN_test_plan");
        assert_eq!(slugify_title("Fix  CI!!"), "PLAN_fix_ci");
        assert_eq!(slugify_title("  spaced out  "), "PLAN_spaced_out");
        assert_eq!(slugify_title("v2.0 rollout"), "PLAN_v2_0_rollout");
    }

    #[test]
    fn test_new_plan_defaults() {
        let plan = Plan::new("Auth Rework", "erin", vec!["auth".into()]);
        assert_eq!(plan.id, "PLAN_auth_rework");
        assert_eq!(plan.status, PlanStatus::Planned);
        assert!(plan.started.is_none());
        assert!(plan.content.contains("## Progress"));
    }

    #[test]
    fn test_legal_transitions() {
        use PlanStatus::{Active, Cancelled, Complete, Paused, Planned};
        assert!(Planned.can_transition(Active));
        assert!(Active.can_transition(Paused));
        assert!(Paused.can_transition(Active));
        assert!(Active.can_transition(Complete));
        assert!(Planned.can_transition(Cancelled));
        assert!(Active.can_transition(Cancelled));
        assert!(Paused.can_transition(Cancelled));
    }

    #[test]
    fn test_illegal_transitions_exhaustive() {
        use PlanStatus::{Active, Cancelled, Complete, Paused, Planned};
        let all = [Planned, Active, Paused, Complete, Cancelled];
        let legal = [
            (Planned, Active),
            (Active, Paused),
            (Paused, Active),
            (Active, Complete),
            (Planned, Cancelled),
            (Active, Cancelled),
            (Paused, Cancelled),
        ];
        for from in all {
            for to in all {
                let expected = legal.contains(&(from, to));
                assert_eq!(from.can_transition(to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_status_round_trip() {
        for s in [
            PlanStatus::Planned,
            PlanStatus::Active,
            PlanStatus::Paused,
            PlanStatus::Complete,
            PlanStatus::Cancelled,
        ] {
            assert_eq!(PlanStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(PlanStatus::parse("bogus"), None);
    }
}
