//! Active plan pointer.
//!
//! One record per author, holding the plan the author currently has
//! claimed. All reads and writes go through the mutation engine; nothing
//! else touches pointer files.
//!
//! Pointer rules:
//! - set (with an ACTIVE badge) when a plan transitions to ACTIVE
//! - retained (badge flips to PAUSED) when the plan pauses
//! - cleared to `None` when the plan reaches COMPLETE or CANCELLED
//! - written with a PLANNED badge on plan creation, which does not
//!   imply activation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PlanStatus;

/// Per-author active-plan record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePlanPointer {
    /// Author this pointer belongs to; one pointer per author.
    pub author: String,

    /// The claimed plan, or `None` after a terminal transition.
    pub current_plan_id: Option<String>,

    /// Status badge of the referenced plan at last write.
    pub status: Option<PlanStatus>,

    /// Last write timestamp.
    pub updated: DateTime<Utc>,
}

impl ActivePlanPointer {
    /// Pointer referencing `plan_id` with the given badge.
    #[must_use]
    pub fn pointing_at(author: &str, plan_id: &str, status: PlanStatus) -> Self {
        Self {
            author: author.to_string(),
            current_plan_id: Some(plan_id.to_string()),
            status: Some(status),
            updated: Utc::now(),
        }
    }

    /// Cleared pointer, keeping the terminal badge for display.
    #[must_use]
    pub fn cleared(author: &str, last_status: PlanStatus) -> Self {
        Self {
            author: author.to_string(),
            current_plan_id: None,
            status: Some(last_status),
            updated: Utc::now(),
        }
    }

    /// Filename for this pointer under the plans directory.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("active-{}.md", self.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_states() {
        let p = ActivePlanPointer::pointing_at("erin", "PLAN_x", PlanStatus::Active);
        assert_eq!(p.current_plan_id.as_deref(), Some("PLAN_x"));
        assert_eq!(p.filename(), "active-erin.md");

        let c = ActivePlanPointer::cleared("erin", PlanStatus::Complete);
        assert!(c.current_plan_id.is_none());
        assert_eq!(c.status, Some(PlanStatus::Complete));
    }
}
