//! Error types for the AIKnowSys CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=storage, 3=not_found, 4=validation, etc.)
//! - Retryability flags for agent self-correction
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::model::PlanStatus;

/// Result type alias for AIKnowSys operations.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Error Code
// ============================================================================

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Agents match on the string; shell scripts on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Storage (exit 2)
    StorageInit,
    UnsupportedAdapter,
    DatabaseError,

    // Not Found (exit 3)
    SessionNotFound,
    PlanNotFound,
    PatternNotFound,

    // Validation (exit 4)
    Validation,

    // Conflict (exit 5)
    DuplicatePlan,
    InvalidTransition,

    // I/O (exit 8)
    StorageIo,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::StorageInit => "STORAGE_INIT_ERROR",
            Self::UnsupportedAdapter => "UNSUPPORTED_ADAPTER",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::PlanNotFound => "PLAN_NOT_FOUND",
            Self::PatternNotFound => "PATTERN_NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::DuplicatePlan => "DUPLICATE_PLAN",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::StorageIo => "STORAGE_IO_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::StorageInit | Self::UnsupportedAdapter | Self::DatabaseError => 2,
            Self::SessionNotFound | Self::PlanNotFound | Self::PatternNotFound => 3,
            Self::Validation => 4,
            Self::DuplicatePlan | Self::InvalidTransition => 5,
            Self::StorageIo => 8,
        }
    }

    /// Whether an agent should retry with corrected input.
    ///
    /// True for validation errors and conflicts the agent can route around
    /// (pick a new title, check the current status first). False for
    /// not-found, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Validation
                | Self::DuplicatePlan
                | Self::InvalidTransition
                | Self::UnsupportedAdapter
        )
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Errors that can occur in AIKnowSys operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage init failed at {path}: {message}")]
    StorageInit { path: PathBuf, message: String },

    #[error("Unsupported storage adapter: '{requested}' (expected 'json' or 'sqlite')")]
    UnsupportedAdapter { requested: String },

    #[error("Storage I/O error at {path}: {message}")]
    StorageIo { path: PathBuf, message: String },

    #[error("Plan already exists: {id}")]
    DuplicatePlan { id: String },

    #[error("Invalid plan transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: PlanStatus,
        to: PlanStatus,
    },

    #[error("Pattern not found in document: {pattern}")]
    PatternNotFound { pattern: String },

    #[error("Session not found{}", date.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    SessionNotFound { date: Option<String> },

    #[error("Plan not found: {id}")]
    PlanNotFound { id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::StorageInit { .. } => ErrorCode::StorageInit,
            Self::UnsupportedAdapter { .. } => ErrorCode::UnsupportedAdapter,
            Self::StorageIo { .. } => ErrorCode::StorageIo,
            Self::DuplicatePlan { .. } => ErrorCode::DuplicatePlan,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::PatternNotFound { .. } => ErrorCode::PatternNotFound,
            Self::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            Self::PlanNotFound { .. } => ErrorCode::PlanNotFound,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Serialization(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// The identifier the error is about, if any (plan id, session date,
    /// missing pattern, offending path). Machine callers key off this.
    #[must_use]
    pub fn offending_id(&self) -> Option<String> {
        match self {
            Self::StorageInit { path, .. } | Self::StorageIo { path, .. } => {
                Some(path.display().to_string())
            }
            Self::UnsupportedAdapter { requested } => Some(requested.clone()),
            Self::DuplicatePlan { id }
            | Self::InvalidTransition { id, .. }
            | Self::PlanNotFound { id } => Some(id.clone()),
            Self::PatternNotFound { pattern } => Some(pattern.clone()),
            Self::SessionNotFound { date } => date.clone(),
            Self::Validation(_) | Self::Database(_) | Self::Serialization(_) => None,
        }
    }

    /// Context-aware recovery hint for agents and humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::UnsupportedAdapter { .. } => {
                Some("Valid adapters: json (default), sqlite".to_string())
            }

            Self::DuplicatePlan { id } => Some(format!(
                "A plan with id '{id}' already exists. Pick a different title, \
                 or update the existing plan with `aks plan append {id}`."
            )),

            Self::InvalidTransition { id, from, .. } => Some(format!(
                "Plan '{id}' is currently {from}. \
                 Allowed: PLANNED->ACTIVE, ACTIVE<->PAUSED, ACTIVE->COMPLETE, \
                 PLANNED/ACTIVE/PAUSED->CANCELLED."
            )),

            Self::SessionNotFound { date } => Some(match date {
                Some(d) => format!(
                    "No session recorded for {d}. Use `aks session list` to see \
                     existing sessions, or `aks session create` to start one."
                ),
                None => "No sessions recorded yet. Start one with \
                         `aks session create \"topic\"`."
                    .to_string(),
            }),

            Self::PlanNotFound { id } => Some(format!(
                "No plan with id '{id}'. Use `aks plan list` to see available plans."
            )),

            Self::PatternNotFound { pattern } => Some(format!(
                "No line matching '{pattern}' in the target document. \
                 Use append/prepend to add a section unconditionally."
            )),

            Self::StorageIo { .. } => {
                Some("If the index is stale or corrupt, run `aks index rebuild`.".to_string())
            }

            Self::StorageInit { .. }
            | Self::Validation(_)
            | Self::Database(_)
            | Self::Serialization(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, offending identifier, retryability,
    /// exit code, and optional recovery hint. Agents parse this instead
    /// of stderr text.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(id) = self.offending_id() {
            obj["error"]["id"] = serde_json::Value::String(id);
        }
        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        let dup = Error::DuplicatePlan { id: "PLAN_x".into() };
        assert_eq!(dup.exit_code(), 5);

        let nf = Error::PlanNotFound { id: "PLAN_x".into() };
        assert_eq!(nf.exit_code(), 3);

        let val = Error::Validation("bad date".into());
        assert_eq!(val.exit_code(), 4);

        let io = Error::StorageIo {
            path: PathBuf::from("/tmp/x"),
            message: "denied".into(),
        };
        assert_eq!(io.exit_code(), 8);
    }

    #[test]
    fn test_structured_json_shape() {
        let err = Error::InvalidTransition {
            id: "PLAN_test".into(),
            from: PlanStatus::Complete,
            to: PlanStatus::Active,
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "INVALID_TRANSITION");
        assert_eq!(json["error"]["id"], "PLAN_test");
        assert_eq!(json["error"]["retryable"], true);
        assert!(json["error"]["message"].as_str().unwrap().contains("COMPLETE"));
    }

    #[test]
    fn test_transition_message_names_both_states() {
        let err = Error::InvalidTransition {
            id: "PLAN_a".into(),
            from: PlanStatus::Cancelled,
            to: PlanStatus::Paused,
        };
        let msg = err.to_string();
        assert!(msg.contains("CANCELLED"));
        assert!(msg.contains("PAUSED"));
    }

    #[test]
    fn test_io_error_carries_path() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::io("/store/context-index.json", &inner);
        assert!(err.to_string().contains("context-index.json"));
        assert_eq!(err.offending_id().unwrap(), "/store/context-index.json");
    }
}
