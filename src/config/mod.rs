//! Configuration and environment resolution.
//!
//! Everything here is a priority chain: explicit flag, then environment
//! variable, then config file, then a computed default. Nothing in this
//! module performs storage I/O beyond reading `config.json`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable overriding the knowledge-store directory.
pub const ENV_STORE_DIR: &str = "AIKNOWSYS_DIR";

/// Environment variable overriding the SQLite database path.
pub const ENV_DB_PATH: &str = "AIKNOWSYS_DB_PATH";

/// Environment variable overriding the author identity.
pub const ENV_AUTHOR: &str = "AIKNOWSYS_AUTHOR";

/// Directory name of a knowledge store inside a project.
pub const STORE_DIR_NAME: &str = ".aiknowsys";

/// Optional per-store settings, read from `config.json` at the store root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    /// SQLite database path override.
    pub database_path: Option<PathBuf>,
    /// Backend hint: `"json"` or `"sqlite"`.
    pub adapter: Option<String>,
}

impl FileConfig {
    /// Load `config.json` from a store directory. A missing file yields
    /// defaults; a malformed file is a validation error, not a silent
    /// fallback.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on malformed JSON, `StorageIo` on read failure.
    pub fn load(store_dir: &Path) -> Result<Self> {
        let path = store_dir.join("config.json");
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::io(&path, &e)),
        };
        serde_json::from_str(&raw)
            .map_err(|e| Error::Validation(format!("malformed {}: {e}", path.display())))
    }
}

/// Walk up from `start` looking for a `.git` marker.
fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Resolve the knowledge-store directory.
///
/// Priority: explicit flag, `AIKNOWSYS_DIR`, `.aiknowsys` at the
/// enclosing git root, `.aiknowsys` under the current directory.
///
/// # Errors
///
/// Returns `StorageInit` if the current directory cannot be determined.
pub fn resolve_store_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(ENV_STORE_DIR) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let cwd = std::env::current_dir().map_err(|e| Error::StorageInit {
        path: PathBuf::from("."),
        message: format!("cannot determine current directory: {e}"),
    })?;
    let root = find_git_root(&cwd).unwrap_or(cwd);
    Ok(root.join(STORE_DIR_NAME))
}

/// Resolve the SQLite database path.
///
/// Priority: explicit flag, `AIKNOWSYS_DB_PATH`, `databasePath` from
/// `config.json`, then `~/.aiknowsys/data/aiknowsys.db` so one database
/// is shared across projects by default.
#[must_use]
pub fn resolve_db_path(explicit: Option<&Path>, config: &FileConfig) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = &config.database_path {
        return path.clone();
    }
    let home = directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
    home.join(STORE_DIR_NAME).join("data").join("aiknowsys.db")
}

/// Resolve the author identity.
///
/// Priority: explicit flag, `AIKNOWSYS_AUTHOR`, `git config user.name`,
/// `$USER`, then the literal `"unknown"`.
#[must_use]
pub fn default_author(explicit: Option<&str>) -> String {
    if let Some(author) = explicit {
        return author.to_string();
    }
    if let Ok(author) = std::env::var(ENV_AUTHOR) {
        if !author.is_empty() {
            return author;
        }
    }
    if let Some(name) = git_user_name() {
        return name;
    }
    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            return user;
        }
    }
    "unknown".to_string()
}

fn git_user_name() -> Option<String> {
    let output = Command::new("git")
        .args(["config", "user.name"])
        .output()
        .ok()?;
    if !output.status.success() {
        debug!("git config user.name unavailable");
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = FileConfig::load(dir.path()).unwrap();
        assert!(config.database_path.is_none());
        assert!(config.adapter.is_none());
    }

    #[test]
    fn test_config_parses_camel_case_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"databasePath": "/tmp/x.db", "adapter": "sqlite"}"#,
        )
        .unwrap();
        let config = FileConfig::load(dir.path()).unwrap();
        assert_eq!(config.database_path.as_deref(), Some(Path::new("/tmp/x.db")));
        assert_eq!(config.adapter.as_deref(), Some("sqlite"));
    }

    #[test]
    fn test_malformed_config_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "{nope").unwrap();
        assert!(matches!(
            FileConfig::load(dir.path()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_db_path_prefers_explicit_over_config() {
        let config = FileConfig {
            database_path: Some(PathBuf::from("/from/config.db")),
            adapter: None,
        };
        assert_eq!(
            resolve_db_path(Some(Path::new("/explicit.db")), &config),
            PathBuf::from("/explicit.db")
        );
        // Env is process-global, so only the config branch is asserted here.
        if std::env::var(ENV_DB_PATH).is_err() {
            assert_eq!(
                resolve_db_path(None, &config),
                PathBuf::from("/from/config.db")
            );
        }
    }

    #[test]
    fn test_explicit_author_wins() {
        assert_eq!(default_author(Some("erin")), "erin");
    }

    #[test]
    fn test_explicit_store_dir_wins() {
        let dir = resolve_store_dir(Some(Path::new("/somewhere/.aiknowsys"))).unwrap();
        assert_eq!(dir, PathBuf::from("/somewhere/.aiknowsys"));
    }
}
