//! Backend resolution and construction.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::config::{self, FileConfig};
use crate::error::{Error, Result};
use crate::storage::{JsonStorage, SqliteStorage, StorageAdapter};

/// The available storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Json,
    Sqlite,
}

impl AdapterKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        }
    }
}

impl FromStr for AdapterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(Error::UnsupportedAdapter {
                requested: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to [`open_storage`], already past CLI parsing.
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// Backend override; `None` falls back to config, then JSON.
    pub adapter: Option<AdapterKind>,
    /// Knowledge-store directory override.
    pub store_dir: Option<PathBuf>,
    /// SQLite database path override.
    pub db_path: Option<PathBuf>,
}

/// Resolve a backend and open it, running its idempotent `init`.
///
/// Backend priority: explicit option, `adapter` hint in `config.json`,
/// then the JSON backend. The JSON backend is rooted at the resolved
/// store directory; SQLite at the resolved database path.
///
/// # Errors
///
/// Returns `UnsupportedAdapter` for an unknown config hint and
/// `StorageInit` when the store cannot be established.
pub fn open_storage(opts: &StorageOptions) -> Result<Box<dyn StorageAdapter>> {
    let store_dir = config::resolve_store_dir(opts.store_dir.as_deref())?;
    let file_config = FileConfig::load(&store_dir)?;

    let kind = match (opts.adapter, &file_config.adapter) {
        (Some(kind), _) => kind,
        (None, Some(hint)) => hint.parse()?,
        (None, None) => AdapterKind::Json,
    };

    debug!(adapter = %kind, store_dir = %store_dir.display(), "opening storage");

    match kind {
        AdapterKind::Json => Ok(Box::new(JsonStorage::open(&store_dir)?)),
        AdapterKind::Sqlite => {
            let db_path = config::resolve_db_path(opts.db_path.as_deref(), &file_config);
            Ok(Box::new(SqliteStorage::open(&db_path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_adapter_kind_parses_known_names() {
        assert_eq!("json".parse::<AdapterKind>().unwrap(), AdapterKind::Json);
        assert_eq!("SQLite".parse::<AdapterKind>().unwrap(), AdapterKind::Sqlite);
    }

    #[test]
    fn test_unknown_adapter_is_rejected() {
        let err = "postgres".parse::<AdapterKind>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedAdapter { .. }));
    }

    #[test]
    fn test_default_backend_is_json() {
        let dir = TempDir::new().unwrap();
        let opts = StorageOptions {
            store_dir: Some(dir.path().to_path_buf()),
            ..StorageOptions::default()
        };
        open_storage(&opts).unwrap();
        // JSON backend layout was created in the store dir.
        assert!(dir.path().join("context-index.json").is_file());
    }

    #[test]
    fn test_config_hint_selects_sqlite() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("data").join("test.db");
        std::fs::write(
            dir.path().join("config.json"),
            format!(
                r#"{{"adapter": "sqlite", "databasePath": "{}"}}"#,
                db.display()
            ),
        )
        .unwrap();
        let opts = StorageOptions {
            store_dir: Some(dir.path().to_path_buf()),
            ..StorageOptions::default()
        };
        open_storage(&opts).unwrap();
        assert!(db.is_file());
    }

    #[test]
    fn test_explicit_adapter_beats_config_hint() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"adapter": "sqlite"}"#).unwrap();
        let opts = StorageOptions {
            adapter: Some(AdapterKind::Json),
            store_dir: Some(dir.path().to_path_buf()),
            db_path: None,
        };
        open_storage(&opts).unwrap();
        assert!(dir.path().join("context-index.json").is_file());
    }
}
