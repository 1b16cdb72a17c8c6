//! Initialize a knowledge store.
//!
//! Creates the store directory (default `.aiknowsys` at the git root),
//! records the chosen backend in `config.json`, and runs the backend's
//! idempotent setup so the first mutation never races directory creation.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::config;
use crate::error::{Error, Result};
use crate::storage::{self, AdapterKind, StorageOptions};

#[derive(Serialize)]
struct InitOutput {
    path: PathBuf,
    adapter: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<PathBuf>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `Validation` if the store is already initialized (without
/// `--force`), `UnsupportedAdapter` for an unknown backend, and
/// `StorageInit` if setup fails.
pub fn execute(backend: &str, force: bool, opts: &StorageOptions, json: bool) -> Result<()> {
    let kind: AdapterKind = backend.parse()?;
    let store_dir = config::resolve_store_dir(opts.store_dir.as_deref())?;

    let config_path = store_dir.join("config.json");
    if config_path.exists() && !force {
        return Err(Error::Validation(format!(
            "already initialized at {} (use --force to reinitialize)",
            store_dir.display()
        )));
    }

    fs::create_dir_all(&store_dir).map_err(|e| Error::StorageInit {
        path: store_dir.clone(),
        message: e.to_string(),
    })?;
    fs::write(
        &config_path,
        format!("{{\n  \"adapter\": \"{kind}\"\n}}\n"),
    )
    .map_err(|e| Error::io(&config_path, &e))?;

    // Eager setup: directories/index for JSON, schema for SQLite.
    let mut resolved = opts.clone();
    resolved.adapter = Some(kind);
    resolved.store_dir = Some(store_dir.clone());
    storage::open_storage(&resolved)?;

    let database = match kind {
        AdapterKind::Sqlite => Some(config::resolve_db_path(
            opts.db_path.as_deref(),
            &config::FileConfig::load(&store_dir)?,
        )),
        AdapterKind::Json => None,
    };

    if json {
        let output = InitOutput {
            path: store_dir,
            adapter: kind.as_str(),
            database,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized knowledge store at {}", store_dir.display());
        println!("  Backend: {kind}");
        if let Some(db) = database {
            println!("  Database: {}", db.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn opts(dir: &TempDir) -> StorageOptions {
        StorageOptions {
            adapter: None,
            store_dir: Some(dir.path().join(".aiknowsys")),
            db_path: None,
        }
    }

    #[test]
    fn test_init_creates_store_and_config() {
        let dir = TempDir::new().unwrap();
        execute("json", false, &opts(&dir), false).unwrap();

        let store = dir.path().join(".aiknowsys");
        assert!(store.join("config.json").is_file());
        assert!(store.join("context-index.json").is_file());
        assert!(store.join("sessions").is_dir());
    }

    #[test]
    fn test_reinit_requires_force() {
        let dir = TempDir::new().unwrap();
        execute("json", false, &opts(&dir), false).unwrap();

        let err = execute("json", false, &opts(&dir), false).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        execute("json", true, &opts(&dir), false).unwrap();
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let dir = TempDir::new().unwrap();
        let err = execute("postgres", false, &opts(&dir), false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAdapter { .. }));
    }

    #[test]
    fn test_sqlite_init_creates_database() {
        let dir = TempDir::new().unwrap();
        let mut o = opts(&dir);
        o.db_path = Some(dir.path().join("data").join("test.db"));
        execute("sqlite", false, &o, false).unwrap();
        assert!(dir.path().join("data").join("test.db").is_file());
    }
}
