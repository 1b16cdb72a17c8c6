//! Index maintenance command implementations.

use crate::cli::IndexCommands;
use crate::error::Result;
use crate::storage::{self, StorageOptions};

/// Execute index commands.
pub fn execute(command: &IndexCommands, opts: &StorageOptions, json: bool) -> Result<()> {
    match command {
        IndexCommands::Rebuild => rebuild(opts, json),
    }
}

fn rebuild(opts: &StorageOptions, json: bool) -> Result<()> {
    let mut storage = storage::open_storage(opts)?;
    storage.rebuild_index()?;

    if json {
        println!("{}", serde_json::json!({ "rebuilt": true }));
    } else {
        println!("Index rebuilt.");
    }

    Ok(())
}
