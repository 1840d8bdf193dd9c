pub mod hash;
pub mod inspect;
pub mod migrate;
pub mod types;

pub use hash::{hash, HashArgs};
pub use inspect::{inspect, InspectArgs};
pub use migrate::{migrate, MigrateArgs};
pub use types::{types, TypesArgs};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Read a persisted payload from disk
pub fn read_payload(path: &Path) -> Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// A file, or every `.json` file under a directory
pub fn collect_payload_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow::anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.into_path()),
            Err(err) => {
                warn!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "json"))
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name != crate::config::DEFAULT_CONFIG_NAME)
        })
        .collect();
    files.sort();
    debug!(input = %input.display(), files = files.len(), "collected payload files");
    Ok(files)
}
