use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::Config;
use crate::migrate::{MigratedComment, migrate};
use crate::store::{DocumentStore, FileStore};

/// Copies the JSON file (`from`, or the configured one) into the realtime
/// collection of the guestbook at `base`.
pub fn run(base: &Path, config: &Config, from: Option<PathBuf>) -> Result<Vec<MigratedComment>> {
    let source = FileStore::open(from.unwrap_or_else(|| config.comments_path(base)))?;
    let target = DocumentStore::open(config.collection_path(base))?;
    migrate(&source, &target, &config.time_zone()?)
}
