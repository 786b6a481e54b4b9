//! Comment persistence behind one capability, [`CommentStore`], with a
//! flat JSON file backend and a realtime document collection backend.

mod document;
mod feed;
mod file;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Backend, Config};
use crate::models::{Comment, CommentPatch};

pub use document::DocumentStore;
pub use feed::{Broadcaster, Event, Snapshot, StoreFault, Subscription};
pub use file::FileStore;

/// Durable record of comments.
///
/// Implementations keep the collection newest-first and notify every
/// subscriber exactly once per successful mutation.
pub trait CommentStore: Send + Sync {
    fn backend(&self) -> Backend;

    /// All comments, newest first.
    fn list(&self) -> Result<Vec<Comment>>;

    fn get(&self, id: &str) -> Result<Option<Comment>>;

    /// Adds a new comment. Fails if the id is already taken.
    fn insert(&self, comment: Comment) -> Result<()>;

    /// Applies `patch` to the comment with `id`, returning the updated
    /// record, or `None` if it does not exist.
    fn patch(&self, id: &str, patch: &CommentPatch) -> Result<Option<Comment>>;

    /// Deletes the comment with `id`. Returns `false` if it did not exist.
    fn remove(&self, id: &str) -> Result<bool>;

    /// Opens a snapshot stream that starts with the current collection.
    fn subscribe(&self) -> Result<Subscription>;

    /// Re-reads durable state and notifies subscribers if it changed
    /// underneath this handle (e.g. another process wrote to it).
    fn refresh(&self) -> Result<bool>;
}

/// Opens the backend selected by `config`, resolving paths against `base`.
pub fn open_store(config: &Config, base: &Path) -> Result<Arc<dyn CommentStore>> {
    let store: Arc<dyn CommentStore> = match config.backend {
        Backend::File => Arc::new(FileStore::open(config.comments_path(base))?),
        Backend::Realtime => Arc::new(DocumentStore::open(config.collection_path(base))?),
    };
    tracing::debug!(backend = config.backend.as_ref(), "opened comment store");
    Ok(store)
}

/// Atomically write content to a file using a temporary file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp = Path::new(&temp_name);

    let mut file = File::create(temp)
        .with_context(|| format!("Failed to create temporary file: {}", temp.display()))?;
    file.write_all(content)
        .context("Failed to write file content")?;
    file.sync_all().context("Failed to sync file")?;
    drop(file);
    fs::rename(temp, path).with_context(|| format!("Failed to rename to {}", path.display()))?;
    Ok(())
}
