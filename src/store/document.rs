use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use super::{Broadcaster, CommentStore, StoreFault, Subscription, atomic_write};
use crate::config::Backend;
use crate::models::{Comment, CommentPatch};

/// One stored document: the comment plus its insertion sequence number,
/// which breaks ties between equal creation times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Document {
    seq: u64,
    comment: Comment,
}

impl Document {
    fn file_path(&self, base: &Path) -> PathBuf {
        base.join(format!("{}.toml", self.comment.id))
    }

    fn write_file(&self, base: &Path) -> Result<()> {
        let content = toml::to_string(self).context("Failed to serialize document")?;
        atomic_write(&self.file_path(base), content.as_bytes())
    }
}

#[derive(Default)]
struct Collection {
    docs: HashMap<String, Document>,
    next_seq: u64,
}

impl Collection {
    /// Load every `<id>.toml` document in `dir`.
    fn load(dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read collection: {}", dir.display()))?;

        let mut collection = Self::default();
        for entry in entries {
            let entry = entry.context("Failed to read collection entry")?;
            let path = entry.path();

            if path.extension() != Some(std::ffi::OsStr::new("toml")) {
                continue;
            }

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let doc: Document = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;

            collection.next_seq = collection.next_seq.max(doc.seq + 1);
            collection.docs.insert(doc.comment.id.clone(), doc);
        }

        Ok(collection)
    }

    /// The collection index: `createdAt` descending, then most recently
    /// inserted first, then id.
    fn ordered(&self) -> Vec<Comment> {
        let mut docs: Vec<&Document> = self.docs.values().collect();
        docs.sort_by(|a, b| {
            b.comment
                .created_at
                .cmp(&a.comment.created_at)
                .then(b.seq.cmp(&a.seq))
                .then_with(|| b.comment.id.cmp(&a.comment.id))
        });
        docs.into_iter().map(|d| d.comment.clone()).collect()
    }
}

/// Realtime document collection: one file per comment, an in-memory index,
/// and a change feed that pushes the full ordered collection to every
/// subscriber after each mutation, the author's own included.
pub struct DocumentStore {
    dir: PathBuf,
    state: Mutex<Collection>,
    feed: Broadcaster,
}

impl DocumentStore {
    /// Opens (creating if needed) the collection directory and loads it.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create collection: {}", dir.display()))?;
        let collection = Collection::load(&dir)?;
        tracing::debug!(
            dir = %dir.display(),
            documents = collection.docs.len(),
            "loaded document collection"
        );

        Ok(Self {
            dir,
            state: Mutex::new(collection),
            feed: Broadcaster::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collection>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Document collection lock poisoned"))
    }
}

impl CommentStore for DocumentStore {
    fn backend(&self) -> Backend {
        Backend::Realtime
    }

    fn list(&self) -> Result<Vec<Comment>> {
        Ok(self.lock()?.ordered())
    }

    fn get(&self, id: &str) -> Result<Option<Comment>> {
        Ok(self.lock()?.docs.get(id).map(|d| d.comment.clone()))
    }

    fn insert(&self, comment: Comment) -> Result<()> {
        let mut state = self.lock()?;
        if state.docs.contains_key(&comment.id) {
            bail!("Comment already exists: {}", comment.id);
        }

        let doc = Document {
            seq: state.next_seq,
            comment,
        };
        doc.write_file(&self.dir)?;
        tracing::debug!(id = %doc.comment.id, seq = doc.seq, "appended document");

        state.next_seq += 1;
        state.docs.insert(doc.comment.id.clone(), doc);
        self.feed.publish(state.ordered());
        Ok(())
    }

    fn patch(&self, id: &str, patch: &CommentPatch) -> Result<Option<Comment>> {
        let mut state = self.lock()?;
        let Some(current) = state.docs.get(id) else {
            return Ok(None);
        };

        let mut doc = current.clone();
        doc.comment.apply(patch);
        doc.write_file(&self.dir)?;

        let updated = doc.comment.clone();
        state.docs.insert(id.to_owned(), doc);
        self.feed.publish(state.ordered());
        Ok(Some(updated))
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(doc) = state.docs.get(id) else {
            return Ok(false);
        };

        let path = doc.file_path(&self.dir);
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;

        state.docs.remove(id);
        self.feed.publish(state.ordered());
        Ok(true)
    }

    fn subscribe(&self) -> Result<Subscription> {
        let state = self.lock()?;
        Ok(self.feed.subscribe(state.ordered()))
    }

    fn refresh(&self) -> Result<bool> {
        let mut state = self.lock()?;
        match Collection::load(&self.dir) {
            Ok(fresh) => {
                *state = fresh;
                Ok(self.feed.publish_if_changed(state.ordered()))
            }
            Err(err) => {
                self.feed.publish_fault(StoreFault(format!("{err:#}")));
                Err(err)
            }
        }
    }
}
