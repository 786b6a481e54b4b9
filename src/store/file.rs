use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use fs2::FileExt;

use super::{Broadcaster, CommentStore, StoreFault, Subscription, atomic_write};
use crate::config::Backend;
use crate::models::{Comment, CommentPatch};

/// The whole collection as one JSON array, newest entry first.
///
/// Every mutation is a read-modify-write of the full file. Writers are
/// serialized by an in-process mutex and an exclusive lock on a sibling
/// `.lock` file, so concurrent handlers and processes cannot lose updates.
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    writer: Mutex<()>,
    feed: Broadcaster,
}

impl FileStore {
    /// Opens the store at `path`. The file itself may not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");

        Ok(Self {
            lock_path: PathBuf::from(lock_name),
            path,
            writer: Mutex::new(()),
            feed: Broadcaster::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored sequence. A missing file is an empty guestbook.
    pub fn read_all(&self) -> Result<Vec<Comment>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Replaces the stored sequence in one atomic rename.
    pub fn write_all(&self, comments: &[Comment]) -> Result<()> {
        let content =
            serde_json::to_string_pretty(comments).context("Failed to serialize comments")?;
        atomic_write(&self.path, content.as_bytes())
    }

    /// Runs one read-modify-write cycle under both locks. `apply` returns
    /// `None` to abort without writing. The resulting collection is
    /// published while still holding the locks so subscribers see writes
    /// in order.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Vec<Comment>) -> Result<Option<T>>,
    ) -> Result<Option<T>> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| anyhow!("Comment file writer lock poisoned"))?;
        let lock_file = self.lock_file()?;
        lock_file
            .lock_exclusive()
            .context("Failed to acquire file lock")?;

        let mut comments = self.read_all()?;
        let outcome = apply(&mut comments)?;
        if outcome.is_some() {
            self.write_all(&comments)?;
            self.feed.publish(comments);
        }

        lock_file.unlock().context("Failed to unlock file")?;
        Ok(outcome)
    }

    fn lock_file(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .with_context(|| format!("Failed to open lock file: {}", self.lock_path.display()))
    }
}

impl CommentStore for FileStore {
    fn backend(&self) -> Backend {
        Backend::File
    }

    fn list(&self) -> Result<Vec<Comment>> {
        self.read_all()
    }

    fn get(&self, id: &str) -> Result<Option<Comment>> {
        Ok(self.read_all()?.into_iter().find(|c| c.id == id))
    }

    fn insert(&self, comment: Comment) -> Result<()> {
        self.mutate(|comments| {
            if comments.iter().any(|c| c.id == comment.id) {
                bail!("Comment already exists: {}", comment.id);
            }
            tracing::debug!(id = %comment.id, "prepending comment to file");
            comments.insert(0, comment);
            Ok(Some(()))
        })?;
        Ok(())
    }

    fn patch(&self, id: &str, patch: &CommentPatch) -> Result<Option<Comment>> {
        self.mutate(|comments| {
            Ok(comments.iter_mut().find(|c| c.id == id).map(|c| {
                c.apply(patch);
                c.clone()
            }))
        })
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.mutate(|comments| {
            let index = comments.iter().position(|c| c.id == id);
            Ok(index.map(|index| comments.remove(index)))
        })?;
        Ok(removed.is_some())
    }

    fn subscribe(&self) -> Result<Subscription> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| anyhow!("Comment file writer lock poisoned"))?;
        Ok(self.feed.subscribe(self.read_all()?))
    }

    fn refresh(&self) -> Result<bool> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| anyhow!("Comment file writer lock poisoned"))?;
        match self.read_all() {
            Ok(comments) => Ok(self.feed.publish_if_changed(comments)),
            Err(err) => {
                self.feed.publish_fault(StoreFault(format!("{err:#}")));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;
    use rstest::{fixture, rstest};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn make_comment(id: &str, owner: Option<&str>) -> Comment {
        Comment {
            id: id.to_string(),
            name: "Ana".to_string(),
            text: "Felices 30".to_string(),
            last_modified_display: "12/2/2026 10:59".to_string(),
            created_at: Some(Timestamp::now()),
            edited: false,
            owner_token: owner.map(str::to_string),
        }
    }

    fn ids(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.id.as_str()).collect()
    }

    /// A fresh FileStore whose file does not exist yet.
    #[fixture]
    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("comments.json")).unwrap();
        (dir, store)
    }

    // -- read_all / write_all --

    #[rstest]
    fn read_all_missing_file_is_empty(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        assert!(!store.path().exists());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[rstest]
    fn read_all_empty_file_is_empty(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        std::fs::write(store.path(), "").unwrap();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[rstest]
    fn read_all_corrupt_file_fails(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.read_all().is_err());
        assert!(store.list().is_err());
    }

    // The file written by the old server (no edited, no owner) loads as-is.
    #[rstest]
    fn read_all_accepts_legacy_file(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        std::fs::write(
            store.path(),
            r#"[
  {"id": "2", "name": "Eva", "text": "Hola", "date": "12/2/2026 11:00"},
  {"id": "1", "name": "Luis", "text": "Feliz", "date": "12/2/2026 10:59"}
]"#,
        )
        .unwrap();
        let comments = store.read_all().unwrap();
        assert_eq!(ids(&comments), vec!["2", "1"]);
        assert!(comments.iter().all(|c| c.owner_token.is_none()));
    }

    #[rstest]
    fn write_all_replaces_collection(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        store
            .write_all(&[make_comment("a", None), make_comment("b", None)])
            .unwrap();
        store.write_all(&[make_comment("c", None)]).unwrap();
        assert_eq!(ids(&store.read_all().unwrap()), vec!["c"]);
    }

    // -- insert --

    // New comments go to the head, so the file stays newest-first.
    #[rstest]
    fn insert_prepends(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        store.insert(make_comment("a", Some("T1"))).unwrap();
        store.insert(make_comment("b", Some("T1"))).unwrap();
        store.insert(make_comment("c", Some("T2"))).unwrap();
        assert_eq!(ids(&store.list().unwrap()), vec!["c", "b", "a"]);
    }

    #[rstest]
    fn insert_duplicate_fails(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        store.insert(make_comment("a", None)).unwrap();
        assert!(store.insert(make_comment("a", None)).is_err());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    // The owner token is persisted; it is only stripped when shaping.
    #[rstest]
    fn insert_persists_owner_token(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        store.insert(make_comment("a", Some("T1"))).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"ownerToken\": \"T1\""));
    }

    // -- patch / remove --

    #[rstest]
    fn patch_updates_in_place(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        store.insert(make_comment("a", Some("T1"))).unwrap();
        store.insert(make_comment("b", Some("T1"))).unwrap();

        let patch = CommentPatch {
            name: "Ana".to_string(),
            text: "Felices 30!!".to_string(),
            last_modified_display: "13/2/2026 08:00".to_string(),
        };
        let updated = store.patch("a", &patch).unwrap().unwrap();
        assert!(updated.edited);

        let comments = store.list().unwrap();
        assert_eq!(ids(&comments), vec!["b", "a"]);
        assert_eq!(comments[1].text, "Felices 30!!");
        assert_eq!(comments[1].owner_token.as_deref(), Some("T1"));
    }

    #[rstest]
    fn patch_missing_returns_none_without_writing(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        let patch = CommentPatch {
            name: "x".to_string(),
            text: "y".to_string(),
            last_modified_display: "z".to_string(),
        };
        assert!(store.patch("nope", &patch).unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[rstest]
    fn remove_keeps_order_of_rest(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        for id in ["a", "b", "c"] {
            store.insert(make_comment(id, None)).unwrap();
        }
        assert!(store.remove("b").unwrap());
        assert!(!store.remove("b").unwrap());
        assert_eq!(ids(&store.list().unwrap()), vec!["c", "a"]);
        assert!(store.get("b").unwrap().is_none());
    }

    // -- subscribe / refresh --

    #[rstest]
    fn each_mutation_publishes_once(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        let mut sub = store.subscribe().unwrap();
        assert!(sub.try_next().unwrap().unwrap().is_empty());

        store.insert(make_comment("a", None)).unwrap();
        assert_eq!(sub.try_next().unwrap().unwrap().len(), 1);
        assert!(sub.try_next().is_none());

        store.remove("missing").unwrap();
        assert!(sub.try_next().is_none());

        store.remove("a").unwrap();
        assert!(sub.try_next().unwrap().unwrap().is_empty());
    }

    // A second handle on the same file sees the write only after refresh.
    #[rstest]
    fn refresh_picks_up_external_writes(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        let mut sub = store.subscribe().unwrap();
        sub.try_next();

        let other = FileStore::open(store.path()).unwrap();
        other.insert(make_comment("x", None)).unwrap();
        assert!(sub.try_next().is_none());

        assert!(store.refresh().unwrap());
        assert_eq!(ids(&sub.try_next().unwrap().unwrap()), vec!["x"]);
        assert!(!store.refresh().unwrap());
    }

    #[rstest]
    fn refresh_failure_reaches_subscribers(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        let mut sub = store.subscribe().unwrap();
        sub.try_next();

        std::fs::write(store.path(), "garbage").unwrap();
        assert!(store.refresh().is_err());
        assert!(sub.try_next().unwrap().is_err());
    }

    // -- concurrency --

    // Concurrent writers through separate handles must not lose inserts.
    #[rstest]
    fn concurrent_inserts_are_not_lost(store: (TempDir, FileStore)) {
        let (_dir, store) = store;
        let path = store.path().to_path_buf();
        let shared = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let shared = Arc::clone(&shared);
                let path = path.clone();
                std::thread::spawn(move || {
                    let own = FileStore::open(&path).unwrap();
                    for i in 0..5 {
                        shared
                            .insert(make_comment(&format!("s{n}-{i}"), None))
                            .unwrap();
                        own.insert(make_comment(&format!("o{n}-{i}"), None))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.list().unwrap().len(), 80);
    }
}
