//! Editor secrets persisted in a JSON file.
//!
//! The file maps editor names to hex-encoded secrets:
//!
//! ```json
//! { "cozy": "9f86d0...", "partner-a": "2c26b4..." }
//! ```
//!
//! Every write goes to a temporary file in the same directory which is then
//! renamed over the original, so readers of the file see either the old or
//! the new content. The in-memory snapshot is swapped only after the rename
//! succeeded. The file is re-read whenever its identity (modification time,
//! length, inode) changes, so secrets rotated by another process (the
//! `add-editor` command) are picked up without a restart. Every write renames
//! a fresh file into place, so a rotation is seen even when it lands in the
//! same mtime tick.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use areg_crypto::EditorSecret;

use crate::error::{EditorError, EditorResult};
use crate::traits::EditorRegistry;

/// Identity of the file a snapshot was loaded from. `None` when absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
    inode: u64,
}

impl FileStamp {
    fn of(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let inode = std::os::unix::fs::MetadataExt::ino(meta);
        #[cfg(not(unix))]
        let inode = 0;
        Self {
            modified: meta.modified().ok(),
            len: meta.len(),
            inode,
        }
    }
}

#[derive(Default)]
struct Snapshot {
    stamp: Option<FileStamp>,
    secrets: HashMap<String, Arc<EditorSecret>>,
}

pub struct FileEditorRegistry {
    path: PathBuf,
    state: RwLock<Snapshot>,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

fn unavailable(path: &Path, e: impl std::fmt::Display) -> EditorError {
    EditorError::Unavailable(format!("{}: {e}", path.display()))
}

fn load(path: &Path) -> EditorResult<Snapshot> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::default()),
        Err(e) => return Err(unavailable(path, e)),
    };
    let raw = std::fs::read(path).map_err(|e| unavailable(path, e))?;
    let entries: BTreeMap<String, String> =
        serde_json::from_slice(&raw).map_err(|e| unavailable(path, e))?;
    let mut secrets = HashMap::with_capacity(entries.len());
    for (name, hex) in entries {
        let secret = EditorSecret::from_hex(&hex)
            .map_err(|e| unavailable(path, format!("editor {name}: {e}")))?;
        secrets.insert(name, Arc::new(secret));
    }
    Ok(Snapshot {
        stamp: Some(FileStamp::of(&meta)),
        secrets,
    })
}

fn store(path: &Path, contents: &[u8]) -> EditorResult<Option<FileStamp>> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| unavailable(dir, e))?;
    // NamedTempFile is created with owner-only permissions on unix.
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| unavailable(dir, e))?;
    tmp.write_all(contents).map_err(|e| unavailable(path, e))?;
    tmp.as_file().sync_all().map_err(|e| unavailable(path, e))?;
    tmp.persist(path).map_err(|e| unavailable(path, e.error))?;
    Ok(std::fs::metadata(path).ok().map(|m| FileStamp::of(&m)))
}

impl FileEditorRegistry {
    /// Open the registry at `path`. A missing file is an empty registry; it
    /// is created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> EditorResult<Self> {
        let path = path.into();
        let snapshot = blocking({
            let path = path.clone();
            move || load(&path)
        })
        .await?;
        debug!(path = %path.display(), editors = snapshot.secrets.len(), "editor registry loaded");
        Ok(Self {
            path,
            state: RwLock::new(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload from disk if the file changed since the last load.
    ///
    /// The reloaded snapshot replaces the current one only if nothing else
    /// replaced it meanwhile, so a slow reload never undoes a newer write.
    async fn refresh(&self) -> EditorResult<()> {
        let on_disk = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Some(FileStamp::of(&meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(unavailable(&self.path, e)),
        };
        let seen = self.state.read().expect("lock poisoned").stamp;
        if on_disk == seen {
            return Ok(());
        }
        let path = self.path.clone();
        let snapshot = blocking(move || load(&path)).await?;
        let mut state = self.state.write().expect("lock poisoned");
        if state.stamp == seen {
            debug!(path = %self.path.display(), "editor registry reloaded");
            *state = snapshot;
        }
        Ok(())
    }

    /// Apply `change` to a copy of the current secrets, persist it, then
    /// publish it in memory.
    async fn update<R>(
        &self,
        change: impl FnOnce(&mut HashMap<String, Arc<EditorSecret>>) -> R,
    ) -> EditorResult<R> {
        let _guard = self.write_lock.lock().await;
        self.refresh().await?;
        let mut next = self.state.read().expect("lock poisoned").secrets.clone();
        let out = change(&mut next);

        let entries: BTreeMap<&str, String> = next
            .iter()
            .map(|(name, secret)| (name.as_str(), secret.to_hex()))
            .collect();
        let contents =
            serde_json::to_vec_pretty(&entries).map_err(|e| unavailable(&self.path, e))?;
        let path = self.path.clone();
        let stamp = blocking(move || store(&path, &contents)).await?;

        *self.state.write().expect("lock poisoned") = Snapshot {
            stamp,
            secrets: next,
        };
        Ok(out)
    }
}

async fn blocking<T, F>(f: F) -> EditorResult<T>
where
    F: FnOnce() -> EditorResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EditorError::Unavailable(format!("editor registry task failed: {e}")))?
}

#[async_trait]
impl EditorRegistry for FileEditorRegistry {
    async fn get_secret(&self, editor: &str) -> EditorResult<Option<Arc<EditorSecret>>> {
        self.refresh().await?;
        Ok(self
            .state
            .read()
            .expect("lock poisoned")
            .secrets
            .get(editor)
            .cloned())
    }

    async fn put_secret(&self, editor: &str, secret: EditorSecret) -> EditorResult<()> {
        let secret = Arc::new(secret);
        self.update(|secrets| {
            secrets.insert(editor.to_string(), secret);
        })
        .await?;
        info!(editor, path = %self.path.display(), "editor secret stored");
        Ok(())
    }

    async fn delete(&self, editor: &str) -> EditorResult<bool> {
        self.update(|secrets| secrets.remove(editor).is_some()).await
    }

    async fn list(&self) -> EditorResult<Vec<String>> {
        self.refresh().await?;
        let mut names: Vec<String> = self
            .state
            .read()
            .expect("lock poisoned")
            .secrets
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for FileEditorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEditorRegistry")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
