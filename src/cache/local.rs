//! File-backed feed store
//!
//! Persists the cached feed as a single JSON file. All access to the file
//! goes through one worker task per store, which runs loads concurrently and
//! treats saves and deletes as barriers, so operations apply in issue order
//! and a load never sees a half-written file.

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use futures::future::BoxFuture;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinSet};
use tracing::{debug, trace};

use super::store::{CachedPayload, FeedStore, StoreError, StoreState};

/// File name used inside the default cache directory
pub const DEFAULT_STORE_FILE: &str = "localFeed.store";

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

enum Command {
    Load(Reply<StoreState>),
    Save(CachedPayload, Reply<()>),
    Delete(Reply<()>),
}

/// Stores the feed payload in a single file
///
/// Content is either zero bytes ([`StoreState::Empty`]) or a JSON
/// `{items, timestamp}` record. A missing file also reads as empty.
#[derive(Debug)]
pub struct LocalFeedStore {
    path: PathBuf,
    commands: mpsc::UnboundedSender<Command>,
}

impl LocalFeedStore {
    /// Creates a store backed by `path` and starts its worker task
    ///
    /// Must be called from within a tokio runtime. The file is not touched
    /// until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (commands, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(Arc::new(path.clone()), queue));
        Self { path, commands }
    }

    /// Returns the XDG-compliant default store location
    ///
    /// Uses `~/.cache/rijksfeed/localFeed.store` on Linux. Returns `None` if
    /// the cache directory cannot be determined (e.g., no home directory).
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "rijksfeed")?;
        Some(project_dirs.cache_dir().join(DEFAULT_STORE_FILE))
    }

    /// Returns the path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn submit<T: Send + 'static>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> BoxFuture<'_, Result<T, StoreError>> {
        let (reply, response) = oneshot::channel();
        // Enqueue now so issue order is fixed before anyone polls
        let queued = self.commands.send(command(reply)).is_ok();
        Box::pin(async move {
            if !queued {
                return Err(StoreError::Closed);
            }
            response.await.unwrap_or(Err(StoreError::Closed))
        })
    }
}

impl FeedStore for LocalFeedStore {
    fn load(&self) -> BoxFuture<'_, Result<StoreState, StoreError>> {
        self.submit(Command::Load)
    }

    fn save(&self, payload: CachedPayload) -> BoxFuture<'_, Result<(), StoreError>> {
        self.submit(move |reply| Command::Save(payload, reply))
    }

    fn delete(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        self.submit(Command::Delete)
    }
}

async fn run_worker(path: Arc<PathBuf>, mut queue: mpsc::UnboundedReceiver<Command>) {
    let mut readers = JoinSet::new();

    while let Some(command) = queue.recv().await {
        match command {
            Command::Load(reply) => {
                while readers.try_join_next().is_some() {}
                let path = Arc::clone(&path);
                readers.spawn(async move {
                    // Receiver may be gone; nobody is listening then
                    let _ = reply.send(read_state(&path).await);
                });
            }
            Command::Save(payload, reply) => {
                drain(&mut readers).await;
                let result = match serde_json::to_vec(&payload) {
                    Ok(bytes) => replace_contents(&path, &bytes).await,
                    Err(e) => Err(StoreError::Encode(e)),
                };
                trace!(path = %path.display(), ok = result.is_ok(), "Store save finished");
                let _ = reply.send(result);
            }
            Command::Delete(reply) => {
                drain(&mut readers).await;
                let result = replace_contents(&path, &[]).await;
                trace!(path = %path.display(), ok = result.is_ok(), "Store delete finished");
                let _ = reply.send(result);
            }
        }
    }

    drain(&mut readers).await;
    debug!(path = %path.display(), "Store worker stopped");
}

async fn drain(readers: &mut JoinSet<()>) {
    while readers.join_next().await.is_some() {}
}

async fn read_state(path: &Path) -> Result<StoreState, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreState::Empty),
        Err(e) => return Err(e.into()),
    };

    if bytes.is_empty() {
        return Ok(StoreState::Empty);
    }

    let payload = serde_json::from_slice(&bytes).map_err(StoreError::Decode)?;
    Ok(StoreState::Present(payload))
}

/// Writes `bytes` to a uniquely named sibling file and renames it over `path`
async fn replace_contents(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    task::spawn_blocking(move || write_atomically(&path, &bytes))
        .await
        .map_err(|e| StoreError::Io(io::Error::new(ErrorKind::Other, e)))?
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    // Dropped on failure, which removes the staging file
    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(bytes)?;
    staging.persist(path).map_err(|e| e.error)?;
    Ok(())
}
