//! Scheduled writes on a bounded worker pool.
//!
//! The traversal side of a sync pass never performs payload I/O itself: it
//! packages each download into a [`WriteTask`] and hands it to a
//! [`WritePool`]. `submit` is non-blocking; workers acquire a semaphore
//! permit before touching the network or the disk, so at most N payloads
//! are in flight while the driving task keeps resolving content.
//!
//! The pool retains a handle for every accepted task so the pass-level join
//! can inspect all outcomes together.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::api::{ApiError, ByteSource};

/// Minimum allowed worker count.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
const MAX_WORKERS: usize = 64;

/// Default worker count if not specified.
pub const DEFAULT_WORKERS: usize = 8;

/// Buffer size for streamed writes (8 KiB).
const WRITE_BUFFER_BYTES: usize = 8 * 1024;

/// Error type for pool construction.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Errors that can occur while executing a write task.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Filesystem error at the destination.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The payload stream failed mid-transfer.
    #[error("transfer failed: {0}")]
    Transfer(#[from] ApiError),

    /// The pool was torn down before the task could run.
    #[error("write pool closed before the task could run")]
    PoolClosed,
}

impl WriteError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Lifecycle of a write task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    Pending = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Succeeded,
            _ => Self::Failed,
        }
    }
}

/// Payload of a write task.
pub enum WritePayload {
    /// An open byte stream, written in chunks.
    Stream(ByteSource),
    /// Literal text, written in one pass.
    Text(String),
}

/// Kind tag of a write task, for logging and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Stream,
    Text,
}

/// One scheduled, independently-completing write operation.
pub struct WriteTask {
    /// Destination path.
    pub path: PathBuf,
    /// Payload source.
    pub payload: WritePayload,
}

impl WriteTask {
    /// Creates a stream task.
    #[must_use]
    pub fn stream(path: impl Into<PathBuf>, body: ByteSource) -> Self {
        Self {
            path: path.into(),
            payload: WritePayload::Stream(body),
        }
    }

    /// Creates a text task.
    #[must_use]
    pub fn text(path: impl Into<PathBuf>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            payload: WritePayload::Text(body.into()),
        }
    }

    /// Kind tag of this task.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        match self.payload {
            WritePayload::Stream(_) => TaskKind::Stream,
            WritePayload::Text(_) => TaskKind::Text,
        }
    }
}

/// Handle to a submitted task, retained by the pool until the join.
#[derive(Debug)]
pub struct TaskHandle {
    pub(crate) path: PathBuf,
    pub(crate) kind: TaskKind,
    pub(crate) state: Arc<AtomicU8>,
    pub(crate) join: JoinHandle<Result<(), WriteError>>,
}

impl TaskHandle {
    /// Destination path of the task.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind tag of the task.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

/// Bounded worker pool executing write tasks.
///
/// # Concurrency Model
///
/// - `submit` spawns a Tokio task and returns immediately
/// - The spawned task acquires a semaphore permit before doing any I/O,
///   so the submitting path never waits for a free worker
/// - Permits are released automatically when tasks settle (RAII)
/// - Directory creation happens on the worker and is create-if-absent,
///   safe under concurrent tasks targeting the same parent
#[derive(Debug)]
pub struct WritePool {
    semaphore: Arc<Semaphore>,
    workers: usize,
    handles: Mutex<Vec<TaskHandle>>,
}

impl WritePool {
    /// Creates a pool with the given worker count.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkers`] if the value is outside the
    /// valid range (1-64).
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(PoolError::InvalidWorkers { value: workers });
        }

        debug!(workers, "creating write pool");

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of tasks accepted since the last join.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.lock_handles().len()
    }

    /// Enqueues a task and returns immediately.
    ///
    /// The task runs to a terminal state on a worker; there is no
    /// cancellation once submitted. Outcomes are inspected jointly at the
    /// pass-level join.
    pub fn submit(&self, task: WriteTask) {
        let semaphore = Arc::clone(&self.semaphore);
        let state = Arc::new(AtomicU8::new(TaskState::Pending as u8));
        let path = task.path.clone();
        let kind = task.kind();

        debug!(path = %path.display(), ?kind, "task submitted");

        let task_state = Arc::clone(&state);
        let join = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| WriteError::PoolClosed)?;

            task_state.store(TaskState::Running as u8, Ordering::SeqCst);
            let outcome = execute(task).await;
            let terminal = if outcome.is_ok() {
                TaskState::Succeeded
            } else {
                TaskState::Failed
            };
            task_state.store(terminal as u8, Ordering::SeqCst);
            outcome
        });

        self.lock_handles().push(TaskHandle {
            path,
            kind,
            state,
            join,
        });
    }

    /// Drains the retained handles for a pass-level join.
    #[must_use]
    pub fn take_handles(&self) -> Vec<TaskHandle> {
        std::mem::take(&mut *self.lock_handles())
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<TaskHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs one task to its terminal state.
#[instrument(level = "debug", skip(task), fields(path = %task.path.display()))]
async fn execute(task: WriteTask) -> Result<(), WriteError> {
    let WriteTask { path, payload } = task;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| WriteError::io(parent, e))?;
    }

    match payload {
        WritePayload::Stream(body) => {
            write_stream(&path, body).await?;
            info!(path = %path.display(), "downloaded file");
        }
        WritePayload::Text(text) => {
            tokio::fs::write(&path, text)
                .await
                .map_err(|e| WriteError::io(&path, e))?;
        }
    }

    Ok(())
}

/// Streams a payload to disk, removing the partial file on failure.
///
/// The cleanup is best effort: an unlink failure is logged at debug and the
/// original streaming error still reaches the task's terminal state.
async fn write_stream(path: &Path, body: ByteSource) -> Result<(), WriteError> {
    let result = stream_to_file(path, body).await;

    if result.is_err() {
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            debug!(path = %path.display(), error = %cleanup, "could not remove partial file");
        } else {
            debug!(path = %path.display(), "removed partial file");
        }
    }

    result
}

async fn stream_to_file(path: &Path, mut body: ByteSource) -> Result<(), WriteError> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| WriteError::io(path, e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        // Zero-length keep-alive fragments carry no data
        if chunk.is_empty() {
            continue;
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| WriteError::io(path, e))?;
    }

    writer.flush().await.map_err(|e| WriteError::io(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;
    use futures_util::stream;
    use tempfile::TempDir;

    use super::*;

    fn byte_source(chunks: Vec<Result<Bytes, ApiError>>) -> ByteSource {
        Box::pin(stream::iter(chunks))
    }

    async fn settle(pool: &WritePool) -> Vec<(TaskHandle, Result<(), WriteError>)> {
        let mut settled = Vec::new();
        for mut handle in pool.take_handles() {
            let outcome = (&mut handle.join).await.unwrap();
            settled.push((handle, outcome));
        }
        settled
    }

    #[test]
    fn test_pool_rejects_invalid_worker_counts() {
        assert!(matches!(
            WritePool::new(0),
            Err(PoolError::InvalidWorkers { value: 0 })
        ));
        assert!(matches!(
            WritePool::new(65),
            Err(PoolError::InvalidWorkers { value: 65 })
        ));
        assert!(WritePool::new(1).is_ok());
    }

    #[tokio::test]
    async fn test_text_task_writes_payload_and_parents() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(2).unwrap();
        let path = dir.path().join("nested/deep/notes.txt");

        pool.submit(WriteTask::text(&path, "hello"));
        let settled = settle(&pool).await;

        assert!(settled[0].1.is_ok());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_stream_task_writes_chunks_in_order() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(2).unwrap();
        let path = dir.path().join("doc.pdf");

        pool.submit(WriteTask::stream(
            &path,
            byte_source(vec![
                Ok(Bytes::from_static(b"abc")),
                Ok(Bytes::from_static(b"def")),
            ]),
        ));
        let settled = settle(&pool).await;

        assert!(settled[0].1.is_ok());
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn test_stream_task_skips_keepalive_fragments() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(2).unwrap();
        let path = dir.path().join("doc.bin");

        pool.submit(WriteTask::stream(
            &path,
            byte_source(vec![
                Ok(Bytes::from_static(b"ab")),
                Ok(Bytes::new()),
                Ok(Bytes::from_static(b"cd")),
            ]),
        ));
        settle(&pool).await;

        assert_eq!(std::fs::read(&path).unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_failed_stream_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(2).unwrap();
        let path = dir.path().join("partial.pdf");

        pool.submit(WriteTask::stream(
            &path,
            byte_source(vec![
                Ok(Bytes::from_static(b"some data")),
                Err(ApiError::network("connection reset")),
            ]),
        ));
        let settled = settle(&pool).await;

        let error = settled[0].1.as_ref().unwrap_err();
        assert!(matches!(error, WriteError::Transfer(e) if e.is_transient()));
        assert!(!path.exists(), "partial file must be removed");
    }

    #[tokio::test]
    async fn test_failed_stream_preserves_original_error() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(1).unwrap();
        let path = dir.path().join("x.bin");

        pool.submit(WriteTask::stream(
            &path,
            byte_source(vec![Err(ApiError::Unauthorized)]),
        ));
        let settled = settle(&pool).await;

        assert!(matches!(
            settled[0].1,
            Err(WriteError::Transfer(ApiError::Unauthorized))
        ));
    }

    #[tokio::test]
    async fn test_task_reaches_terminal_state() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(2).unwrap();

        pool.submit(WriteTask::text(dir.path().join("a.txt"), "a"));
        pool.submit(WriteTask::stream(
            dir.path().join("b.bin"),
            byte_source(vec![Err(ApiError::network("timeout"))]),
        ));
        let settled = settle(&pool).await;

        let state_of = |path: &str| {
            settled
                .iter()
                .find(|(h, _)| h.path().ends_with(path))
                .map(|(h, _)| h.state())
                .unwrap()
        };
        assert_eq!(state_of("a.txt"), TaskState::Succeeded);
        assert_eq!(state_of("b.bin"), TaskState::Failed);
    }

    #[tokio::test]
    async fn test_task_count_tracks_submissions_until_drained() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(2).unwrap();
        assert_eq!(pool.task_count(), 0);

        pool.submit(WriteTask::text(dir.path().join("a.txt"), "a"));
        pool.submit(WriteTask::text(dir.path().join("b.txt"), "b"));
        assert_eq!(pool.task_count(), 2);

        settle(&pool).await;
        assert_eq!(pool.task_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_tasks_share_a_parent_directory() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(8).unwrap();
        let shared = dir.path().join("shared");

        for i in 0..16 {
            pool.submit(WriteTask::text(shared.join(format!("{i}.txt")), "x"));
        }
        let settled = settle(&pool).await;

        assert!(settled.iter().all(|(_, outcome)| outcome.is_ok()));
        assert_eq!(std::fs::read_dir(&shared).unwrap().count(), 16);
    }

    #[tokio::test]
    async fn test_text_task_failure_has_no_cleanup_requirement() {
        let dir = TempDir::new().unwrap();
        let pool = WritePool::new(1).unwrap();

        // Destination parent is an existing file, so directory creation fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        pool.submit(WriteTask::text(blocker.join("x.txt"), "x"));
        let settled = settle(&pool).await;

        assert!(matches!(settled[0].1, Err(WriteError::Io { .. })));
    }
}
