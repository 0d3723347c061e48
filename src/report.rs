//! Pass-level join and failure classification.
//!
//! A sync pass submits many independent write tasks and only looks at their
//! outcomes once, here. Session loss is the single failure that abandons
//! the pass; transient network errors are counted and left for the next
//! pass to heal through change detection; everything else is counted and
//! logged with enough detail to diagnose. Nothing is retried inside a pass.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::api::ApiError;
use crate::writer::{TaskHandle, WriteError, WritePool};

/// Outcome of joining one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPassResult {
    /// Number of tasks that reached a failed terminal state.
    pub failed_files: usize,
    /// Whether the session expired during the pass.
    pub fatal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureClass {
    /// Session loss: abandon the rest of the pass.
    Fatal,
    /// Expected to self-heal on a later pass.
    Transient,
    /// Needs diagnostic attention but does not stop anything.
    Other,
}

fn classify(error: &WriteError) -> FailureClass {
    match error {
        WriteError::Transfer(ApiError::Unauthorized) => FailureClass::Fatal,
        WriteError::Transfer(api) if api.is_transient() => FailureClass::Transient,
        _ => FailureClass::Other,
    }
}

/// Joins every task retained by the pool and classifies the outcomes.
///
/// Blocks the driving task until all submitted tasks reach a terminal state
/// or the optional timeout elapses; tasks still running at the deadline are
/// left to finish on their own and are not counted. Already-written files
/// are never rolled back, even on a fatal outcome.
pub async fn join_pass(pool: &WritePool, timeout: Option<Duration>) -> SyncPassResult {
    let handles = pool.take_handles();
    let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

    let mut failed_files = 0usize;
    let mut unsettled = 0usize;
    let mut fatal = false;

    for handle in handles {
        let TaskHandle {
            path, kind, join, ..
        } = handle;

        let joined = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, join).await {
                Ok(joined) => joined,
                Err(_elapsed) => {
                    unsettled += 1;
                    continue;
                }
            },
            None => join.await,
        };

        match joined {
            Ok(Ok(())) => {}
            Ok(Err(write_error)) => match classify(&write_error) {
                FailureClass::Fatal => {
                    fatal = true;
                    error!(
                        path = %path.display(),
                        "session expired - you may have logged in from another location"
                    );
                }
                FailureClass::Transient => {
                    failed_files += 1;
                    warn!(
                        path = %path.display(),
                        ?kind,
                        error = %write_error,
                        "network error during download"
                    );
                }
                FailureClass::Other => {
                    failed_files += 1;
                    error!(
                        path = %path.display(),
                        ?kind,
                        error = %write_error,
                        "unexpected error during download"
                    );
                }
            },
            Err(join_error) => {
                failed_files += 1;
                warn!(path = %path.display(), error = %join_error, "write task panicked");
            }
        }
    }

    if unsettled > 0 {
        warn!(unsettled, "task(s) had not settled when the join timed out");
    }
    if failed_files > 0 {
        warn!(
            failed_files,
            "file(s) failed to download; they will be retried on next sync"
        );
    } else {
        info!("all scheduled writes settled cleanly");
    }

    SyncPassResult {
        failed_files,
        fatal,
    }
}
