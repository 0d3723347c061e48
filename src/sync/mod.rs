//! Sync pass context and driver.
//!
//! A pass is the unit of retry: the driver walks each course's content
//! tree once, schedules every accepted download, joins the pool, and
//! reports. Anything that failed transiently is simply picked up by the
//! next pass through change detection.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, AttachmentFilter, ContentPath, CourseApi};
use crate::content::Content;
use crate::naming::reserve_sibling_name;
use crate::report::{self, SyncPassResult};
use crate::writer::WritePool;

/// Errors that abort a sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A fetch failed with a class that is not contained at one node.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session expired while writes were in flight.
    #[error("session expired during sync pass")]
    SessionExpired,
}

/// Shared state of one sync pass.
///
/// Read concurrently by fetches but never mutated during a pass.
#[derive(Clone)]
pub struct SyncContext {
    /// Platform API client.
    pub api: Arc<dyn CourseApi>,
    /// Timestamp of the last successful pass, if any.
    pub last_sync: Option<DateTime<Utc>>,
    /// Attachment mime filter for document handlers.
    pub filter: AttachmentFilter,
}

impl SyncContext {
    /// Creates a pass context with the default attachment filter.
    #[must_use]
    pub fn new(api: Arc<dyn CourseApi>, last_sync: Option<DateTime<Utc>>) -> Self {
        Self {
            api,
            last_sync,
            filter: AttachmentFilter::default(),
        }
    }

    /// Change detection: whether a node was modified after the last pass.
    ///
    /// With no previous pass everything counts as changed; a node without a
    /// modification time never does (traversal still reaches its children
    /// through the has-children flag).
    #[must_use]
    pub fn has_changed(&self, modified: Option<DateTime<Utc>>) -> bool {
        match self.last_sync {
            None => true,
            Some(since) => modified.is_some_and(|m| m > since),
        }
    }
}

/// Runs one sync pass for a course into `destination`.
///
/// Resolves and schedules on the calling task, then joins the pool through
/// the failure report. Individual download failures do not error this
/// function; only session loss and non-node-local fetch errors do.
///
/// # Errors
///
/// Returns [`SyncError::SessionExpired`] when the session died mid-pass and
/// [`SyncError::Api`] for fetch failures during traversal.
#[instrument(skip(ctx, pool), fields(destination = %destination.display()))]
pub async fn run_pass(
    ctx: &SyncContext,
    pool: &WritePool,
    course_id: &str,
    destination: &Path,
    join_timeout: Option<Duration>,
) -> Result<SyncPassResult, SyncError> {
    let root = ContentPath::course_root(course_id);
    let nodes = ctx.api.fetch_children(&root).await?;
    info!(course_id, nodes = nodes.len(), "starting sync pass");

    let mut names = HashSet::new();
    for node in &nodes {
        let path = root.child(&node.id);
        let content = Content::load(node, &path, ctx).await?;
        if content.is_ignored() {
            continue;
        }

        let name = reserve_sibling_name(&mut names, content.title());
        if let Err(error) = content.write_named(destination, &name, pool).await {
            warn!(node = %node.log_identity(), error = %error, "failed to prepare destination");
        }
    }

    let result = report::join_pass(pool, join_timeout).await;
    if result.fatal {
        return Err(SyncError::SessionExpired);
    }

    info!(
        course_id,
        failed_files = result.failed_files,
        "sync pass finished"
    );
    Ok(result)
}
