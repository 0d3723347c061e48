//! Document-like content: a node carrying file attachments.

use std::path::Path;

use tracing::info;

use crate::api::{ApiError, AttachmentDescriptor, ContentNode, ContentPath};
use crate::sync::SyncContext;
use crate::writer::WritePool;

use super::Attachment;

/// Result of asking the platform for a node's attachments.
///
/// Distinguishes a real (possibly empty) listing from a node kind that has
/// no attachment support at all, so the latter is never treated as an
/// error.
enum AttachmentListing {
    Supported(Vec<AttachmentDescriptor>),
    Unsupported,
}

/// Handler for files, documents, and assignments.
pub struct Document {
    attachments: Vec<Attachment>,
}

impl Document {
    pub(crate) async fn load(
        node: &ContentNode,
        path: &ContentPath,
        ctx: &SyncContext,
    ) -> Result<Self, ApiError> {
        let descriptors = match list_attachments(node, path, ctx).await? {
            AttachmentListing::Supported(descriptors) => descriptors,
            AttachmentListing::Unsupported => Vec::new(),
        };

        let kept = ctx.filter.filter(descriptors);

        let mut attachments = Vec::with_capacity(kept.len());
        for descriptor in kept {
            attachments.push(Attachment::load(descriptor, path, ctx).await?);
        }

        Ok(Self { attachments })
    }

    /// Number of attachments retained after filtering.
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Schedules the attachments.
    ///
    /// More than one attachment gets a subdirectory at `target`; a single
    /// attachment is written straight into the parent so the mirror does
    /// not grow folders holding one file each.
    pub(crate) async fn write(self, target: &Path, pool: &WritePool) -> std::io::Result<()> {
        let destination = if self.attachments.len() > 1 {
            tokio::fs::create_dir_all(target).await?;
            target.to_path_buf()
        } else {
            target
                .parent()
                .map_or_else(|| target.to_path_buf(), Path::to_path_buf)
        };

        for attachment in self.attachments {
            attachment.write(&destination, pool);
        }
        Ok(())
    }
}

async fn list_attachments(
    node: &ContentNode,
    path: &ContentPath,
    ctx: &SyncContext,
) -> Result<AttachmentListing, ApiError> {
    match ctx.api.fetch_attachments(path).await {
        Ok(descriptors) => Ok(AttachmentListing::Supported(descriptors)),
        Err(ApiError::BadRequest { .. }) => {
            // Some content kinds legitimately lack attachment support.
            info!(
                node = %node.log_identity(),
                course_id = %path.course_id,
                content_id = path.content_id.as_deref().unwrap_or(""),
                "content item does not support file attachments"
            );
            Ok(AttachmentListing::Unsupported)
        }
        Err(error) => Err(error),
    }
}
